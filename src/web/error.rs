use crate::services::BlogError;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(BlogError::NotFound(what)) = self.0.downcast_ref::<BlogError>() {
            tracing::debug!("{} not found", what);
            return (StatusCode::NOT_FOUND, Html("<h1>Not Found</h1>")).into_response();
        }
        tracing::error!("Application error: {:?}", self.0);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

pub type AppResult<T> = Result<T, AppError>;
