use crate::services::forms::FieldErrors;

/// Failures a service operation can report to its caller.
#[derive(Debug, thiserror::Error)]
pub enum BlogError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("invalid input: {0}")]
    Validation(FieldErrors),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl BlogError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<rusqlite::Error> for BlogError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Store(err.into())
    }
}

impl From<FieldErrors> for BlogError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

pub type ServiceResult<T> = Result<T, BlogError>;
