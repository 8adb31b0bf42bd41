use super::handlers::blog;
use super::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

pub fn blog_routes() -> Router<Arc<AppState>> {
    // Parameters sharing a path prefix must share a name: `:id` is the post id
    // for share/comment and the year for the detail route.
    Router::new()
        .route("/", get(blog::root))
        .route("/blog/", get(blog::post_list))
        .route("/blog/posts/tag/:tag_slug/", get(blog::post_list_by_tag))
        .route("/blog/feed/", get(blog::feed))
        .route("/blog/search/", get(blog::search))
        .route("/blog/contact/", get(blog::contact_form).post(blog::contact_submit))
        .route("/blog/about/", get(blog::about))
        .route("/blog/:id/share/", get(blog::share_form).post(blog::share_submit))
        .route("/blog/:id/comment/", post(blog::post_comment))
        .route("/blog/:id/:month/:day/:slug/", get(blog::post_detail))
        .route("/media/:filename", get(blog::serve_media))
        .fallback(blog::not_found)
}
