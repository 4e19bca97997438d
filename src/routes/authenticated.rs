use crate::{AppState, handlers};
use axum::{Router, routing::post};

/// Authenticated Router Module
///
/// Routes requiring a valid session but no particular privilege. Each handler
/// takes `AuthUser`, so anonymous requests are rejected by the extractor
/// before the handler body runs.
pub fn authenticated_routes() -> Router<AppState> {
    Router::new()
        // POST /post/{id}
        // Submit a comment on a post. The comment author is always the session
        // identity; anonymous visitors get a 401 telling them to log in.
        .route("/post/{id}", post(handlers::add_comment))
}
