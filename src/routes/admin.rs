use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// The post-management routes, reserved for the site owner. The paths stay at
/// the top level to match the public URL scheme; each handler resolves the
/// session through its `AuthUser` argument and then calls the `require_admin`
/// guard before touching anything, so a reader's session gets a bare 403.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /new-post — blank form; POST /new-post — create the post.
        .route(
            "/new-post",
            get(handlers::new_post_form).post(handlers::create_post),
        )
        // GET /edit-post/{id} — prefilled form; POST — submission folded into
        // the same route.
        .route(
            "/edit-post/{id}",
            get(handlers::edit_post_form).post(handlers::update_post),
        )
        // GET /delete/{id}
        // Removes the post and its comments, then redirects home.
        .route("/delete/{id}", get(handlers::delete_post))
}
