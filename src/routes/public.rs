use crate::{AppState, handlers};
use axum::{
    Router,
    routing::get,
};

/// Public Router Module
///
/// Defines endpoints accessible to any client, anonymous or logged-in. Reads
/// resolve the viewer's identity without side effects so the view layer can
/// switch its navigation; the account routes are the gateway into a session.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Unauthenticated liveness probe for monitoring and load balancers.
        .route("/health", get(|| async { "ok" }))
        // GET /
        // The home view: all posts plus the viewer's logged-in flag.
        .route("/", get(handlers::get_all_posts))
        // GET /register — blank form; POST /register — create account + session.
        .route(
            "/register",
            get(handlers::register_form).post(handlers::register),
        )
        // GET /login — blank form; POST /login — authenticate by email/password.
        .route("/login", get(handlers::login_form).post(handlers::login))
        // GET /logout
        // Clears the session cookie; idempotent for anonymous callers.
        .route("/logout", get(handlers::logout))
        // GET /post/{id}
        // A single post and its own comments. Comment submission on the same
        // path is registered in the authenticated router.
        .route("/post/{id}", get(handlers::show_post))
        // GET /about, GET /contact
        // Static informational views.
        .route("/about", get(handlers::about))
        .route("/contact", get(handlers::contact))
}
