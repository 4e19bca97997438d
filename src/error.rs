use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// ApiError
///
/// The application-wide error taxonomy. Every handler returns `Result<_, ApiError>`
/// so that each failure maps to exactly one status code and one user-visible message.
///
/// Recoverable authentication and validation failures carry the message the view
/// layer shows inline on the originating form. `Forbidden` deliberately carries
/// nothing beyond the status code.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Registration attempted with an email that already has an account.
    /// The view layer redirects the visitor to the login form.
    #[error(
        "The email address you have entered already exists in the system. Please log in instead."
    )]
    DuplicateEmail,

    /// Login attempted with an email no account was registered under.
    /// Kept distinct from `WrongPassword` to match the product's messages.
    #[error("The email address you have entered does not exist in the system. Please create an account.")]
    UnknownEmail,

    /// Login attempted with a valid email but a failing password check.
    #[error("You have entered an invalid password. Please try again.")]
    WrongPassword,

    /// A route requiring a session was reached without one.
    #[error("You need to log in or register to do that.")]
    NotAuthenticated,

    /// The privilege check failed. No further detail is disclosed.
    #[error("Forbidden")]
    Forbidden,

    /// The addressed resource does not exist.
    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: i64 },

    /// Structurally malformed form input (empty title, bad email shape, ...).
    /// The originating form is re-rendered with this message; no mutation happened.
    #[error("{0}")]
    Validation(String),

    /// Uniqueness violation on `blog_posts.title` surfaced from persistence.
    #[error("A post with this title already exists.")]
    DuplicateTitle,

    /// Password hashing or session token construction failed.
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Any other persistence failure.
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::DuplicateEmail => StatusCode::CONFLICT,
            ApiError::UnknownEmail | ApiError::WrongPassword => StatusCode::UNAUTHORIZED,
            ApiError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::DuplicateTitle => StatusCode::CONFLICT,
            ApiError::Internal { .. } | ApiError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The message shown to the visitor. Internal failures collapse to a generic
    /// line so persistence details never leak into a response body.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Internal { .. } | ApiError::Database(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Unexpected failures are logged with full detail server-side only.
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("request failed: {:?}", self);
        }

        (status, Json(json!({ "error": self.user_message() }))).into_response()
    }
}
