use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::error::ApiError;

/// Role granted to the first account ever registered. Exactly one user carries it;
/// everyone registered afterwards is a plain reader.
pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_READER: &str = "reader";

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// The canonical identity record stored in the `users` table. The password hash
/// is kept out of every serialized response; it only travels between the
/// repository and the credential checks.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct User {
    pub id: i64,
    // The user's primary identifier; unique across all accounts.
    pub email: String,
    // Display name shown next to posts and comments.
    pub name: String,
    // 'admin' (site owner) or 'reader'. Decided once, at registration time.
    pub role: String,
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub password_hash: String,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

/// BlogPost
///
/// A post record from the `blog_posts` table. `date` is the long-form display
/// string captured when the post was created ("April 05, 2024") and is never
/// recomputed, even on edit.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct BlogPost {
    pub id: i64,
    // FK to users.id (the site owner).
    pub author_id: i64,
    pub title: String,
    pub subtitle: String,
    pub date: String,
    pub body: String,
    pub img_url: String,
    // Loaded via a JOIN with `users` in the repository queries.
    #[sqlx(default)]
    pub author_name: Option<String>,
}

/// Comment
///
/// A comment record from the `comments` table, augmented with the author's
/// display name (a join operation).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub text: String,
    pub date: String,
    #[sqlx(default)]
    pub author_name: Option<String>,
}

// --- Request Payloads (Form Input Schemas) ---

/// RegisterRequest
///
/// Form-encoded payload for POST /register.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    /// Structural validation only; uniqueness is the schema's concern.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::Validation("Name must not be empty.".to_string()));
        }
        validate_email(&self.email)?;
        if self.password.is_empty() {
            return Err(ApiError::Validation(
                "Password must not be empty.".to_string(),
            ));
        }
        Ok(())
    }
}

/// LoginRequest
///
/// Form-encoded payload for POST /login.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_email(&self.email)?;
        if self.password.is_empty() {
            return Err(ApiError::Validation(
                "Password must not be empty.".to_string(),
            ));
        }
        Ok(())
    }
}

/// CreatePostRequest
///
/// Form-encoded payload for POST /new-post. All fields are required.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct CreatePostRequest {
    pub title: String,
    pub subtitle: String,
    pub body: String,
    pub img_url: String,
}

impl CreatePostRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        for (field, value) in [
            ("Title", &self.title),
            ("Subtitle", &self.subtitle),
            ("Body", &self.body),
            ("Image URL", &self.img_url),
        ] {
            if value.trim().is_empty() {
                return Err(ApiError::Validation(format!(
                    "{field} must not be empty."
                )));
            }
        }
        Ok(())
    }
}

/// UpdatePostRequest
///
/// Partial update payload for POST /edit-post/{id}. Only provided fields are
/// overwritten; the stored creation date is never touched.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct UpdatePostRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub img_url: Option<String>,

    // The owner may reassign the displayed author reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<i64>,
}

impl UpdatePostRequest {
    /// Provided fields must still be structurally valid: an explicit empty title
    /// is rejected, an absent one simply keeps the stored value.
    pub fn validate(&self) -> Result<(), ApiError> {
        for (field, value) in [
            ("Title", &self.title),
            ("Subtitle", &self.subtitle),
            ("Body", &self.body),
            ("Image URL", &self.img_url),
        ] {
            if let Some(v) = value {
                if v.trim().is_empty() {
                    return Err(ApiError::Validation(format!(
                        "{field} must not be empty."
                    )));
                }
            }
        }
        Ok(())
    }
}

/// CreateCommentRequest
///
/// Form-encoded payload for POST /post/{id}.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct CreateCommentRequest {
    pub text: String,
}

impl CreateCommentRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.text.trim().is_empty() {
            return Err(ApiError::Validation(
                "Comment must not be empty.".to_string(),
            ));
        }
        Ok(())
    }
}

// --- View Models (Output Schemas) ---

/// HomePage
///
/// View model for GET /: every post plus the viewer's authentication flag,
/// which the external view layer uses to switch the navigation bar.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct HomePage {
    pub logged_in: bool,
    pub posts: Vec<BlogPost>,
}

/// PostPage
///
/// View model for GET /post/{id}: the post and its own comments, newest first.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct PostPage {
    pub logged_in: bool,
    pub post: BlogPost,
    pub comments: Vec<Comment>,
}

/// InfoPage
///
/// View model for the static informational routes (/about, /contact) and the
/// blank account forms (/register, /login).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct InfoPage {
    pub page: String,
    pub logged_in: bool,
}

// --- Helpers ---

/// Stamps the current calendar date as the long-form display string stored on
/// posts and comments, e.g. "April 05, 2024".
pub fn long_form_date() -> String {
    Utc::now().format("%B %d, %Y").to_string()
}

/// Minimal structural email check: one '@' with a dotted domain behind it.
/// Deliverability is not this layer's concern.
fn validate_email(email: &str) -> Result<(), ApiError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(ApiError::Validation(format!(
            "'{email}' is not a valid email address."
        )))
    }
}
