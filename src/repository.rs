use crate::error::ApiError;
use crate::models::{BlogPost, Comment, CreatePostRequest, UpdatePostRequest, User};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

/// Repository Trait
///
/// The abstract contract for all persistence operations. Handlers talk to this
/// trait only, so the Postgres implementation can be swapped for an in-memory
/// mock in tests.
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) safely shareable across axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: i64) -> Option<User>;
    async fn get_user_by_email(&self, email: &str) -> Option<User>;
    /// Inserts a new user. The very first account becomes the site owner
    /// ('admin'); everyone after it is a 'reader'. The role decision happens
    /// inside the INSERT so it commits atomically with the row.
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, ApiError>;

    // --- Posts ---
    /// All posts in insertion order, author names joined in.
    async fn list_posts(&self) -> Vec<BlogPost>;
    async fn get_post(&self, id: i64) -> Option<BlogPost>;
    /// Inserts a post with the caller-stamped long-form date. A duplicate title
    /// surfaces as `ApiError::DuplicateTitle`.
    async fn create_post(
        &self,
        req: CreatePostRequest,
        author_id: i64,
        date: String,
    ) -> Result<BlogPost, ApiError>;
    /// Partial in-place update via COALESCE; the stored date is never changed.
    /// Returns `Ok(None)` when the post does not exist.
    async fn update_post(
        &self,
        id: i64,
        req: UpdatePostRequest,
    ) -> Result<Option<BlogPost>, ApiError>;
    /// Removes the post and its comments in one transaction. Returns whether a
    /// post row was actually deleted.
    async fn delete_post(&self, id: i64) -> Result<bool, ApiError>;

    // --- Comments ---
    async fn add_comment(
        &self,
        post_id: i64,
        author_id: i64,
        text: String,
        date: String,
    ) -> Result<Comment, ApiError>;
    /// Comments whose parent post equals `post_id`, newest first.
    async fn comments_for_post(&self, post_id: i64) -> Vec<Comment>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

const POST_COLUMNS: &str =
    "p.id, p.author_id, p.title, p.subtitle, p.date, p.body, p.img_url, u.name AS author_name";

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Idempotent schema bootstrap, run once at startup. Mirrors the three
    /// tables of the data model; safe to call against an already-provisioned
    /// database.
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id            BIGSERIAL PRIMARY KEY,
                email         TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                name          TEXT NOT NULL,
                role          TEXT NOT NULL DEFAULT 'reader'
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS blog_posts (
                id        BIGSERIAL PRIMARY KEY,
                author_id BIGINT NOT NULL REFERENCES users(id),
                title     TEXT NOT NULL UNIQUE,
                subtitle  TEXT NOT NULL,
                date      TEXT NOT NULL,
                body      TEXT NOT NULL,
                img_url   TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // At most one row may ever carry the admin role. The CASE in create_user
        // decides the role, but only this index makes the decision safe under
        // concurrent first registrations.
        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS users_single_admin ON users (role) WHERE role = 'admin'",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS comments (
                id        BIGSERIAL PRIMARY KEY,
                post_id   BIGINT NOT NULL REFERENCES blog_posts(id),
                author_id BIGINT NOT NULL REFERENCES users(id),
                text      TEXT NOT NULL,
                date      TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Translates Postgres integrity violations into the explicit errors of the
/// taxonomy: unique violations (23505) by constraint name, foreign-key
/// violations (23503) into a user-facing validation error. Anything else
/// propagates as a database error.
fn map_write_error(e: sqlx::Error) -> ApiError {
    if let sqlx::Error::Database(db_err) = &e {
        match db_err.code().as_deref() {
            Some("23505") => {
                let constraint = db_err.constraint().unwrap_or_default();
                if constraint.contains("email") {
                    return ApiError::DuplicateEmail;
                }
                if constraint.contains("title") {
                    return ApiError::DuplicateTitle;
                }
            }
            Some("23503") => {
                return ApiError::Validation(
                    "The referenced record does not exist.".to_string(),
                );
            }
            _ => {}
        }
    }
    ApiError::Database(e)
}

/// True when the error is a unique violation (23505) on a constraint whose name
/// contains `needle`.
fn is_unique_violation_on(e: &sqlx::Error, needle: &str) -> bool {
    if let sqlx::Error::Database(db_err) = e {
        return db_err.code().as_deref() == Some("23505")
            && db_err.constraint().unwrap_or_default().contains(needle);
    }
    false
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: i64) -> Option<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, email, name, role, password_hash FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_user error: {:?}", e);
            None
        })
    }

    async fn get_user_by_email(&self, email: &str) -> Option<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, email, name, role, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_user_by_email error: {:?}", e);
            None
        })
    }

    /// create_user
    ///
    /// The role CASE runs inside the INSERT statement. Two concurrent first
    /// registrations can still both see an empty table and both pick 'admin';
    /// the partial unique index on the admin role rejects the loser, which is
    /// then re-inserted as a plain reader.
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, ApiError> {
        let attempt = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash, role)
            VALUES (
                $1, $2, $3,
                CASE WHEN EXISTS (SELECT 1 FROM users WHERE role = 'admin')
                     THEN 'reader' ELSE 'admin' END
            )
            RETURNING id, email, name, role, password_hash
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await;

        match attempt {
            Ok(user) => Ok(user),
            // Lost the race for the first account: another registration
            // committed the admin row in between. This one is a reader.
            Err(e) if is_unique_violation_on(&e, "admin") => {
                sqlx::query_as::<_, User>(
                    r#"
                    INSERT INTO users (name, email, password_hash, role)
                    VALUES ($1, $2, $3, 'reader')
                    RETURNING id, email, name, role, password_hash
                    "#,
                )
                .bind(name)
                .bind(email)
                .bind(password_hash)
                .fetch_one(&self.pool)
                .await
                .map_err(map_write_error)
            }
            Err(e) => Err(map_write_error(e)),
        }
    }

    async fn list_posts(&self) -> Vec<BlogPost> {
        let query = format!(
            "SELECT {POST_COLUMNS} FROM blog_posts p JOIN users u ON p.author_id = u.id ORDER BY p.id ASC"
        );
        sqlx::query_as::<_, BlogPost>(&query)
            .fetch_all(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("list_posts error: {:?}", e);
                vec![]
            })
    }

    async fn get_post(&self, id: i64) -> Option<BlogPost> {
        let query = format!(
            "SELECT {POST_COLUMNS} FROM blog_posts p JOIN users u ON p.author_id = u.id WHERE p.id = $1"
        );
        sqlx::query_as::<_, BlogPost>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_post error: {:?}", e);
                None
            })
    }

    async fn create_post(
        &self,
        req: CreatePostRequest,
        author_id: i64,
        date: String,
    ) -> Result<BlogPost, ApiError> {
        sqlx::query_as::<_, BlogPost>(
            r#"
            INSERT INTO blog_posts (author_id, title, subtitle, date, body, img_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, author_id, title, subtitle, date, body, img_url
            "#,
        )
        .bind(author_id)
        .bind(req.title)
        .bind(req.subtitle)
        .bind(date)
        .bind(req.body)
        .bind(req.img_url)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)
    }

    /// update_post
    ///
    /// Uses COALESCE so only the provided fields overwrite stored columns. The
    /// `date` column is deliberately absent from the SET list.
    async fn update_post(
        &self,
        id: i64,
        req: UpdatePostRequest,
    ) -> Result<Option<BlogPost>, ApiError> {
        sqlx::query_as::<_, BlogPost>(
            r#"
            UPDATE blog_posts
            SET title     = COALESCE($2, title),
                subtitle  = COALESCE($3, subtitle),
                body      = COALESCE($4, body),
                img_url   = COALESCE($5, img_url),
                author_id = COALESCE($6, author_id)
            WHERE id = $1
            RETURNING id, author_id, title, subtitle, date, body, img_url
            "#,
        )
        .bind(id)
        .bind(req.title)
        .bind(req.subtitle)
        .bind(req.body)
        .bind(req.img_url)
        .bind(req.author_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)
    }

    /// delete_post
    ///
    /// Comments reference their parent post, so they are removed first and both
    /// deletions commit as one unit. A half-applied delete is never observable.
    async fn delete_post(&self, id: i64) -> Result<bool, ApiError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM comments WHERE post_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM blog_posts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    /// add_comment
    ///
    /// Inserts the comment and joins the author's display name in the same
    /// statement, so the returned model is ready for the view.
    async fn add_comment(
        &self,
        post_id: i64,
        author_id: i64,
        text: String,
        date: String,
    ) -> Result<Comment, ApiError> {
        sqlx::query_as::<_, Comment>(
            r#"
            WITH inserted AS (
                INSERT INTO comments (post_id, author_id, text, date)
                VALUES ($1, $2, $3, $4)
                RETURNING id, post_id, author_id, text, date
            )
            SELECT i.id, i.post_id, i.author_id, i.text, i.date, u.name AS author_name
            FROM inserted i JOIN users u ON i.author_id = u.id
            "#,
        )
        .bind(post_id)
        .bind(author_id)
        .bind(text)
        .bind(date)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)
    }

    /// comments_for_post
    ///
    /// Scoped to the parent post at the service boundary; newest first.
    async fn comments_for_post(&self, post_id: i64) -> Vec<Comment> {
        sqlx::query_as::<_, Comment>(
            r#"
            SELECT c.id, c.post_id, c.author_id, c.text, c.date, u.name AS author_name
            FROM comments c
            JOIN users u ON c.author_id = u.id
            WHERE c.post_id = $1
            ORDER BY c.id DESC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("comments_for_post error: {:?}", e);
            vec![]
        })
    }
}
