use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{Method, Request, Uri, header, request::Parts},
};
use blog_portal::{
    AppState,
    auth::{AuthUser, Claims, OptionalAuthUser, issue_session},
    config::{AppConfig, Env},
    error::ApiError,
    models::{BlogPost, Comment, CreatePostRequest, ROLE_READER, UpdatePostRequest, User},
    repository::{Repository, RepositoryState},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::{sync::Arc, time::SystemTime};

// --- Mock Repository for Auth Logic ---

#[derive(Default)]
struct MockAuthRepo {
    user_to_return: Option<User>,
}

#[async_trait]
impl Repository for MockAuthRepo {
    async fn get_user(&self, _id: i64) -> Option<User> {
        self.user_to_return.clone()
    }

    // Placeholders: the extractor only ever calls get_user.
    async fn get_user_by_email(&self, _email: &str) -> Option<User> {
        None
    }
    async fn create_user(
        &self,
        _name: &str,
        _email: &str,
        _password_hash: &str,
    ) -> Result<User, ApiError> {
        Ok(User::default())
    }
    async fn list_posts(&self) -> Vec<BlogPost> {
        vec![]
    }
    async fn get_post(&self, _id: i64) -> Option<BlogPost> {
        None
    }
    async fn create_post(
        &self,
        _req: CreatePostRequest,
        _author_id: i64,
        _date: String,
    ) -> Result<BlogPost, ApiError> {
        Ok(BlogPost::default())
    }
    async fn update_post(
        &self,
        _id: i64,
        _req: UpdatePostRequest,
    ) -> Result<Option<BlogPost>, ApiError> {
        Ok(None)
    }
    async fn delete_post(&self, _id: i64) -> Result<bool, ApiError> {
        Ok(false)
    }
    async fn add_comment(
        &self,
        _post_id: i64,
        _author_id: i64,
        _text: String,
        _date: String,
    ) -> Result<Comment, ApiError> {
        Ok(Comment::default())
    }
    async fn comments_for_post(&self, _post_id: i64) -> Vec<Comment> {
        vec![]
    }
}

// --- Helper Functions ---

const TEST_SESSION_SECRET: &str = "test-secret-value-1234567890";
const TEST_USER_ID: i64 = 42;

fn create_token(user_id: i64, exp_offset: i64) -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;

    let claims = Claims {
        sub: user_id,
        iat: now as usize,
        exp: (now + exp_offset) as usize,
    };

    let key = EncodingKey::from_secret(TEST_SESSION_SECRET.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

fn create_app_state(env: Env, repo: MockAuthRepo, session_secret: String) -> AppState {
    let mut config = AppConfig::default();
    config.env = env;
    config.session_secret = session_secret;

    AppState {
        repo: Arc::new(repo) as RepositoryState,
        config,
    }
}

fn test_user() -> User {
    User {
        id: TEST_USER_ID,
        email: "test@example.com".to_string(),
        name: "Test".to_string(),
        role: ROLE_READER.to_string(),
        password_hash: "unused".to_string(),
    }
}

/// Helper to get the mutable Parts struct from a generated Request.
fn get_request_parts(method: Method, uri: Uri) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

fn with_session_cookie(mut parts: Parts, token: &str) -> Parts {
    parts.headers.insert(
        header::COOKIE,
        header::HeaderValue::from_str(&format!("theme=dark; session={token}")).unwrap(),
    );
    parts
}

// --- Tests ---

#[tokio::test]
async fn test_auth_success_with_valid_session_cookie() {
    let token = create_token(TEST_USER_ID, 3600);
    let mock_repo = MockAuthRepo {
        user_to_return: Some(test_user()),
    };
    let app_state = create_app_state(Env::Production, mock_repo, TEST_SESSION_SECRET.to_string());

    let parts = get_request_parts(Method::GET, "/".parse().unwrap());
    let mut parts = with_session_cookie(parts, &token);

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert!(auth_user.is_ok());
    let user = auth_user.unwrap();
    assert_eq!(user.id, TEST_USER_ID);
    assert_eq!(user.role, ROLE_READER);
}

#[tokio::test]
async fn test_auth_failure_with_missing_cookie() {
    let app_state = create_app_state(
        Env::Production,
        MockAuthRepo::default(),
        TEST_SESSION_SECRET.to_string(),
    );

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert!(matches!(
        auth_user.unwrap_err(),
        ApiError::NotAuthenticated
    ));
}

#[tokio::test]
async fn test_auth_failure_with_expired_token() {
    // Token issued already past its expiry.
    let token = create_token(TEST_USER_ID, -3600);
    let mock_repo = MockAuthRepo {
        user_to_return: Some(test_user()),
    };
    let app_state = create_app_state(Env::Production, mock_repo, TEST_SESSION_SECRET.to_string());

    let parts = get_request_parts(Method::GET, "/".parse().unwrap());
    let mut parts = with_session_cookie(parts, &token);

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert!(auth_user.is_err());
}

#[tokio::test]
async fn test_auth_failure_with_wrong_secret() {
    let token = create_token(TEST_USER_ID, 3600);
    let mock_repo = MockAuthRepo {
        user_to_return: Some(test_user()),
    };
    // The state validates against a different secret than the one that signed.
    let app_state = create_app_state(Env::Production, mock_repo, "another-secret".to_string());

    let parts = get_request_parts(Method::GET, "/".parse().unwrap());
    let mut parts = with_session_cookie(parts, &token);

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert!(auth_user.is_err());
}

#[tokio::test]
async fn test_auth_failure_for_deleted_account() {
    // A valid token whose subject no longer exists in the database.
    let token = create_token(TEST_USER_ID, 3600);
    let app_state = create_app_state(
        Env::Production,
        MockAuthRepo::default(),
        TEST_SESSION_SECRET.to_string(),
    );

    let parts = get_request_parts(Method::GET, "/".parse().unwrap());
    let mut parts = with_session_cookie(parts, &token);

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert!(auth_user.is_err());
}

#[tokio::test]
async fn test_issue_session_round_trips_through_extractor() {
    let token = issue_session(TEST_USER_ID, TEST_SESSION_SECRET).unwrap();
    let mock_repo = MockAuthRepo {
        user_to_return: Some(test_user()),
    };
    let app_state = create_app_state(Env::Production, mock_repo, TEST_SESSION_SECRET.to_string());

    let parts = get_request_parts(Method::GET, "/".parse().unwrap());
    let mut parts = with_session_cookie(parts, &token);

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(auth_user.unwrap().id, TEST_USER_ID);
}

#[tokio::test]
async fn test_local_bypass_success() {
    let mock_repo = MockAuthRepo {
        user_to_return: Some(test_user()),
    };
    let app_state = create_app_state(Env::Local, mock_repo, TEST_SESSION_SECRET.to_string());

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::HeaderName::from_static("x-user-id"),
        header::HeaderValue::from_str(&TEST_USER_ID.to_string()).unwrap(),
    );

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert!(auth_user.is_ok());
    assert_eq!(auth_user.unwrap().id, TEST_USER_ID);
}

#[tokio::test]
async fn test_local_bypass_disabled_in_prod() {
    let mock_repo = MockAuthRepo {
        user_to_return: Some(test_user()),
    };
    let app_state = create_app_state(Env::Production, mock_repo, TEST_SESSION_SECRET.to_string());

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    // Provide ONLY the local bypass header.
    parts.headers.insert(
        header::HeaderName::from_static("x-user-id"),
        header::HeaderValue::from_str(&TEST_USER_ID.to_string()).unwrap(),
    );

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert!(matches!(
        auth_user.unwrap_err(),
        ApiError::NotAuthenticated
    ));
}

#[tokio::test]
async fn test_optional_auth_is_side_effect_free_for_anonymous() {
    let app_state = create_app_state(
        Env::Production,
        MockAuthRepo::default(),
        TEST_SESSION_SECRET.to_string(),
    );

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());

    let viewer = OptionalAuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();

    assert!(!viewer.is_authenticated());
}

#[tokio::test]
async fn test_optional_auth_resolves_identity_when_present() {
    let token = create_token(TEST_USER_ID, 3600);
    let mock_repo = MockAuthRepo {
        user_to_return: Some(test_user()),
    };
    let app_state = create_app_state(Env::Production, mock_repo, TEST_SESSION_SECRET.to_string());

    let parts = get_request_parts(Method::GET, "/".parse().unwrap());
    let mut parts = with_session_cookie(parts, &token);

    let viewer = OptionalAuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();

    assert_eq!(viewer.0.unwrap().id, TEST_USER_ID);
}
