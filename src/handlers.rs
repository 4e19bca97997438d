use crate::{
    AppState,
    auth::{self, AuthUser, OptionalAuthUser, require_admin},
    error::ApiError,
    models::{
        self, BlogPost, CreateCommentRequest, CreatePostRequest, HomePage, InfoPage,
        LoginRequest, PostPage, RegisterRequest, UpdatePostRequest,
    },
};
use axum::{
    Form, Json,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Redirect},
};

// --- Public Views ---

/// get_all_posts
///
/// [Public Route] The home view: every post in insertion order, plus the
/// viewer's authentication flag for the navigation bar.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Home view model", body = HomePage))
)]
pub async fn get_all_posts(
    OptionalAuthUser(viewer): OptionalAuthUser,
    State(state): State<AppState>,
) -> Json<HomePage> {
    let posts = state.repo.list_posts().await;
    Json(HomePage {
        logged_in: viewer.is_some(),
        posts,
    })
}

/// show_post
///
/// [Public Route] A single post with its own comments, newest first.
#[utoipa::path(
    get,
    path = "/post/{id}",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Post view model", body = PostPage),
        (status = 404, description = "No such post")
    )
)]
pub async fn show_post(
    OptionalAuthUser(viewer): OptionalAuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<PostPage>, ApiError> {
    let post = state.repo.get_post(post_id).await.ok_or(ApiError::NotFound {
        resource: "post",
        id: post_id,
    })?;

    let comments = state.repo.comments_for_post(post_id).await;

    Ok(Json(PostPage {
        logged_in: viewer.is_some(),
        post,
        comments,
    }))
}

/// about
///
/// [Public Route] Static informational view.
#[utoipa::path(
    get,
    path = "/about",
    responses((status = 200, description = "About view model", body = InfoPage))
)]
pub async fn about(OptionalAuthUser(viewer): OptionalAuthUser) -> Json<InfoPage> {
    Json(InfoPage {
        page: "about".to_string(),
        logged_in: viewer.is_some(),
    })
}

/// contact
///
/// [Public Route] Static informational view.
#[utoipa::path(
    get,
    path = "/contact",
    responses((status = 200, description = "Contact view model", body = InfoPage))
)]
pub async fn contact(OptionalAuthUser(viewer): OptionalAuthUser) -> Json<InfoPage> {
    Json(InfoPage {
        page: "contact".to_string(),
        logged_in: viewer.is_some(),
    })
}

// --- Account Flow ---

/// register_form
///
/// [Public Route] Blank registration form view model.
#[utoipa::path(
    get,
    path = "/register",
    responses((status = 200, description = "Registration form", body = InfoPage))
)]
pub async fn register_form(OptionalAuthUser(viewer): OptionalAuthUser) -> Json<InfoPage> {
    Json(InfoPage {
        page: "register".to_string(),
        logged_in: viewer.is_some(),
    })
}

/// register
///
/// [Public Route] Creates an account and establishes a session in one step.
/// An already-registered email answers 409 with the message that sends the
/// visitor to the login form instead; no second user row is ever created.
#[utoipa::path(
    post,
    path = "/register",
    responses(
        (status = 303, description = "Registered and logged in, redirect home"),
        (status = 409, description = "Email already registered"),
        (status = 422, description = "Malformed form input")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Form(payload): Form<RegisterRequest>,
) -> Result<impl IntoResponse + std::fmt::Debug, ApiError> {
    payload.validate()?;

    if state.repo.get_user_by_email(&payload.email).await.is_some() {
        return Err(ApiError::DuplicateEmail);
    }

    let password_hash = auth::hash_password(&payload.password)?;
    let user = state
        .repo
        .create_user(&payload.name, &payload.email, &password_hash)
        .await?;

    tracing::info!(user_id = user.id, role = %user.role, "account registered");

    let token = auth::issue_session(user.id, &state.config.session_secret)?;
    Ok((
        [(header::SET_COOKIE, auth::session_cookie(&token))],
        Redirect::to("/"),
    ))
}

/// login_form
///
/// [Public Route] Blank login form view model.
#[utoipa::path(
    get,
    path = "/login",
    responses((status = 200, description = "Login form", body = InfoPage))
)]
pub async fn login_form(OptionalAuthUser(viewer): OptionalAuthUser) -> Json<InfoPage> {
    Json(InfoPage {
        page: "login".to_string(),
        logged_in: viewer.is_some(),
    })
}

/// login
///
/// [Public Route] Authenticates by email and password. An unknown email and a
/// wrong password are reported with distinct messages, matching the product's
/// behavior, and never both at once.
#[utoipa::path(
    post,
    path = "/login",
    responses(
        (status = 303, description = "Logged in, redirect home"),
        (status = 401, description = "Unknown account or invalid password"),
        (status = 422, description = "Malformed form input")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Form(payload): Form<LoginRequest>,
) -> Result<impl IntoResponse + std::fmt::Debug, ApiError> {
    payload.validate()?;

    let user = state
        .repo
        .get_user_by_email(&payload.email)
        .await
        .ok_or(ApiError::UnknownEmail)?;

    if !auth::verify_password(&payload.password, &user.password_hash)? {
        return Err(ApiError::WrongPassword);
    }

    let token = auth::issue_session(user.id, &state.config.session_secret)?;
    Ok((
        [(header::SET_COOKIE, auth::session_cookie(&token))],
        Redirect::to("/"),
    ))
}

/// logout
///
/// [Public Route] Ends the session by clearing the cookie. Idempotent: an
/// anonymous caller gets the same redirect.
#[utoipa::path(
    get,
    path = "/logout",
    responses((status = 303, description = "Session ended, redirect home"))
)]
pub async fn logout() -> impl IntoResponse {
    (
        [(header::SET_COOKIE, auth::clear_session_cookie())],
        Redirect::to("/"),
    )
}

// --- Comments ---

/// add_comment
///
/// [Authenticated Route] Posts a comment on an existing post. The author is the
/// session identity, never form input; anonymous callers are rejected by the
/// extractor before any repository call.
#[utoipa::path(
    post,
    path = "/post/{id}",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 303, description = "Comment added, redirect home"),
        (status = 401, description = "Log in or register to comment"),
        (status = 404, description = "No such post")
    )
)]
pub async fn add_comment(
    AuthUser { id: author_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Form(payload): Form<CreateCommentRequest>,
) -> Result<impl IntoResponse + std::fmt::Debug, ApiError> {
    payload.validate()?;

    // A comment must reference an existing post at creation time.
    if state.repo.get_post(post_id).await.is_none() {
        return Err(ApiError::NotFound {
            resource: "post",
            id: post_id,
        });
    }

    state
        .repo
        .add_comment(post_id, author_id, payload.text, models::long_form_date())
        .await?;

    Ok(Redirect::to("/"))
}

// --- Privileged Post Management ---

/// new_post_form
///
/// [Privileged Route] Blank post form for the site owner.
#[utoipa::path(
    get,
    path = "/new-post",
    responses(
        (status = 200, description = "New post form", body = InfoPage),
        (status = 403, description = "Not the site owner")
    )
)]
pub async fn new_post_form(user: AuthUser) -> Result<Json<InfoPage>, ApiError> {
    require_admin(&user)?;
    Ok(Json(InfoPage {
        page: "new-post".to_string(),
        logged_in: true,
    }))
}

/// create_post
///
/// [Privileged Route] Creates a post, stamped with today's long-form date and
/// authored by the session identity. A duplicate title answers 409.
#[utoipa::path(
    post,
    path = "/new-post",
    responses(
        (status = 303, description = "Post created, redirect home"),
        (status = 403, description = "Not the site owner"),
        (status = 409, description = "Duplicate title"),
        (status = 422, description = "Malformed form input")
    )
)]
pub async fn create_post(
    user: AuthUser,
    State(state): State<AppState>,
    Form(payload): Form<CreatePostRequest>,
) -> Result<impl IntoResponse + std::fmt::Debug, ApiError> {
    require_admin(&user)?;
    payload.validate()?;

    let post = state
        .repo
        .create_post(payload, user.id, models::long_form_date())
        .await?;

    tracing::info!(post_id = post.id, "post created");

    Ok(Redirect::to("/"))
}

/// edit_post_form
///
/// [Privileged Route] The edit form, prefilled with the post's current fields.
#[utoipa::path(
    get,
    path = "/edit-post/{id}",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Current field values", body = BlogPost),
        (status = 403, description = "Not the site owner"),
        (status = 404, description = "No such post")
    )
)]
pub async fn edit_post_form(
    user: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<BlogPost>, ApiError> {
    require_admin(&user)?;

    let post = state.repo.get_post(post_id).await.ok_or(ApiError::NotFound {
        resource: "post",
        id: post_id,
    })?;

    Ok(Json(post))
}

/// update_post
///
/// [Privileged Route] Overwrites the provided fields in place. The stored
/// creation date is never recomputed.
#[utoipa::path(
    post,
    path = "/edit-post/{id}",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 303, description = "Updated, redirect to the post"),
        (status = 403, description = "Not the site owner"),
        (status = 404, description = "No such post"),
        (status = 422, description = "Malformed form input")
    )
)]
pub async fn update_post(
    user: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Form(payload): Form<UpdatePostRequest>,
) -> Result<impl IntoResponse + std::fmt::Debug, ApiError> {
    require_admin(&user)?;
    payload.validate()?;

    match state.repo.update_post(post_id, payload).await? {
        Some(post) => Ok(Redirect::to(&format!("/post/{}", post.id))),
        None => Err(ApiError::NotFound {
            resource: "post",
            id: post_id,
        }),
    }
}

/// delete_post
///
/// [Privileged Route] Removes a post together with its comments.
#[utoipa::path(
    get,
    path = "/delete/{id}",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 303, description = "Deleted, redirect home"),
        (status = 403, description = "Not the site owner"),
        (status = 404, description = "No such post")
    )
)]
pub async fn delete_post(
    user: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse + std::fmt::Debug, ApiError> {
    require_admin(&user)?;

    if state.repo.delete_post(post_id).await? {
        Ok(Redirect::to("/"))
    } else {
        Err(ApiError::NotFound {
            resource: "post",
            id: post_id,
        })
    }
}
