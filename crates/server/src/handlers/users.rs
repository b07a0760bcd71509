//! User account and session endpoints.

use crate::auth::require_auth;
use crate::error::{ApiError, ApiResult};
use crate::handlers::common::{format_timestamp, provided, read_json_body};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::http::header::SET_COOKIE;
use axum::response::{AppendHeaders, IntoResponse};
use docket_core::session::{SESSION_COOKIE, generate_session_token, hash_session_token};
use docket_core::password::{hash_password, verify_password};
use docket_core::user::{Role, validate_email, validate_password, validate_username};
use docket_store::models::{SessionRow, UserRow};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    /// Defaults to "user" when omitted.
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

/// User payload. Never carries the password hash.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub role: String,
    pub created_at: String,
    pub updated_at: String,
}

impl UserResponse {
    fn from_row(row: &UserRow) -> ApiResult<Self> {
        Ok(Self {
            user_id: row.user_id,
            username: row.username.clone(),
            email: row.email.clone(),
            role: row.role.clone(),
            created_at: format_timestamp(row.created_at)?,
            updated_at: format_timestamp(row.updated_at)?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// The raw session token, for Authorization: Bearer clients. Cookie
    /// clients can ignore it.
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// POST /v1/users/register - Create a user account.
pub async fn register(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    let body: RegisterRequest = read_json_body(req).await?;

    validate_username(&body.username)?;
    validate_email(&body.email)?;
    validate_password(&body.password)?;
    let role = match body.role.as_deref() {
        Some(r) => Role::parse(r)?,
        None => Role::default(),
    };

    let now = OffsetDateTime::now_utc();
    let user = UserRow {
        user_id: Uuid::new_v4(),
        username: body.username,
        email: body.email,
        password_hash: hash_password(&body.password)?,
        role: role.as_str().to_string(),
        created_at: now,
        updated_at: now,
    };

    // Duplicate username surfaces as AlreadyExists -> 409.
    state.store.create_user(&user).await?;

    tracing::info!(user_id = %user.user_id, username = %user.username, "user registered");
    Ok((StatusCode::CREATED, Json(UserResponse::from_row(&user)?)))
}

/// POST /v1/users/login - Verify credentials and mint a session.
pub async fn login(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<impl IntoResponse> {
    let body: LoginRequest = read_json_body(req).await?;

    let user = state
        .store
        .get_user_by_username(&body.username)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("invalid credentials".to_string()))?;

    if !verify_password(&body.password, &user.password_hash)? {
        return Err(ApiError::Unauthorized("invalid credentials".to_string()));
    }

    let token = generate_session_token();
    let now = OffsetDateTime::now_utc();
    let ttl = state.config.session.ttl();
    let session = SessionRow {
        session_id: Uuid::new_v4(),
        user_id: user.user_id,
        token_hash: hash_session_token(&token),
        created_at: now,
        expires_at: now + ttl,
        last_used_at: None,
    };
    state.store.create_session(&session).await?;

    tracing::info!(user_id = %user.user_id, "user logged in");

    let cookie = session_cookie(&state, &token, ttl.whole_seconds());
    let response = LoginResponse {
        token,
        user: UserResponse::from_row(&user)?,
    };
    Ok((AppendHeaders([(SET_COOKIE, cookie)]), Json(response)))
}

/// POST /v1/users/logout - Delete the current session and clear the cookie.
pub async fn logout(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<impl IntoResponse> {
    let auth = require_auth(&req)?.clone();
    state.store.delete_session(auth.session_id).await?;

    tracing::info!(user_id = %auth.user_id, "user logged out");

    let cookie = session_cookie(&state, "", 0);
    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(MessageResponse {
            message: "logged out".to_string(),
        }),
    ))
}

/// GET /v1/users/{user_id} - Public user lookup.
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<UserResponse>> {
    let user = state
        .store
        .get_user(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user {user_id} not found")))?;
    Ok(Json(UserResponse::from_row(&user)?))
}

/// PUT /v1/users/{user_id} - Update the caller's own account.
///
/// Only provided, non-empty fields are merged into the stored row.
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    req: Request,
) -> ApiResult<Json<UserResponse>> {
    let auth = require_auth(&req)?.clone();
    let body: UpdateUserRequest = read_json_body(req).await?;

    let mut user = state
        .store
        .get_user(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user {user_id} not found")))?;

    if auth.user_id != user.user_id {
        return Err(ApiError::Forbidden(
            "users can only modify their own account".to_string(),
        ));
    }

    if let Some(username) = provided(&body.username) {
        validate_username(username)?;
        user.username = username.to_string();
    }
    if let Some(email) = provided(&body.email) {
        validate_email(email)?;
        user.email = email.to_string();
    }
    if let Some(password) = provided(&body.password) {
        validate_password(password)?;
        user.password_hash = hash_password(password)?;
    }
    if let Some(role) = provided(&body.role) {
        user.role = Role::parse(role)?.as_str().to_string();
    }
    user.updated_at = OffsetDateTime::now_utc();

    state.store.update_user(&user).await?;
    Ok(Json(UserResponse::from_row(&user)?))
}

/// DELETE /v1/users/{user_id} - Delete the caller's own account.
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    req: Request,
) -> ApiResult<Json<MessageResponse>> {
    let auth = require_auth(&req)?.clone();

    let user = state
        .store
        .get_user(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user {user_id} not found")))?;

    if auth.user_id != user.user_id {
        return Err(ApiError::Forbidden(
            "users can only delete their own account".to_string(),
        ));
    }

    // Sessions first so a concurrent request cannot authenticate as a
    // half-deleted account.
    state.store.delete_sessions_for_user(user.user_id).await?;
    state.store.delete_user(user.user_id).await?;

    tracing::info!(user_id = %user.user_id, "user deleted");
    Ok(Json(MessageResponse {
        message: "user deleted".to_string(),
    }))
}

/// Build the session cookie string. A zero max-age clears the cookie.
fn session_cookie(state: &AppState, token: &str, max_age_secs: i64) -> String {
    let mut cookie =
        format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}");
    if state.config.server.secure_cookies {
        cookie.push_str("; Secure");
    }
    cookie
}
