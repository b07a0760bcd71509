//! Session authentication middleware.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::middleware::Next;
use axum::response::Response;
use docket_core::session::{SESSION_COOKIE, hash_session_token};
use docket_core::user::Role;
use time::OffsetDateTime;
use tracing::Instrument;
use uuid::Uuid;

/// Maximum length for trace IDs.
/// Longer trace IDs are truncated to prevent log bloat and log injection.
const MAX_TRACE_ID_LEN: usize = 128;

/// Trace ID for request correlation.
#[derive(Clone, Debug)]
pub struct TraceId(pub String);

impl TraceId {
    /// Generate a new random trace ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a trace ID from a client-provided value, sanitized for logging.
    pub fn from_client(value: &str) -> Self {
        let sanitized: String = value
            .chars()
            .take(MAX_TRACE_ID_LEN)
            .filter(|c| c.is_ascii_graphic() || *c == ' ')
            .collect();

        if sanitized.is_empty() {
            Self::new()
        } else {
            Self(sanitized)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Authenticated request extension.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
    /// Session backing this request; logout deletes it.
    pub session_id: Uuid,
}

/// Extract bearer token from Authorization header.
/// Per RFC 6750, the "Bearer" scheme is case-insensitive.
fn extract_bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            if v.len() >= 7 && v[..7].eq_ignore_ascii_case("bearer ") {
                Some(&v[7..])
            } else {
                None
            }
        })
}

/// Extract the session token from the `docket_session` cookie.
fn extract_cookie_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| {
            cookies.split(';').find_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                (name == SESSION_COOKIE).then_some(value)
            })
        })
}

/// Extract trace ID from X-Trace-Id header or generate a new one.
fn extract_or_generate_trace_id(req: &Request) -> TraceId {
    req.headers()
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .map(TraceId::from_client)
        .unwrap_or_else(TraceId::new)
}

/// Authentication middleware that resolves the session token and sets up
/// trace context.
///
/// A missing or invalid token does not fail the request here; handlers that
/// need a caller use `require_auth`, which returns 401 when the extension is
/// absent. Unauthenticated routes (register, login, health) pass through.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let trace_id = extract_or_generate_trace_id(&req);
    let trace_id_str = trace_id.0.clone();
    req.extensions_mut().insert(trace_id);

    // Cookie transport is primary; Authorization: Bearer serves API clients.
    let token = extract_cookie_token(&req).or_else(|| extract_bearer_token(&req));

    if let Some(token) = token {
        let token_hash = hash_session_token(token);

        if let Some(session) = state.store.get_session_by_hash(&token_hash).await? {
            let now = OffsetDateTime::now_utc();
            if session.is_valid(now) {
                if let Some(user) = state.store.get_user(session.user_id).await? {
                    let role = Role::parse(&user.role).map_err(|e| {
                        ApiError::Internal(format!("corrupt role for user {}: {e}", user.user_id))
                    })?;

                    // Update last used time (fire and forget)
                    let store = state.store.clone();
                    let session_id = session.session_id;
                    tokio::spawn(async move {
                        let _ = store.touch_session(session_id, now).await;
                    });

                    req.extensions_mut().insert(AuthenticatedUser {
                        user_id: user.user_id,
                        username: user.username,
                        role,
                        session_id: session.session_id,
                    });
                }
            }
        }
    }

    let response = next
        .run(req)
        .instrument(tracing::info_span!("request", trace_id = %trace_id_str))
        .await;

    Ok(response)
}

/// Require authentication (a valid session must be present).
pub fn require_auth(req: &Request) -> ApiResult<&AuthenticatedUser> {
    req.extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::Unauthorized("authentication required".to_string()))
}
