//! Test fixtures and HTTP helpers.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

/// Make a JSON request against the router, optionally authenticated with a
/// bearer session token.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub async fn json_request(
    router: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    auth_token: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = auth_token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }

    let body = match body {
        Some(v) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&v).unwrap())
        }
        None => Body::empty(),
    };

    let request = builder.body(body).unwrap();
    let response = router.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let json: Value = if body_bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
    };

    (status, json)
}

/// Register a user and return their user_id.
#[allow(dead_code)]
pub async fn register_user(router: &axum::Router, username: &str, password: &str) -> String {
    let (status, body) = json_request(
        router,
        "POST",
        "/v1/users/register",
        Some(json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": password,
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
    body["user_id"].as_str().unwrap().to_string()
}

/// Log a user in and return the raw session token.
#[allow(dead_code)]
pub async fn login_user(router: &axum::Router, username: &str, password: &str) -> String {
    let (status, body) = json_request(
        router,
        "POST",
        "/v1/users/login",
        Some(json!({ "username": username, "password": password })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["token"].as_str().unwrap().to_string()
}

/// Register and log in a user in one step, returning (user_id, token).
#[allow(dead_code)]
pub async fn signup_and_login(router: &axum::Router, username: &str) -> (String, String) {
    let user_id = register_user(router, username, "hunter22").await;
    let token = login_user(router, username, "hunter22").await;
    (user_id, token)
}

/// Create a task for the authenticated user, returning its task_id.
#[allow(dead_code)]
pub async fn create_task(router: &axum::Router, token: &str, title: &str) -> String {
    let (status, body) = json_request(
        router,
        "POST",
        "/v1/tasks",
        Some(json!({ "title": title })),
        Some(token),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create task failed: {body}");
    body["task_id"].as_str().unwrap().to_string()
}
