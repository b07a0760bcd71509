//! Route configuration.

use crate::auth::auth_middleware;
use crate::handlers;
use crate::state::AppState;
use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::compression::CompressionLayer;
use tower_http::decompression::RequestDecompressionLayer;
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        // Health check (intentionally unauthenticated for load balancers/probes)
        .route("/v1/health", get(handlers::health_check))
        // User accounts and sessions
        .route("/v1/users/register", post(handlers::register))
        .route("/v1/users/login", post(handlers::login))
        .route("/v1/users/logout", post(handlers::logout))
        .route(
            "/v1/users/{user_id}",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        // Tasks (all owner-scoped)
        .route(
            "/v1/tasks",
            post(handlers::create_task).get(handlers::list_tasks),
        )
        .route(
            "/v1/tasks/{task_id}",
            get(handlers::get_task)
                .put(handlers::update_task)
                .delete(handlers::delete_task),
        );

    // Middleware layers are applied in reverse order (outermost first).
    // Execution order: TraceLayer -> decompression -> auth -> handler -> compression.
    router
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(CompressionLayer::new())
        .layer(RequestDecompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
