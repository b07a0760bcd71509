//! Task endpoints: create, read, list, update, soft delete.
//!
//! Every task-scoped route runs the same ownership protocol: resolve the
//! caller, load the row by id (tombstoned rows included), 404 when absent,
//! 403 when the caller is not the owner, and only then mutate.

use crate::auth::{AuthenticatedUser, require_auth};
use crate::error::{ApiError, ApiResult};
use crate::handlers::common::{format_timestamp, provided, read_json_body};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use docket_core::task::{TaskStatus, validate_description, validate_title};
use docket_store::models::TaskRow;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    /// Defaults to "new" when omitted.
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub task_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: String,
    pub user_id: Uuid,
    /// Tombstone state. A soft-deleted task stays addressable by id (with
    /// this flag set) until the reclamation purge removes it.
    pub deleted: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl TaskResponse {
    fn from_row(row: &TaskRow) -> ApiResult<Self> {
        Ok(Self {
            task_id: row.task_id,
            title: row.title.clone(),
            description: row.description.clone(),
            status: row.status.clone(),
            user_id: row.user_id,
            deleted: row.deleted,
            created_at: format_timestamp(row.created_at)?,
            updated_at: format_timestamp(row.updated_at)?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteTaskResponse {
    pub message: String,
}

/// Load a task and verify the caller owns it.
///
/// Absent rows are 404; rows owned by someone else are 403. Existence is
/// deliberately not hidden from non-owners. Tombstoned rows resolve here so
/// that a delete raced against a purge still reports consistently.
async fn fetch_owned_task(
    state: &AppState,
    auth: &AuthenticatedUser,
    task_id: Uuid,
) -> ApiResult<TaskRow> {
    let task = state
        .store
        .get_task(task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("task {task_id} not found")))?;

    if task.user_id != auth.user_id {
        return Err(ApiError::Forbidden(
            "task belongs to another user".to_string(),
        ));
    }
    Ok(task)
}

/// POST /v1/tasks - Create a task owned by the caller.
///
/// Ownership is never client-controlled: the body cannot name an owner.
pub async fn create_task(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<(StatusCode, Json<TaskResponse>)> {
    let auth = require_auth(&req)?.clone();
    let body: CreateTaskRequest = read_json_body(req).await?;

    validate_title(&body.title)?;
    let description = body.description.unwrap_or_default();
    validate_description(&description)?;
    let status = match body.status.as_deref() {
        Some(s) => TaskStatus::parse(s)?,
        None => TaskStatus::New,
    };

    let now = OffsetDateTime::now_utc();
    let task = TaskRow {
        task_id: Uuid::new_v4(),
        title: body.title,
        description,
        status: status.as_str().to_string(),
        user_id: auth.user_id,
        deleted: false,
        created_at: now,
        updated_at: now,
    };
    state.store.create_task(&task).await?;

    tracing::info!(task_id = %task.task_id, user_id = %auth.user_id, "task created");
    Ok((StatusCode::CREATED, Json(TaskResponse::from_row(&task)?)))
}

/// GET /v1/tasks - List the caller's active tasks.
///
/// Structurally owner-scoped: the query itself filters by owner, so there is
/// no cross-tenant row to leak. An empty list is reported as 404.
pub async fn list_tasks(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<Vec<TaskResponse>>> {
    let auth = require_auth(&req)?;

    let rows = state.store.list_active_tasks(auth.user_id).await?;
    if rows.is_empty() {
        return Err(ApiError::NotFound("no tasks found".to_string()));
    }

    let tasks = rows
        .iter()
        .map(TaskResponse::from_row)
        .collect::<ApiResult<Vec<_>>>()?;
    Ok(Json(tasks))
}

/// GET /v1/tasks/{task_id} - Read one task, owner only.
pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
    req: Request,
) -> ApiResult<Json<TaskResponse>> {
    let auth = require_auth(&req)?.clone();
    let task = fetch_owned_task(&state, &auth, task_id).await?;
    Ok(Json(TaskResponse::from_row(&task)?))
}

/// PUT /v1/tasks/{task_id} - Update one task, owner only.
///
/// Merges only provided, non-empty fields; everything else keeps its stored
/// value.
pub async fn update_task(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
    req: Request,
) -> ApiResult<Json<TaskResponse>> {
    let auth = require_auth(&req)?.clone();
    let body: UpdateTaskRequest = read_json_body(req).await?;

    let mut task = fetch_owned_task(&state, &auth, task_id).await?;

    if let Some(title) = provided(&body.title) {
        validate_title(title)?;
        task.title = title.to_string();
    }
    if let Some(description) = provided(&body.description) {
        validate_description(description)?;
        task.description = description.to_string();
    }
    if let Some(status) = provided(&body.status) {
        task.status = TaskStatus::parse(status)?.as_str().to_string();
    }
    task.updated_at = OffsetDateTime::now_utc();

    state.store.update_task(&task).await?;
    Ok(Json(TaskResponse::from_row(&task)?))
}

/// DELETE /v1/tasks/{task_id} - Soft-delete one task, owner only.
///
/// The store performs the atomic tombstone flip and the reclamation decision;
/// a task that is already tombstoned (or purged) reports 404.
pub async fn delete_task(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
    req: Request,
) -> ApiResult<Json<DeleteTaskResponse>> {
    let auth = require_auth(&req)?.clone();
    fetch_owned_task(&state, &auth, task_id).await?;

    state.store.soft_delete_task(task_id).await?;

    tracing::info!(task_id = %task_id, user_id = %auth.user_id, "task soft-deleted");
    Ok(Json(DeleteTaskResponse {
        message: "task deleted".to_string(),
    }))
}
