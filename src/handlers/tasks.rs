use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde_json::json;
use uuid::Uuid;

use crate::db::query::{TaskChangeset, TaskFilter, bind_all};
use crate::error::ApiError;
use crate::middleware::auth::AuthenticatedUser;
use crate::middleware::json::Json;
use crate::models::task::{
    CreateTaskRequest, InvalidPriority, ListTasksQuery, Task, TaskPriority, TaskStatus,
    UpdateTaskRequest,
};
use crate::state::AppState;

/// Lists the caller's tasks.
///
/// Supports query parameters:
/// - search: case-insensitive substring match over title and description
/// - status / priority: exact match, skipped when blank
/// - delivery_date: YYYY-MM-DD literal; anything else is ignored
/// - sort_by: "field:direction" over an allow-listed set of columns
///
/// An unrecognized sort_by falls back to the default order (list_title, then
/// newest first) instead of erroring.
pub async fn list_tasks(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(params): Query<ListTasksQuery>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let filter = TaskFilter::from_query(user.id, &params);
    let (sql, binds) = filter.render();
    tracing::debug!(user = %user.id, query = %sql, "listing tasks");

    let tasks: Vec<Task> = bind_all(&sql, binds).fetch_all(&state.db).await?;

    Ok((StatusCode::OK, Json(json!(tasks))))
}

/// Creates a task owned by the caller.
///
/// Only the title is required. Blank or missing list_title defaults to
/// "Backlog", blank or missing priority to "normal".
pub async fn create_task(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let title = payload
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Validation("The task title is required".to_string()))?;

    let priority = TaskPriority::parse_or_default(payload.priority.as_deref())
        .map_err(|InvalidPriority(raw)| ApiError::Validation(format!("Invalid priority: {raw}")))?;

    let list_title = payload
        .list_title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or("Backlog");

    // Every task starts in To Do; callers cannot spawn finished work.
    let task: Task = sqlx::query_as(
        r#"
        INSERT INTO tasks (title, description, status, list_title, delivery_date, priority, user_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(title)
    .bind(payload.description.as_deref())
    .bind(TaskStatus::ToDo.as_str())
    .bind(list_title)
    .bind(payload.delivery_date)
    .bind(priority.as_str())
    .bind(user.id)
    .fetch_one(&state.db)
    .await?;

    tracing::debug!(user = %user.id, task = %task.id, "created task");

    Ok((StatusCode::CREATED, Json(json!(task))))
}

/// Applies a partial update to one of the caller's tasks. Only the supplied
/// fields change; sending `null` for description or delivery_date clears it.
pub async fn update_task(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTaskRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let changeset = TaskChangeset::from_request(&payload)
        .map_err(|err| ApiError::Validation(err.to_string()))?;

    let (sql, binds) = changeset.render_update(id, user.id);
    tracing::debug!(user = %user.id, task = %id, query = %sql, "updating task");

    let updated: Option<Task> = bind_all(&sql, binds).fetch_optional(&state.db).await?;

    match updated {
        Some(task) => Ok((StatusCode::OK, Json(json!(task)))),
        // Missing and not-owned are deliberately the same answer.
        None => Err(ApiError::NotFound("Task not found".to_string())),
    }
}

pub async fn delete_task(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let deleted: Option<Task> =
        sqlx::query_as("DELETE FROM tasks WHERE id = $1 AND user_id = $2 RETURNING *")
            .bind(id)
            .bind(user.id)
            .fetch_optional(&state.db)
            .await?;

    match deleted {
        Some(task) => Ok((
            StatusCode::OK,
            Json(json!({
                "message": format!("Task {id} deleted successfully"),
                "deleted_task": task,
            })),
        )),
        None => Err(ApiError::NotFound("Task not found".to_string())),
    }
}

/// Sweeps every task of the caller's that is already Done.
pub async fn delete_completed_tasks(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let deleted: Vec<Task> =
        sqlx::query_as("DELETE FROM tasks WHERE status = $1 AND user_id = $2 RETURNING *")
            .bind(TaskStatus::Done.as_str())
            .bind(user.id)
            .fetch_all(&state.db)
            .await?;

    // An empty sweep is a success, not an error.
    Ok((
        StatusCode::OK,
        Json(json!({
            "message": format!("{} completed tasks deleted", deleted.len()),
            "count": deleted.len(),
            "deleted_tasks": deleted,
        })),
    ))
}
