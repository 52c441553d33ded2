//! Task CRUD. Every task lives inside a project the requester can touch.

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::state::AppState;
use crate::store::{NewTask, Task, TaskPatch, TaskPriority, TaskStatus};

use super::utils::{can_touch, list_params, parse_uuid, str_field, validate_body, ListQuery};

/// GET /api/tasks
pub async fn list(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Task>> {
    let params = list_params(&state.registry, &query)?;

    let page = state.store.list_tasks(
        |t| can_touch(t.owner_id, &current) && params.matches(&[&t.title, &t.description]),
        params.page,
        params.limit,
    );
    Ok(ApiResponse::paginated(
        page.items,
        params.page,
        params.limit,
        page.total,
    ))
}

/// POST /api/tasks - `project_uuid` must resolve to a project the requester
/// can touch.
pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<Value>,
) -> ApiResult<Task> {
    let body = validate_body(&state.registry, "task.create", &payload)?;

    let project_id = resolve_project(&state, &current, str_field(&body, "project_uuid"))?
        .ok_or_else(|| ApiError::bad_request("project_uuid is required"))?;

    let task = state.store.create_task(NewTask {
        owner_id: current.user.uuid,
        project_id,
        title: str_field(&body, "title").unwrap_or_default().to_string(),
        description: str_field(&body, "description").unwrap_or_default().to_string(),
        status: str_field(&body, "status")
            .and_then(TaskStatus::parse)
            .unwrap_or_default(),
        priority: str_field(&body, "priority")
            .and_then(TaskPriority::parse)
            .unwrap_or_default(),
        due_date: parse_due_date(&body)?,
        tags: tags_field(&body),
    });
    Ok(ApiResponse::created(task))
}

/// GET /api/tasks/:uuid
pub async fn get(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(raw): Path<String>,
) -> ApiResult<Task> {
    let task = fetch(&state, &current, &raw)?;
    Ok(ApiResponse::success(task))
}

/// PUT /api/tasks/:uuid - Moving a task re-checks access to the destination
/// project.
pub async fn update(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(raw): Path<String>,
    Json(payload): Json<Value>,
) -> ApiResult<Task> {
    let task = fetch(&state, &current, &raw)?;
    let body = validate_body(&state.registry, "task.update", &payload)?;

    let patch = TaskPatch {
        title: str_field(&body, "title").map(str::to_string),
        description: str_field(&body, "description").map(str::to_string),
        project_id: resolve_project(&state, &current, str_field(&body, "project_uuid"))?,
        status: str_field(&body, "status").and_then(TaskStatus::parse),
        priority: str_field(&body, "priority").and_then(TaskPriority::parse),
        due_date: parse_due_date(&body)?,
        tags: body.get("tags").map(|_| tags_field(&body)),
    };
    let task = state.store.update_task(task.uuid, patch)?;
    Ok(ApiResponse::success(task))
}

/// DELETE /api/tasks/:uuid
pub async fn delete(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(raw): Path<String>,
) -> ApiResult<Value> {
    let task = fetch(&state, &current, &raw)?;
    state.store.delete_task(task.uuid)?;
    Ok(ApiResponse::success(json!({ "deleted": task.uuid })))
}

fn fetch(state: &AppState, current: &CurrentUser, raw: &str) -> Result<Task, ApiError> {
    let uuid = parse_uuid(raw, "task")?;
    let task = state
        .store
        .find_task(uuid)
        .ok_or_else(|| ApiError::not_found("task not found"))?;
    if !can_touch(task.owner_id, current) {
        return Err(ApiError::forbidden("forbidden"));
    }
    Ok(task)
}

/// Maps an optional sanitized `project_uuid` to the project's uuid, failing
/// when it names a project that does not exist or is out of reach.
fn resolve_project(
    state: &AppState,
    current: &CurrentUser,
    raw: Option<&str>,
) -> Result<Option<Uuid>, ApiError> {
    let raw = match raw {
        Some(raw) => raw,
        None => return Ok(None),
    };
    let uuid = parse_uuid(raw, "project")?;
    let project = state
        .store
        .find_project(uuid)
        .ok_or_else(|| ApiError::not_found("project not found"))?;
    if !can_touch(project.owner_id, current) {
        return Err(ApiError::forbidden("forbidden"));
    }
    Ok(Some(project.uuid))
}

/// The date validator normalizes accepted input to RFC3339, so this parse
/// only fails if a schema stops doing that.
fn parse_due_date(body: &serde_json::Map<String, Value>) -> Result<Option<DateTime<Utc>>, ApiError> {
    match str_field(body, "due_date") {
        None => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|_| ApiError::bad_request("due_date is not a valid date")),
    }
}

fn tags_field(body: &serde_json::Map<String, Value>) -> Vec<String> {
    body.get("tags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
