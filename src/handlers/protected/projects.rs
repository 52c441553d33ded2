//! Project CRUD. Owners see their own; ADMIN and above see everything.

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::state::AppState;
use crate::store::{NewProject, Project, ProjectPatch, ProjectStatus};

use super::utils::{can_touch, list_params, parse_uuid, str_field, validate_body, ListQuery};

/// GET /api/projects
pub async fn list(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Project>> {
    let params = list_params(&state.registry, &query)?;

    let page = state.store.list_projects(
        |p| can_touch(p.owner_id, &current) && params.matches(&[&p.name, &p.description]),
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

/// POST /api/projects
pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<Value>,
) -> ApiResult<Project> {
    let body = validate_body(&state.registry, "project.create", &payload)?;

    let status = str_field(&body, "status")
        .and_then(ProjectStatus::parse)
        .unwrap_or_default();

    let project = state.store.create_project(NewProject {
        owner_id: current.user.uuid,
        name: str_field(&body, "name").unwrap_or_default().to_string(),
        description: str_field(&body, "description").unwrap_or_default().to_string(),
        status,
    });
    Ok(ApiResponse::created(project))
}

/// GET /api/projects/:uuid
pub async fn get(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(raw): Path<String>,
) -> ApiResult<Project> {
    let project = fetch(&state, &current, &raw)?;
    Ok(ApiResponse::success(project))
}

/// PUT /api/projects/:uuid
pub async fn update(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(raw): Path<String>,
    Json(payload): Json<Value>,
) -> ApiResult<Project> {
    let project = fetch(&state, &current, &raw)?;
    let body = validate_body(&state.registry, "project.update", &payload)?;

    let patch = ProjectPatch {
        name: str_field(&body, "name").map(str::to_string),
        description: str_field(&body, "description").map(str::to_string),
        status: str_field(&body, "status").and_then(ProjectStatus::parse),
    };
    let project = state.store.update_project(project.uuid, patch)?;
    Ok(ApiResponse::success(project))
}

/// DELETE /api/projects/:uuid - Contained tasks go with the project; notes
/// are detached instead.
pub async fn delete(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(raw): Path<String>,
) -> ApiResult<Value> {
    let project = fetch(&state, &current, &raw)?;
    state.store.delete_project(project.uuid)?;
    Ok(ApiResponse::success(json!({ "deleted": project.uuid })))
}

/// Not-found is reported before forbidden for a well-formed uuid that
/// matches nothing; an existing project the requester cannot touch is a
/// plain 403.
fn fetch(state: &AppState, current: &CurrentUser, raw: &str) -> Result<Project, ApiError> {
    let uuid = parse_uuid(raw, "project")?;
    let project = state
        .store
        .find_project(uuid)
        .ok_or_else(|| ApiError::not_found("project not found"))?;
    if !can_touch(project.owner_id, current) {
        return Err(ApiError::forbidden("forbidden"));
    }
    Ok(project)
}
