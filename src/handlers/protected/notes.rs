//! Note CRUD. Content is HTML and passes the allowlist check in the note
//! schemas before it is stored.

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::state::AppState;
use crate::store::{NewNote, Note, NotePatch};

use super::utils::{can_touch, list_params, parse_uuid, str_field, validate_body, ListQuery};

/// GET /api/notes
pub async fn list(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Note>> {
    let params = list_params(&state.registry, &query)?;

    let page = state.store.list_notes(
        |n| can_touch(n.owner_id, &current) && params.matches(&[&n.title, &n.content]),
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

/// POST /api/notes - `project_uuid` is optional; a standalone note is fine.
pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<Value>,
) -> ApiResult<Note> {
    let body = validate_body(&state.registry, "note.create", &payload)?;

    let project_id = resolve_project(&state, &current, str_field(&body, "project_uuid"))?;

    let note = state.store.create_note(NewNote {
        owner_id: current.user.uuid,
        project_id,
        title: str_field(&body, "title").unwrap_or_default().to_string(),
        content: str_field(&body, "content").unwrap_or_default().to_string(),
    });
    Ok(ApiResponse::created(note))
}

/// GET /api/notes/:uuid
pub async fn get(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(raw): Path<String>,
) -> ApiResult<Note> {
    let note = fetch(&state, &current, &raw)?;
    Ok(ApiResponse::success(note))
}

/// PUT /api/notes/:uuid
pub async fn update(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(raw): Path<String>,
    Json(payload): Json<Value>,
) -> ApiResult<Note> {
    let note = fetch(&state, &current, &raw)?;
    let body = validate_body(&state.registry, "note.update", &payload)?;

    let patch = NotePatch {
        title: str_field(&body, "title").map(str::to_string),
        content: str_field(&body, "content").map(str::to_string),
        project_id: resolve_project(&state, &current, str_field(&body, "project_uuid"))?,
    };
    let note = state.store.update_note(note.uuid, patch)?;
    Ok(ApiResponse::success(note))
}

/// DELETE /api/notes/:uuid
pub async fn delete(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(raw): Path<String>,
) -> ApiResult<Value> {
    let note = fetch(&state, &current, &raw)?;
    state.store.delete_note(note.uuid)?;
    Ok(ApiResponse::success(json!({ "deleted": note.uuid })))
}

fn fetch(state: &AppState, current: &CurrentUser, raw: &str) -> Result<Note, ApiError> {
    let uuid = parse_uuid(raw, "note")?;
    let note = state
        .store
        .find_note(uuid)
        .ok_or_else(|| ApiError::not_found("note not found"))?;
    if !can_touch(note.owner_id, current) {
        return Err(ApiError::forbidden("forbidden"));
    }
    Ok(note)
}

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
