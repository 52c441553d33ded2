//! Settings CRUD behind the visibility resolver.
//!
//! A well-formed uuid that matches nothing is a 404; an existing setting the
//! requester may not reach is a uniform 403 whose reason goes to the log,
//! never the response.

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde_json::{json, Value};

use crate::access::{self, Decision, Visibility};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::state::AppState;
use crate::store::{NewSetting, Setting, SettingKind, SettingPatch};

use super::utils::{list_params, parse_uuid, str_field, validate_body, ListQuery};

/// GET /api/settings - Exactly the settings the requester could read
/// one-by-one, which makes the listing consistent with individual GETs.
pub async fn list(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Setting>> {
    let params = list_params(&state.registry, &query)?;

    let page = state.store.list_settings(
        |s| {
            access::resolve_access(
                current.user.role,
                current.user.uuid,
                s.user_id,
                s.visibility,
            )
            .is_allowed()
                && params.matches(&[&s.key, &s.category])
        },
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

/// POST /api/settings - The requested visibility tier must be within what
/// the requester's role may create; that check runs before anything touches
/// the store. Key uniqueness is per owning user and enforced by the store
/// under its write lock.
pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<Value>,
) -> ApiResult<Setting> {
    let body = validate_body(&state.registry, "setting.create", &payload)?;

    let visibility = str_field(&body, "visibility")
        .and_then(Visibility::parse)
        .unwrap_or(Visibility::User);

    if !access::can_create(current.user.role, visibility) {
        tracing::warn!(
            "'{}' ({}) denied creating a {} setting",
            current.user.username,
            current.user.role,
            visibility
        );
        return Err(ApiError::forbidden("forbidden"));
    }

    let setting = state.store.create_setting(NewSetting {
        user_id: current.user.uuid,
        key: str_field(&body, "key").unwrap_or_default().to_string(),
        value: str_field(&body, "value").unwrap_or_default().to_string(),
        kind: str_field(&body, "type")
            .and_then(SettingKind::parse)
            .unwrap_or_default(),
        category: str_field(&body, "category").unwrap_or("general").to_string(),
        visibility,
    })?;
    Ok(ApiResponse::created(setting))
}

/// GET /api/settings/:uuid
pub async fn get(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(raw): Path<String>,
) -> ApiResult<Setting> {
    let setting = fetch(&state, &current, &raw)?;
    Ok(ApiResponse::success(setting))
}

/// PUT /api/settings/:uuid - A visibility change is held to the same rule
/// as creation: the requester must be able to create at the new tier. A key
/// change re-checks per-user uniqueness in the store.
pub async fn update(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(raw): Path<String>,
    Json(payload): Json<Value>,
) -> ApiResult<Setting> {
    let setting = fetch(&state, &current, &raw)?;
    let body = validate_body(&state.registry, "setting.update", &payload)?;

    let visibility = match str_field(&body, "visibility").and_then(Visibility::parse) {
        Some(requested) if requested != setting.visibility => {
            if !access::can_create(current.user.role, requested) {
                tracing::warn!(
                    "'{}' ({}) denied retiering setting {} to {}",
                    current.user.username,
                    current.user.role,
                    setting.uuid,
                    requested
                );
                return Err(ApiError::forbidden("forbidden"));
            }
            Some(requested)
        }
        other => other,
    };

    let patch = SettingPatch {
        key: str_field(&body, "key").map(str::to_string),
        value: str_field(&body, "value").map(str::to_string),
        kind: str_field(&body, "type").and_then(SettingKind::parse),
        category: str_field(&body, "category").map(str::to_string),
        visibility,
    };
    let setting = state.store.update_setting(setting.uuid, patch)?;
    Ok(ApiResponse::success(setting))
}

/// DELETE /api/settings/:uuid
pub async fn delete(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(raw): Path<String>,
) -> ApiResult<Value> {
    let setting = fetch(&state, &current, &raw)?;
    state.store.delete_setting(setting.uuid)?;
    Ok(ApiResponse::success(json!({ "deleted": setting.uuid })))
}

fn fetch(state: &AppState, current: &CurrentUser, raw: &str) -> Result<Setting, ApiError> {
    let uuid = parse_uuid(raw, "setting")?;
    let setting = state
        .store
        .find_setting(uuid)
        .ok_or_else(|| ApiError::not_found("setting not found"))?;

    match access::resolve_access(
        current.user.role,
        current.user.uuid,
        setting.user_id,
        setting.visibility,
    ) {
        Decision::Allowed => Ok(setting),
        Decision::Denied(reason) => {
            tracing::warn!(
                "'{}' ({}) denied on setting {}: {}",
                current.user.username,
                current.user.role,
                setting.uuid,
                reason
            );
            Err(ApiError::forbidden("forbidden"))
        }
    }
}
