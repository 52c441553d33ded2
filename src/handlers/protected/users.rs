//! Account management. Listing is ADMIN+; individual access is self-or-admin
//! with the rank cap from [`crate::access::can_manage_user`].

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde_json::{json, Value};

use crate::access::{self, Role};
use crate::auth;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::state::AppState;
use crate::store::{User, UserPatch};

use super::utils::{list_params, parse_uuid, str_field, validate_body, ListQuery};

/// GET /api/users - Paginated, searchable account listing. ADMIN and above.
pub async fn list(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<User>> {
    if !current.user.role.is_admin() {
        return Err(ApiError::forbidden("forbidden"));
    }
    let params = list_params(&state.registry, &query)?;

    let page = state.store.list_users(
        |u| params.matches(&[&u.username, &u.email]),
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

/// GET /api/users/:uuid - Self or ADMIN+.
pub async fn get(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(raw): Path<String>,
) -> ApiResult<User> {
    let uuid = parse_uuid(&raw, "user")?;
    if uuid != current.user.uuid && !current.user.role.is_admin() {
        return Err(ApiError::forbidden("forbidden"));
    }
    let user = state
        .store
        .find_user(uuid)
        .ok_or_else(|| ApiError::not_found("user not found"))?;
    Ok(ApiResponse::success(user))
}

/// PUT /api/users/:uuid - Profile updates are self-or-admin. Role changes
/// additionally require ADMIN+, and neither the target's current role nor
/// the requested one may outrank the requester.
pub async fn update(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(raw): Path<String>,
    Json(payload): Json<Value>,
) -> ApiResult<User> {
    let uuid = parse_uuid(&raw, "user")?;
    let is_self = uuid == current.user.uuid;
    if !is_self && !current.user.role.is_admin() {
        return Err(ApiError::forbidden("forbidden"));
    }

    let body = validate_body(&state.registry, "user.update", &payload)?;

    let target = state
        .store
        .find_user(uuid)
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    if !is_self && !access::can_manage_user(current.user.role, target.role) {
        tracing::warn!(
            "'{}' ({}) may not manage '{}' ({})",
            current.user.username,
            current.user.role,
            target.username,
            target.role
        );
        return Err(ApiError::forbidden("forbidden"));
    }

    let mut patch = UserPatch {
        username: str_field(&body, "username").map(str::to_string),
        email: str_field(&body, "email").map(str::to_string),
        ..UserPatch::default()
    };

    if let Some(password) = str_field(&body, "password") {
        let salt = auth::generate_salt();
        patch.password_hash = Some(auth::hash_password(password, &salt));
        patch.salt = Some(salt);
    }

    if let Some(requested) = str_field(&body, "role") {
        // The schema already vetted membership; parse cannot fail here.
        let role = Role::parse(requested)
            .ok_or_else(|| ApiError::bad_request("role is not recognized"))?;
        if role != target.role {
            let allowed = access::can_manage_user(current.user.role, target.role)
                && role.rank() <= current.user.role.rank();
            if !allowed {
                tracing::warn!(
                    "'{}' ({}) denied role change {} -> {} for '{}'",
                    current.user.username,
                    current.user.role,
                    target.role,
                    role,
                    target.username
                );
                return Err(ApiError::forbidden("forbidden"));
            }
            patch.role = Some(role);
        }
    }

    let user = state.store.update_user(uuid, patch)?;
    Ok(ApiResponse::success(user))
}

/// DELETE /api/users/:uuid - Self, or an admin within their rank cap.
/// Cascades per the store: sessions revoked, owned projects/tasks/notes
/// removed, settings orphaned.
pub async fn delete(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(raw): Path<String>,
) -> ApiResult<Value> {
    let uuid = parse_uuid(&raw, "user")?;
    let is_self = uuid == current.user.uuid;
    if !is_self && !current.user.role.is_admin() {
        return Err(ApiError::forbidden("forbidden"));
    }

    let target = state
        .store
        .find_user(uuid)
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    if !is_self && !access::can_manage_user(current.user.role, target.role) {
        return Err(ApiError::forbidden("forbidden"));
    }

    state.store.delete_user(uuid)?;
    tracing::info!(
        "user '{}' deleted by '{}'",
        target.username,
        current.user.username
    );
    Ok(ApiResponse::success(json!({ "deleted": uuid })))
}
