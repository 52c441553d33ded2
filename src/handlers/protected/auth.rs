//! Session management for authenticated users.

use axum::extract::{Path, State};
use axum::Extension;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::state::AppState;
use crate::store::Session;

use super::utils::parse_uuid;

/// GET /api/auth/whoami - The user and session behind the presented token.
pub async fn whoami(
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "user": current.user,
        "session": current.session
    })))
}

/// DELETE /api/auth/session - Log out by revoking the current session. The
/// token itself stays cryptographically valid until expiry, but the session
/// middleware rejects it from here on.
pub async fn logout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Value> {
    let session = state.store.revoke_session(current.session.uuid)?;
    tracing::info!(
        "user '{}' logged out of session {}",
        current.user.username,
        session.uuid
    );
    Ok(ApiResponse::success(json!({ "revoked": session.uuid })))
}

/// GET /api/auth/sessions - Every session belonging to the current user,
/// live or not.
pub async fn session_list(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Vec<Session>> {
    let sessions = state.store.sessions_for_user(current.user.uuid);
    Ok(ApiResponse::success(sessions))
}

/// DELETE /api/auth/sessions/:uuid - Revoke one of the current user's
/// sessions. Someone else's session uuid reads as not-found rather than
/// forbidden so session ids cannot be probed.
pub async fn session_delete(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(raw): Path<String>,
) -> ApiResult<Value> {
    let uuid = parse_uuid(&raw, "session")?;

    let session = state
        .store
        .find_session(uuid)
        .filter(|s| s.user_id == current.user.uuid)
        .ok_or_else(|| ApiError::not_found("session not found"))?;

    let session = state.store.revoke_session(session.uuid)?;
    Ok(ApiResponse::success(json!({ "revoked": session.uuid })))
}
