use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use super::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;
use crate::store::{Session, User};

/// User and session looked up from the store after JWT validation.
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub user: User,
    pub session: Session,
}

/// Middleware that validates the session and user behind the JWT claims.
/// A signature-valid token is still rejected when its session was revoked
/// or expired, the user was deleted, or the claims no longer match the
/// stored record.
pub async fn validate_session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // Get AuthUser from JWT middleware
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| {
            ApiError::unauthorized("JWT authentication required before session validation")
        })?
        .clone();

    let session = state
        .store
        .find_session(auth_user.session_id)
        .ok_or_else(|| {
            tracing::warn!(
                "Session validation failed: session {} not found for user '{}'",
                auth_user.session_id,
                auth_user.username
            );
            ApiError::unauthorized("Session is no longer active")
        })?;

    // The session records a digest of the token it was minted with; a
    // different signature-valid token cannot ride on this session's sid
    let token = super::auth::extract_jwt_from_headers(request.headers())
        .map_err(ApiError::unauthorized)?;
    if crate::auth::token_fingerprint(&token) != session.token_fingerprint {
        tracing::warn!(
            "Session validation failed: token fingerprint mismatch for session {}",
            session.uuid
        );
        return Err(ApiError::unauthorized("Session is no longer active"));
    }

    if !session.is_live(Utc::now()) {
        tracing::warn!(
            "Session validation failed: session {} for user '{}' is revoked or expired",
            session.uuid,
            auth_user.username
        );
        return Err(ApiError::unauthorized("Session is no longer active"));
    }

    let user = state.store.find_user(auth_user.user_id).ok_or_else(|| {
        tracing::warn!(
            "Session validation failed: user '{}' ({}) no longer exists",
            auth_user.username,
            auth_user.user_id
        );
        ApiError::forbidden("User is not active")
    })?;

    if session.user_id != user.uuid {
        tracing::warn!(
            "Session validation failed: session {} does not belong to user '{}'",
            session.uuid,
            auth_user.username
        );
        return Err(ApiError::forbidden("Session does not belong to this user"));
    }

    // Verify that JWT claims still match the stored record; a role change
    // invalidates tokens minted before it
    if user.role != auth_user.role {
        tracing::warn!(
            "Session validation failed: JWT role '{}' doesn't match stored role '{}'",
            auth_user.role,
            user.role
        );
        return Err(ApiError::forbidden("User role mismatch"));
    }

    tracing::debug!(
        "Session validation successful: {} ({}) via session {}",
        user.username,
        user.role,
        session.uuid
    );

    // Inject validated user into request
    request.extensions_mut().insert(CurrentUser { user, session });

    Ok(next.run(request).await)
}
