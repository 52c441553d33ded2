//! Public authentication endpoints: account creation and token acquisition.

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::access::Role;
use crate::auth::{self, Claims};
use crate::error::ApiError;
use crate::handlers::protected::utils::{str_field, validate_body};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::store::{NewSession, NewUser};

/// POST /auth/register - Create a new USER-role account.
///
/// Roles are never granted at registration; promotion goes through
/// `PUT /api/users/:uuid` by an ADMIN or above.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> ApiResult<Value> {
    let body = validate_body(&state.registry, "user.register", &payload)?;

    let username = str_field(&body, "username").unwrap_or_default().to_string();
    let email = str_field(&body, "email").unwrap_or_default().to_string();
    let password = str_field(&body, "password").unwrap_or_default();

    let salt = auth::generate_salt();
    let password_hash = auth::hash_password(password, &salt);

    let user = state.store.create_user(NewUser {
        username,
        email,
        password_hash,
        salt,
        role: Role::User,
    })?;

    tracing::info!("registered user '{}' ({})", user.username, user.uuid);

    Ok(ApiResponse::created(json!({ "user": user })))
}

/// POST /auth/login - Verify credentials and mint a JWT bound to a fresh
/// session.
///
/// Bad username and bad password produce the same response so the endpoint
/// cannot be used to enumerate accounts.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> ApiResult<Value> {
    let body = validate_body(&state.registry, "auth.login", &payload)?;

    let username = str_field(&body, "username").unwrap_or_default();
    let password = str_field(&body, "password").unwrap_or_default();

    let user = state
        .store
        .find_user_by_username(username)
        .ok_or_else(|| ApiError::unauthorized("invalid username or password"))?;

    if !auth::verify_password(password, &user.salt, &user.password_hash) {
        tracing::warn!("failed login attempt for '{}'", user.username);
        return Err(ApiError::unauthorized("invalid username or password"));
    }

    let session_id = Uuid::new_v4();
    let claims = Claims::new(&user, session_id);
    let token = auth::generate_jwt(&claims)?;

    state.store.create_session(NewSession {
        uuid: session_id,
        user_id: user.uuid,
        token_fingerprint: auth::token_fingerprint(&token),
        expires_at: claims.expires_at(),
    });

    tracing::info!("user '{}' logged in via session {}", user.username, session_id);

    Ok(ApiResponse::success(json!({
        "token": token,
        "expires_at": claims.expires_at(),
        "user": user
    })))
}
