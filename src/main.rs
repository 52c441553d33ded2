use anyhow::Context;
use axum::{middleware::from_fn, middleware::from_fn_with_state, routing::get, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use pulse_api::middleware::{jwt_auth_middleware, validate_session_middleware};
use pulse_api::state::AppState;
use pulse_api::validation::SchemaRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up JWT_SECRET, APP_ENV, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = pulse_api::config::config();
    tracing::info!(
        "Starting Project Pulse API in {} mode",
        config.environment.as_str()
    );

    let state = AppState::new(SchemaRegistry::builtin());
    state.seed_bootstrap_admin();

    let app = app(state);

    // Allow tests or deployments to override port via env
    let port = std::env::var("PULSE_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    println!("🚀 Project Pulse API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.context("server exited")?;
    Ok(())
}

fn app(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        // Public auth routes
        .merge(auth_public_routes())
        // Protected API behind JWT + session validation
        .merge(api_routes(state.clone()))
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn auth_public_routes() -> Router<AppState> {
    use axum::routing::post;
    use pulse_api::handlers::public::auth;

    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
}

/// Everything under `/api` runs the JWT middleware first, then the
/// store-backed session/user validation. Layer order is inside-out, so the
/// JWT layer is added last.
fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(auth_routes())
        .merge(user_routes())
        .merge(project_routes())
        .merge(task_routes())
        .merge(note_routes())
        .merge(setting_routes())
        .layer(from_fn_with_state(state, validate_session_middleware))
        .layer(from_fn(jwt_auth_middleware))
}

fn auth_routes() -> Router<AppState> {
    use axum::routing::delete;
    use pulse_api::handlers::protected::auth;

    Router::new()
        .route("/api/auth/whoami", get(auth::whoami))
        .route("/api/auth/session", delete(auth::logout))
        .route("/api/auth/sessions", get(auth::session_list))
        .route("/api/auth/sessions/:uuid", delete(auth::session_delete))
}

fn user_routes() -> Router<AppState> {
    use pulse_api::handlers::protected::users;

    Router::new()
        .route("/api/users", get(users::list))
        .route(
            "/api/users/:uuid",
            get(users::get).put(users::update).delete(users::delete),
        )
}

fn project_routes() -> Router<AppState> {
    use pulse_api::handlers::protected::projects;

    Router::new()
        .route("/api/projects", get(projects::list).post(projects::create))
        .route(
            "/api/projects/:uuid",
            get(projects::get)
                .put(projects::update)
                .delete(projects::delete),
        )
}

fn task_routes() -> Router<AppState> {
    use pulse_api::handlers::protected::tasks;

    Router::new()
        .route("/api/tasks", get(tasks::list).post(tasks::create))
        .route(
            "/api/tasks/:uuid",
            get(tasks::get).put(tasks::update).delete(tasks::delete),
        )
}

fn note_routes() -> Router<AppState> {
    use pulse_api::handlers::protected::notes;

    Router::new()
        .route("/api/notes", get(notes::list).post(notes::create))
        .route(
            "/api/notes/:uuid",
            get(notes::get).put(notes::update).delete(notes::delete),
        )
}

fn setting_routes() -> Router<AppState> {
    use pulse_api::handlers::protected::settings;

    Router::new()
        .route("/api/settings", get(settings::list).post(settings::create))
        .route(
            "/api/settings/:uuid",
            get(settings::get)
                .put(settings::update)
                .delete(settings::delete),
        )
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Project Pulse API",
            "version": version,
            "description": "Project/task/note management backend with role-based access",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "public_auth": "/auth/register, /auth/login (public - token acquisition)",
                "auth": "/api/auth/* (protected - session management)",
                "users": "/api/users[/:uuid] (protected)",
                "projects": "/api/projects[/:uuid] (protected)",
                "tasks": "/api/tasks[/:uuid] (protected)",
                "notes": "/api/notes[/:uuid] (protected)",
                "settings": "/api/settings[/:uuid] (protected - visibility-guarded)",
            }
        }
    }))
}

async fn health() -> axum::response::Json<Value> {
    axum::response::Json(json!({
        "success": true,
        "data": {
            "status": "ok",
            "timestamp": chrono::Utc::now()
        }
    }))
}
