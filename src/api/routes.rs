//! Router assembly and server lifecycle.

use std::sync::Arc;

use axum::middleware;
use axum::{
    extract::State,
    response::Json,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::auth::TokenIssuer;
use crate::config::Config;
use crate::planner::SubtaskGenerator;
use crate::service::TaskService;
use crate::store::{create_task_store, TaskStore};

use super::auth;
use super::tasks;
use super::types::{HealthResponse, WelcomeResponse};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    /// Task orchestration (ownership checks, generation)
    pub service: TaskService,
    /// Direct store access for account endpoints
    pub store: Arc<dyn TaskStore>,
    pub tokens: TokenIssuer,
}

impl AppState {
    /// Open the configured store and wire up the service.
    pub async fn from_config(config: Config) -> anyhow::Result<Arc<Self>> {
        let store = create_task_store(config.store_type, &config.database_path).await?;
        let generator = SubtaskGenerator::from_config(&config.generation);
        if generator.is_configured() {
            tracing::info!(model = %config.generation.model, "AI subtask generation enabled");
        } else {
            tracing::warn!("OPENAI_API_KEY not set; subtask generation will use fallback lists");
        }

        Ok(Arc::new(Self {
            service: TaskService::new(Arc::clone(&store), generator),
            tokens: TokenIssuer::from_config(&config.auth),
            store,
            config,
        }))
    }
}

/// Build the application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/", get(welcome))
        .route("/api/health", get(health))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh));

    let protected_routes = Router::new()
        .route("/me", get(auth::me).put(auth::update_me))
        .route("/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route(
            "/tasks/:id",
            get(tasks::get_task)
                .put(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route("/tasks/:id/subtasks", post(tasks::create_subtask))
        .route("/tasks/:id/generate-subtasks", post(tasks::generate_subtasks))
        .route(
            "/subtasks/:id",
            put(tasks::update_subtask).delete(tasks::delete_subtask),
        )
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(TimeoutLayer::new(state.config.request_timeout))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::from_config(config).await?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

async fn welcome() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "Welcome to TaskTune API".to_string(),
    })
}

/// Health check endpoint.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        ai_generation_configured: state.service.generation_configured(),
        persistent_store: state.store.is_persistent(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{RefreshResponse, TokenResponse, UserResponse};
    use crate::task::Subtask;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde::de::DeserializeOwned;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn app() -> Router {
        let state = AppState::from_config(Config::for_testing())
            .await
            .expect("Failed to build state");
        build_router(state)
    }

    async fn send(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    fn parse<T: DeserializeOwned>(bytes: &[u8]) -> T {
        serde_json::from_slice(bytes).unwrap()
    }

    async fn register_and_login(app: &Router, email: &str) -> TokenResponse {
        let (status, _) = send(
            app,
            "POST",
            "/register",
            None,
            Some(json!({"name": "Ada", "email": email, "password": "s3cret"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            app,
            "POST",
            "/login",
            None,
            Some(json!({"email": email, "password": "s3cret"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        parse(&body)
    }

    #[tokio::test]
    async fn test_public_endpoints() {
        let app = app().await;

        let (status, body) = send(&app, "GET", "/", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(parse::<Value>(&body)["message"], "Welcome to TaskTune API");

        let (status, body) = send(&app, "GET", "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let health: HealthResponse = parse(&body);
        assert_eq!(health.status, "ok");
        assert!(!health.ai_generation_configured);
        assert!(!health.persistent_store);
    }

    #[tokio::test]
    async fn test_protected_routes_require_token() {
        let app = app().await;
        let (status, _) = send(&app, "GET", "/tasks", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, "GET", "/tasks", Some("not-a-jwt"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_register_login_and_profile() {
        let app = app().await;
        let tokens = register_and_login(&app, "ada@example.com").await;
        assert_eq!(tokens.token_type, "bearer");
        assert_eq!(tokens.user.email, "ada@example.com");
        assert_eq!(tokens.user.settings.as_ref().map(|s| s.theme.as_str()), Some("light"));

        let (status, _) = send(
            &app,
            "POST",
            "/register",
            None,
            Some(json!({"name": "Again", "email": "ADA@example.com", "password": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            "POST",
            "/login",
            None,
            Some(json!({"email": "ada@example.com", "password": "wrong"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // A refresh token must not work as an access token.
        let (status, _) = send(&app, "GET", "/me", Some(&tokens.refresh_token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(
            &app,
            "POST",
            "/refresh",
            None,
            Some(json!({"refresh_token": tokens.refresh_token})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let refreshed: RefreshResponse = parse(&body);

        let (status, body) = send(
            &app,
            "PUT",
            "/me",
            Some(&refreshed.access_token),
            Some(json!({"name": "Ada Lovelace"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(parse::<UserResponse>(&body).name, "Ada Lovelace");

        let (status, body) = send(&app, "GET", "/me", Some(&tokens.access_token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(parse::<UserResponse>(&body).name, "Ada Lovelace");
    }

    #[tokio::test]
    async fn test_task_lifecycle_with_generated_subtasks() {
        let app = app().await;
        let tokens = register_and_login(&app, "grace@example.com").await;
        let token = Some(tokens.access_token.as_str());

        let (status, body) = send(
            &app,
            "POST",
            "/tasks",
            token,
            Some(json!({"title": "Team sync", "date": "2024-05-06", "category": "Meeting"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let created: Value = parse(&body);
        let task_id = created["id"].as_str().unwrap().to_string();
        assert_eq!(created["progress"], 0);
        assert_eq!(created["subtasks"], json!([]));

        let (status, body) = send(
            &app,
            "POST",
            &format!("/tasks/{}/generate-subtasks", task_id),
            token,
            Some(json!({"num_subtasks": 3})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let generated: Vec<Subtask> = parse(&body);
        assert_eq!(generated.len(), 5);
        assert_eq!(generated[0].title, "Prepare agenda");

        let (status, _) = send(
            &app,
            "POST",
            &format!("/tasks/{}/generate-subtasks", task_id),
            token,
            Some(json!({"num_subtasks": 0})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        for subtask in &generated[..4] {
            let (status, _) = send(
                &app,
                "PUT",
                &format!("/subtasks/{}", subtask.id),
                token,
                Some(json!({"completed": true})),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, body) = send(&app, "GET", &format!("/tasks/{}", task_id), token, None).await;
        assert_eq!(status, StatusCode::OK);
        let detail: Value = parse(&body);
        assert_eq!(detail["progress"], 80);
        assert_eq!(detail["completed"], false);

        let (status, body) = send(
            &app,
            "DELETE",
            &format!("/subtasks/{}", generated[4].id),
            token,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(parse::<Value>(&body)["message"], "Subtask deleted successfully");

        let (status, body) = send(&app, "GET", "/tasks?completed=true", token, None).await;
        assert_eq!(status, StatusCode::OK);
        let done: Vec<Value> = parse(&body);
        assert_eq!(done.len(), 1);
        assert_eq!(done[0]["progress"], 100);

        let (status, _) = send(
            &app,
            "PUT",
            &format!("/tasks/{}", task_id),
            token,
            Some(json!({"user_id": "someone"})),
        )
        .await;
        assert!(status.is_client_error());

        let (status, body) = send(&app, "DELETE", &format!("/tasks/{}", task_id), token, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(parse::<Value>(&body)["message"], "Task deleted successfully");

        let (status, _) = send(&app, "GET", &format!("/tasks/{}", task_id), token, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_tasks_are_private() {
        let app = app().await;
        let owner = register_and_login(&app, "owner@example.com").await;
        let other = register_and_login(&app, "other@example.com").await;

        let (_, body) = send(
            &app,
            "POST",
            "/tasks",
            Some(&owner.access_token),
            Some(json!({"title": "Private", "date": "2024-05-07"})),
        )
        .await;
        let task_id = parse::<Value>(&body)["id"].as_str().unwrap().to_string();

        let (status, _) = send(
            &app,
            "GET",
            &format!("/tasks/{}", task_id),
            Some(&other.access_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&app, "GET", "/tasks", Some(&other.access_token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(parse::<Vec<Value>>(&body).is_empty());
    }
}
