// rest_api/src/lib.rs
use std::sync::Arc;

use anyhow::{Context, Error as AnyhowError};
use axum::{
    extract::{rejection::JsonRejection, FromRef},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::{error, info, warn};
use serde_json::json;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::cors::{AllowOrigin, CorsLayer};

use lib::config::{AppConfig, ServerConfig};
use lib::errors::StrokeError;
use lib::ServiceContext;
use security::{AuthError, AuthService};

mod handlers;

// Define the REST API error enum
#[derive(Debug, Error)]
pub enum RestApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Service(#[from] StrokeError),
    #[error("{0}")]
    InvalidInput(String),
    #[error("Patient not found")]
    PatientNotFound,
}

impl From<JsonRejection> for RestApiError {
    fn from(rejection: JsonRejection) -> Self {
        RestApiError::InvalidInput(rejection.body_text())
    }
}

fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    let message = message.into();
    (status, Json(json!({ "status": "error", "error": message }))).into_response()
}

// Implement IntoResponse for RestApiError to convert it into an HTTP response
impl IntoResponse for RestApiError {
    fn into_response(self) -> Response {
        match self {
            RestApiError::Auth(e) => e.into_response(),
            RestApiError::InvalidInput(msg) => error_body(StatusCode::BAD_REQUEST, msg),
            RestApiError::PatientNotFound => error_body(StatusCode::NOT_FOUND, "Patient not found"),
            RestApiError::Service(StrokeError::Validation(e)) => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "status": "error",
                    "error": "Validation failed",
                    "details": e.field_errors(),
                })),
            )
                .into_response(),
            RestApiError::Service(e @ StrokeError::NotFound(_)) => {
                let message = e.not_found_message().unwrap_or_else(|| "Not found".to_string());
                error_body(StatusCode::NOT_FOUND, message)
            }
            RestApiError::Service(StrokeError::AlreadyExists(msg)) => {
                error_body(StatusCode::CONFLICT, format!("Already exists: {}", msg))
            }
            RestApiError::Service(StrokeError::Risk(e)) => {
                error!("Risk scoring failed: {}", e);
                error_body(StatusCode::INTERNAL_SERVER_ERROR, format!("Risk scoring failed: {}", e))
            }
            RestApiError::Service(e) => {
                error!("Request failed: {}", e);
                error_body(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

// Shared state for the Axum application
#[derive(Clone)]
pub struct AppState {
    pub ctx: ServiceContext,
    pub auth: Arc<AuthService>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(ctx: ServiceContext, auth: AuthService, config: AppConfig) -> Self {
        AppState {
            ctx,
            auth: Arc::new(auth),
            config: Arc::new(config),
        }
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_origin(AllowOrigin::list(origins))
}

/// Every route, nested below the configured prefix.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/login", post(handlers::login))
        .route("/auth/register", post(handlers::register))
        .route("/auth/me", get(handlers::me))
        .route("/auth/logout", post(handlers::logout))
        .route("/patients", get(handlers::list_patients).post(handlers::create_patient))
        .route("/patients/", get(handlers::list_patients).post(handlers::create_patient))
        .route("/patients/create", post(handlers::create_patient))
        .route("/patients/bulk", post(handlers::bulk_create_patients))
        .route("/patients/all", get(handlers::all_patients))
        .route(
            "/patients/:id",
            get(handlers::get_patient)
                .put(handlers::update_patient)
                .delete(handlers::delete_patient),
        )
        .route("/patients/:id/predict", post(handlers::predict_patient))
        .route("/dashboard/stats", get(handlers::dashboard_stats))
        .route("/dashboard/summary", get(handlers::dashboard_summary))
        .route("/dashboard/analytics", get(handlers::dashboard_analytics));

    let cors = cors_layer(&state.config.server);
    let prefix = state.config.server.api_prefix.trim_end_matches('/');
    let app = if prefix.is_empty() {
        api
    } else {
        Router::new().nest(prefix, api)
    };
    app.with_state(state).layer(cors)
}

/// Opens storage, loads the scorer and seeds the default admin.
pub async fn build_state(config: AppConfig) -> Result<AppState, AnyhowError> {
    let ctx = ServiceContext::open(&config).context("Failed to open service context")?;
    let auth = AuthService::from_config(ctx.storage.users.clone(), &config.auth)
        .context("Failed to initialise authentication")?;
    auth.ensure_default_admin(&config.auth)
        .await
        .context("Failed to create default admin")?;
    info!(
        "Using {} storage with the {} scorer",
        ctx.storage.patients.get_type(),
        ctx.patients.risk().scorer_name()
    );
    Ok(AppState::new(ctx, auth, config))
}

/// Serves `app` on `listener` until `shutdown_rx` fires.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown_rx: oneshot::Receiver<()>,
) -> Result<(), AnyhowError> {
    let addr = listener.local_addr()?;
    info!("REST API server listening on {}", addr);

    let shutdown_signal = async {
        if shutdown_rx.await.is_err() {
            warn!("Shutdown sender dropped");
        }
        info!("Received shutdown signal.");
    };

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("REST API server failed to start or run")?;

    info!("REST API server stopped.");
    Ok(())
}

/// Binds the configured address and serves `state` until shutdown, then
/// flushes the patient store.
pub async fn run_server(state: AppState, shutdown_rx: oneshot::Receiver<()>) -> Result<(), AnyhowError> {
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let storage = state.ctx.storage.clone();
    let app = build_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .context(format!("Failed to bind to address: {}", addr))?;
    serve(listener, app, shutdown_rx).await?;

    storage.patients.flush().await.context("Failed to flush patient store")?;
    Ok(())
}

// Main function to start the REST API server
pub async fn start_server(config: AppConfig, shutdown_rx: oneshot::Receiver<()>) -> Result<(), AnyhowError> {
    let state = build_state(config).await?;
    run_server(state, shutdown_rx).await
}
