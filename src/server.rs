use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use tokio::sync::Semaphore;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::error::FormatError;
use crate::format::FormatService;
use crate::models::{ErrorBody, FormatRequest, HealthResponse, NormalizedResult};

#[derive(Clone)]
pub struct AppState {
    format: FormatService,
}

impl AppState {
    pub fn new(format: FormatService) -> Self {
        Self { format }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/format", post(format_handler))
        .route("/api/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(config: AppConfig) -> Result<()> {
    if config.endpoint().is_err() {
        tracing::warn!("OPENAI_API_KEY / OPENAI_BASE_URL not configured; format requests will fail");
    }

    let generation_limit = Arc::new(Semaphore::new(config.max_concurrent));
    let state = AppState::new(FormatService::new(config.clone(), generation_limit)?);
    let app = build_router(state);

    let addr: SocketAddr = config.bind_addr.parse()?;
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn format_handler(
    State(state): State<AppState>,
    payload: Result<Json<FormatRequest>, JsonRejection>,
) -> Result<Json<NormalizedResult>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!("rejected format body: {}", rejection);
        FormatError::InvalidInput("malformed request body")
    })?;

    let result = state.format.format(&request.text).await?;
    Ok(Json(result))
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let config = state.format.config();
    Json(HealthResponse {
        status: "ok".to_string(),
        model: config.model.model.clone(),
        endpoint_configured: config.endpoint().is_ok(),
    })
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<FormatError> for ApiError {
    fn from(value: FormatError) -> Self {
        tracing::debug!("format request failed: {}", value);
        Self {
            status: value.status_code(),
            message: value.user_message().to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = ErrorBody {
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}
