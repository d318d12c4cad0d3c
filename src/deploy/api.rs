use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};

use super::models::{TaskRequest, TaskResponse};
use super::pipeline::PublishPipeline;
use crate::errors::PipelineError;

const APP_NAME: &str = env!("CARGO_PKG_NAME");

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub pipeline: PublishPipeline,
}

pub type SharedState = Arc<AppState>;

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    Forbidden(String),
    BadRequest(String),
    BadGateway(String),
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        let message = err.to_string();
        match err {
            PipelineError::Unauthorized => ApiError::Forbidden(message),
            PipelineError::InvalidInput(_) => ApiError::BadRequest(message),
            PipelineError::RemoteFatal { .. } | PipelineError::NotificationExhausted { .. } => {
                ApiError::BadGateway(message)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
        };
        (status, Json(json!({"error": message}))).into_response()
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/api-task", post(api_task))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn root() -> Json<Value> {
    Json(json!({"status": "ok", "app": APP_NAME}))
}

async fn health_check() -> &'static str {
    "ok"
}

async fn api_task(
    State(state): State<SharedState>,
    payload: Result<Json<TaskRequest>, JsonRejection>,
) -> Result<Json<TaskResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let response = state.pipeline.run(&request).await?;
    Ok(Json(response))
}
