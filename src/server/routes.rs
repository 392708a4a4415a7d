//! Demonstration routes.
//!
//! Handlers take no input and cannot fail; each logs one line per call.
//! `/trace` additionally opens a named child span under the request span.

use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tracing::info;

pub const ROOT_MESSAGE: &str = "Hello from FastAPI backend!";
pub const API_MESSAGE: &str = "Hello from FastAPI API";
pub const TRACE_MESSAGE: &str = "This route creates a custom trace span!";

/// Name of the span opened explicitly by `GET /trace`.
pub const CUSTOM_SPAN_NAME: &str = "custom-span-trace";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub(crate) fn router() -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health))
        .route("/api/message", get(message))
        .route("/trace", get(custom_trace))
}

async fn root() -> Json<MessageResponse> {
    info!("GET / called");
    Json(MessageResponse {
        message: ROOT_MESSAGE,
    })
}

async fn health() -> Json<HealthResponse> {
    info!("GET /api/health called");
    Json(HealthResponse { status: "ok" })
}

async fn message() -> Json<MessageResponse> {
    info!("GET /api/message called");
    Json(MessageResponse {
        message: API_MESSAGE,
    })
}

async fn custom_trace() -> Json<MessageResponse> {
    let span = tracing::info_span!("custom-span-trace");
    span.in_scope(|| {
        info!(span_name = CUSTOM_SPAN_NAME, "custom span created");
        Json(MessageResponse {
            message: TRACE_MESSAGE,
        })
    })
}
