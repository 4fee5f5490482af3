//! HTTP gateway (Axum) for prompt relay and RAG queries.
//!
//! Routes:
//! - `GET /health`
//! - `POST /generate` (multipart: `prompt`, `files`, optional `metadata`)
//! - `POST /rag_query` (JSON `{"query": ...}`)

pub mod error;
pub mod handler;
pub mod payload;
pub mod state;


use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{HeaderMap, StatusCode, header::HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

pub use error::GatewayError;
pub use handler::{generate_handler, rag_query_handler};
pub use state::HandlerState;

use crate::config::{Config, DEFAULT_MAX_UPLOAD_BYTES};
use crate::constants::{SUPPORT_STATUS_HEADER, SUPPORT_STATUS_OK};

/// Router with any-origin CORS and the default upload limit.
pub fn create_router_with_state(state: HandlerState) -> Router {
    build_router(state, cors_layer(&[]), DEFAULT_MAX_UPLOAD_BYTES)
}

/// Router with CORS origins and upload limit taken from `config`.
pub fn create_router_with_config(state: HandlerState, config: &Config) -> Router {
    build_router(
        state,
        cors_layer(&config.cors_origins),
        config.max_upload_bytes,
    )
}

fn build_router(state: HandlerState, cors: CorsLayer, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/generate", post(generate_handler))
        .route("/rag_query", post(rag_query_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Empty `origins` allows any origin. Origins that are not valid header values are skipped.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(allowed))
}

#[derive(serde::Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[tracing::instrument]
pub async fn health_handler() -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        SUPPORT_STATUS_HEADER,
        HeaderValue::from_static(SUPPORT_STATUS_OK),
    );

    (
        StatusCode::OK,
        headers,
        Json(HealthResponse { status: "ok" }),
    )
        .into_response()
}
