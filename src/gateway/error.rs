use axum::{
    Json,
    extract::multipart::MultipartError,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::constants::SUPPORT_STATUS_HEADER;
use crate::generation::GenerationError;
use crate::rag::RagError;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("test runner failed: {0}")]
    RunnerFailed(String),

    #[error("no result: {0}")]
    NoResult(String),

    #[error("provider error: {0}")]
    ProviderError(String),

    #[error("RAG engine is not configured")]
    RagUnavailable,

    #[error("internal error: {0}")]
    InternalError(String),
}

#[derive(serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl GatewayError {
    fn status(&self) -> (StatusCode, &'static str) {
        match self {
            GatewayError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            GatewayError::PayloadTooLarge(_) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large")
            }
            GatewayError::RunnerFailed(_) => (StatusCode::BAD_GATEWAY, "runner_error"),
            GatewayError::NoResult(_) => (StatusCode::BAD_GATEWAY, "no_result"),
            GatewayError::ProviderError(_) => (StatusCode::BAD_GATEWAY, "provider_error"),
            GatewayError::RagUnavailable => (StatusCode::SERVICE_UNAVAILABLE, "rag_unavailable"),
            GatewayError::InternalError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, support_status) = self.status();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "Request rejected");
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            SUPPORT_STATUS_HEADER,
            HeaderValue::from_static(support_status),
        );

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: status.as_u16(),
        });

        (status, headers, body).into_response()
    }
}

impl From<GenerationError> for GatewayError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::EmptyPrompt => GatewayError::InvalidRequest(err.to_string()),
            GenerationError::Runner(_) => GatewayError::RunnerFailed(err.to_string()),
            GenerationError::NoResult { .. } => GatewayError::NoResult(err.to_string()),
            GenerationError::Io(_) => GatewayError::InternalError(err.to_string()),
        }
    }
}

impl From<RagError> for GatewayError {
    fn from(err: RagError) -> Self {
        match err {
            RagError::EmptyQuery => GatewayError::InvalidRequest(err.to_string()),
            RagError::Retrieval(_) | RagError::Generation(_) => {
                GatewayError::ProviderError(err.to_string())
            }
        }
    }
}

impl From<MultipartError> for GatewayError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            GatewayError::PayloadTooLarge(err.body_text())
        } else {
            GatewayError::InvalidRequest(err.body_text())
        }
    }
}
