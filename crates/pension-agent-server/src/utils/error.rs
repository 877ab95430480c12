use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::services::memory::MemoryError;

/// Message shown to callers when an upstream service fails.
pub const SERVICE_ERROR_MESSAGE: &str = "No se pudo generar una respuesta válida";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("CORS denied: {0}")]
    CorsDenied(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    #[error("Vector store error: {0}")]
    VectorStoreError(String),

    #[error("Memory error: {0}")]
    MemoryError(#[from] MemoryError),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

#[derive(Serialize)]
struct CorsErrorResponse {
    error: &'static str,
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::BadRequest(msg) => {
                tracing::warn!("Bad request: {}", msg);
                (StatusCode::BAD_REQUEST, "BadRequest", msg)
            }
            ApiError::CorsDenied(detail) => {
                tracing::warn!("CORS denied: {}", detail);
                let body = Json(CorsErrorResponse {
                    error: "Acceso CORS denegado",
                    detail,
                });
                return (StatusCode::FORBIDDEN, body).into_response();
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "InternalError", msg)
            }
            ApiError::LlmError(msg) => {
                tracing::error!("LLM error: {}", msg);
                service_error()
            }
            ApiError::EmbeddingError(msg) => {
                tracing::error!("Embedding error: {}", msg);
                service_error()
            }
            ApiError::VectorStoreError(msg) => {
                tracing::error!("Vector store error: {}", msg);
                service_error()
            }
            ApiError::MemoryError(err) => {
                tracing::error!("Memory error: {}", err);
                service_error()
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

fn service_error() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "ServiceError",
        SERVICE_ERROR_MESSAGE.to_string(),
    )
}
