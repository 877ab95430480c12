use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::services::MemoryProvider;
use crate::utils::error::ApiError;

#[derive(Serialize)]
pub struct WelcomeResponse {
    message: &'static str,
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    status: &'static str,
    memory_backend: String,
}

#[derive(Serialize)]
pub struct VersionResponse {
    version: &'static str,
    name: &'static str,
    description: &'static str,
}

pub async fn root() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "Bienvenido al API del Asistente de Previsión Social",
    })
}

pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Ready as long as some history backend is usable; reports which one
pub async fn readiness_check(
    State(memory): State<Arc<MemoryProvider>>,
) -> Result<Json<ReadinessResponse>, ApiError> {
    let backend = memory.probe().await?;
    Ok(Json(ReadinessResponse {
        status: "ready",
        memory_backend: backend.to_string(),
    }))
}

pub async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        name: "Agente de Pensiones",
        description: env!("CARGO_PKG_DESCRIPTION"),
    })
}
