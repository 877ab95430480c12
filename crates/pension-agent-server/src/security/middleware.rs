use crate::security::CorsPolicy;
use crate::utils::error::ApiError;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Host and Origin guard for the chat route. A no-op when every origin is allowed.
pub async fn security_middleware(
    State(policy): State<Arc<CorsPolicy>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if policy.allows_any() {
        return Ok(next.run(request).await);
    }

    let headers = request.headers();

    // 1. Host header
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !policy.is_host_allowed(host) {
        warn!("Rejected request for host '{}'", host);
        return Err(ApiError::CorsDenied("Host no permitido".to_string()));
    }

    // 2. Origin header
    let origin = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok());

    match origin {
        None | Some("") => {
            warn!("Rejected request without Origin");
            return Err(ApiError::CorsDenied(
                "Origen no especificado o no permitido".to_string(),
            ));
        }
        Some(origin) if !policy.is_origin_allowed(origin) => {
            warn!("Rejected request from origin '{}'", origin);
            return Err(ApiError::CorsDenied("Origen no permitido".to_string()));
        }
        Some(origin) => debug!("Origin {} allowed", origin),
    }

    Ok(next.run(request).await)
}
