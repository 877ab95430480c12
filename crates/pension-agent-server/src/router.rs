use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::handlers;
use crate::security::security_middleware;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    // Public routes (no origin/host checks)
    let public_routes = Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness_check))
        .route("/version", get(handlers::health::version));

    // Protected routes
    let protected_routes = Router::new()
        .route("/chat", post(handlers::chat::chat_handler))
        .layer(middleware::from_fn_with_state(
            state.cors.clone(),
            security_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(state.cors.layer())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .layer(CatchPanicLayer::new())
        .with_state(state)
}
