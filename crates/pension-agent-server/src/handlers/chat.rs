use crate::models::{ChatRequest, ChatResponse};
use crate::services::AgentState;
use crate::state::AppState;
use crate::utils::error::{ApiError, SERVICE_ERROR_MESSAGE};
use axum::{extract::State, Json};
use std::time::Instant;
use tracing::{info, warn};

/// POST /chat: run one agent turn for the session
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let start_time = Instant::now();

    // Whitespace only counts for validation; the id is used as sent
    let session_id = request.session_id.as_str();
    if session_id.trim().is_empty() {
        return Err(ApiError::BadRequest("session_id is required".to_string()));
    }
    if request.user_message.trim().is_empty() {
        return Err(ApiError::BadRequest("user_message is required".to_string()));
    }

    let agent_name = match request.agent_name.trim() {
        "" => state.default_agent_name().to_string(),
        name => name.to_string(),
    };

    info!(
        "Chat request: session={}, type={}, agent={}, message_len={}",
        session_id,
        request.message_type,
        agent_name,
        request.user_message.len()
    );

    let memory = state.memory.open(session_id).await?;
    let graph = state.agent_graph(memory);

    let result = graph
        .run(AgentState::new(request.user_message, agent_name))
        .await?;

    let Some(reply) = result.reply() else {
        warn!("Agent finished without a reply for session {}", session_id);
        return Err(ApiError::InternalError(SERVICE_ERROR_MESSAGE.to_string()));
    };

    info!(
        "Chat completed for session {} in {:?}",
        session_id,
        start_time.elapsed()
    );

    Ok(Json(ChatResponse {
        response: reply.to_string(),
    }))
}
