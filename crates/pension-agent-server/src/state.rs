use anyhow::Result;
use axum::extract::FromRef;
use std::sync::Arc;
use tracing::info;

use crate::config::Settings;
use crate::security::CorsPolicy;
use crate::services::{
    AgentGraph, Clock, EmbeddingService, LlmProvider, LlmService, MemoryProvider, PineconeStore,
    RagService, SessionMemory, ZonedClock,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub rag_service: Arc<RagService>,
    pub llm: Arc<dyn LlmProvider>,
    pub memory: Arc<MemoryProvider>,
    pub clock: Arc<dyn Clock>,
    pub cors: Arc<CorsPolicy>,
}

impl AppState {
    /// Wire the production services from configuration
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let embedding_service = Arc::new(EmbeddingService::new(settings.embedding.clone())?);
        let vector_store = Arc::new(PineconeStore::new(settings.vector_store.clone())?);
        let rag_service = Arc::new(RagService::new(
            embedding_service,
            vector_store,
            settings.rag.clone(),
        ));
        info!("✅ Retrieval services initialized");

        let llm_service = LlmService::new(settings.llm.clone())?;
        info!("✅ LLM service initialized (model: {})", llm_service.model());

        let memory = Arc::new(MemoryProvider::new(&settings.memory)?);
        let clock = Arc::new(ZonedClock::new(&settings.agent.timezone)?);
        let cors = Arc::new(CorsPolicy::from_config(&settings.cors.origins)?);

        Ok(Self {
            settings: Arc::new(settings),
            rag_service,
            llm: Arc::new(llm_service),
            memory,
            clock,
            cors,
        })
    }

    /// A fresh agent graph bound to one session
    pub fn agent_graph(&self, memory: SessionMemory) -> AgentGraph {
        AgentGraph::new(
            self.rag_service.clone(),
            self.llm.clone(),
            self.clock.clone(),
            memory,
        )
    }

    pub fn default_agent_name(&self) -> &str {
        &self.settings.agent.default_name
    }
}

impl FromRef<AppState> for Arc<CorsPolicy> {
    fn from_ref(state: &AppState) -> Self {
        state.cors.clone()
    }
}

impl FromRef<AppState> for Arc<MemoryProvider> {
    fn from_ref(state: &AppState) -> Self {
        state.memory.clone()
    }
}
