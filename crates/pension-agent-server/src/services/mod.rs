pub mod agent;
pub mod clock;
pub mod embedding_service;
pub mod llm_service;
pub mod memory;
pub mod prompts;
pub mod providers;
pub mod query_analyzer;
pub mod rag_service;
pub mod vector_store;

pub use agent::{AgentGraph, AgentState};
pub use clock::{Clock, TimeInfo, ZonedClock};
pub use embedding_service::EmbeddingService;
pub use llm_service::LlmService;
pub use memory::{MemoryBackend, MemoryProvider, SessionMemory};
pub use providers::{EmbeddingProvider, LlmProvider, VectorStore};
pub use query_analyzer::{NextStep, QueryAnalyzer};
pub use rag_service::{RagService, RetrievedContext};
pub use vector_store::PineconeStore;
