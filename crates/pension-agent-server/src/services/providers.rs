//! Seams to the external services the agent talks to.

use anyhow::Result;

use crate::models::{ChatMessage, Passage};

/// Trait for embedding service
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Trait for the vector index (top-K similarity query)
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait VectorStore: Send + Sync {
    async fn query(&self, vector: Vec<f32>, top_k: usize) -> Result<Vec<Passage>>;
}

/// Trait for LLM service
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String>;
}
