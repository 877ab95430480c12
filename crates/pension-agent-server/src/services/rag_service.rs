use crate::config::RagConfig;
use crate::models::Passage;
use crate::services::providers::{EmbeddingProvider, VectorStore};
use crate::utils::error::ApiError;
use std::sync::Arc;
use tracing::{debug, info};

/// Formatted retrieval result handed to the responder
#[derive(Debug, Clone, Default)]
pub struct RetrievedContext {
    pub context: String,
    pub sources: String,
    pub passages: Vec<Passage>,
}

impl RetrievedContext {
    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }
}

#[derive(Clone)]
pub struct RagService {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    config: RagConfig,
}

impl RagService {
    pub fn new(
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
        config: RagConfig,
    ) -> Self {
        Self {
            embedding_provider,
            vector_store,
            config,
        }
    }

    /// Retrieve the top-K passages for a query and format them
    pub async fn retrieve(&self, query: &str) -> Result<RetrievedContext, ApiError> {
        info!("Retrieving context for query ({} chars)", query.len());

        let query_embedding = self
            .embedding_provider
            .embed(query)
            .await
            .map_err(|e| ApiError::EmbeddingError(format!("{:#}", e)))?;

        let passages = self
            .vector_store
            .query(query_embedding, self.config.retrieval_top_k)
            .await
            .map_err(|e| ApiError::VectorStoreError(format!("{:#}", e)))?;

        debug!("Retrieved {} passages", passages.len());

        Ok(RetrievedContext {
            context: Self::build_context(&passages),
            sources: Self::build_sources(&passages),
            passages,
        })
    }

    /// Numbered context block, one entry per passage
    pub fn build_context(passages: &[Passage]) -> String {
        passages
            .iter()
            .enumerate()
            .map(|(i, passage)| {
                format!(
                    "[link_{}]\nTítulo: {}\nFecha de publicación: {}\nFuente: {}\nContenido:\n{}",
                    i + 1,
                    passage.title(),
                    passage.published(),
                    passage.source_domain(),
                    passage.content
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// HTML links matching the `[link_N]` markers of the context
    pub fn build_sources(passages: &[Passage]) -> String {
        passages
            .iter()
            .enumerate()
            .map(|(i, passage)| {
                format!(
                    "<a href=\"{}\" target=\"_blank\">link_{}</a>",
                    passage.url(),
                    i + 1
                )
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}
