use crate::config::EmbeddingConfig;
use crate::services::providers::EmbeddingProvider;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Clone)]
pub struct EmbeddingService {
    client: Client,
    config: EmbeddingConfig,
}

impl EmbeddingService {
    pub fn new(config: EmbeddingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create embedding HTTP client")?;

        Ok(Self { client, config })
    }

    async fn embed_internal(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Generating embedding for {} chars", text.len());

        let request = EmbeddingRequest {
            model: &self.config.model,
            input: text,
        };

        let url = format!("{}/embeddings", self.config.base_url.trim_end_matches('/'));
        let mut builder = self.client.post(&url).json(&request);
        if !self.config.api_key.is_empty() {
            builder = builder.bearer_auth(&self.config.api_key);
        }

        let response = builder
            .send()
            .await
            .context("Failed to connect to embedding server")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Embedding API error ({}): {}", status, body);
        }

        let json_value: serde_json::Value = response
            .json()
            .await
            .context("Failed to parse embedding response as JSON")?;

        let embedding = parse_embedding(&json_value)?;

        if embedding.is_empty() {
            anyhow::bail!("Generated embedding is empty");
        }

        if let Some(dimension) = self.config.dimension {
            if embedding.len() != dimension {
                anyhow::bail!(
                    "Embedding dimension mismatch: expected {}, got {}",
                    dimension,
                    embedding.len()
                );
            }
        }

        Ok(embedding)
    }
}

/// Accepts the OpenAI shape `{"data": [{"embedding": [...]}]}` plus the
/// bare `{"embedding": [...]}` and `[...]` shapes some compatible servers return.
fn parse_embedding(json_value: &serde_json::Value) -> Result<Vec<f32>> {
    let floats = |values: &[serde_json::Value]| -> Result<Vec<f32>> {
        values
            .iter()
            .map(|v| {
                v.as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| anyhow::anyhow!("Non-numeric value in embedding: {}", v))
            })
            .collect()
    };

    if let Some(data) = json_value.get("data").and_then(|d| d.as_array()) {
        return data
            .first()
            .and_then(|item| item.get("embedding"))
            .and_then(|e| e.as_array())
            .ok_or_else(|| anyhow::anyhow!("Unrecognized embedding response format: {}", json_value))
            .and_then(|e| floats(e));
    }

    if let Some(embedding) = json_value.get("embedding").and_then(|e| e.as_array()) {
        return floats(embedding);
    }

    if let Some(arr) = json_value.as_array() {
        return floats(arr);
    }

    anyhow::bail!("Unrecognized embedding response format: {}", json_value)
}

#[async_trait::async_trait]
impl EmbeddingProvider for EmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_internal(text).await
    }
}
