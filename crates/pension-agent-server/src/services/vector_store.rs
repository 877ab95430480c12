use crate::config::VectorStoreConfig;
use crate::models::Passage;
use crate::services::providers::VectorStore;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: Vec<f32>,
    top_k: usize,
    include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Map<String, Value>,
}

/// Pinecone index accessed through its data-plane REST API
#[derive(Clone)]
pub struct PineconeStore {
    client: Client,
    config: VectorStoreConfig,
}

impl PineconeStore {
    pub fn new(config: VectorStoreConfig) -> Result<Self> {
        if config.index_host.trim().is_empty() {
            anyhow::bail!("vector_store.index_host must be configured");
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create vector store HTTP client")?;

        Ok(Self { client, config })
    }

    fn query_url(&self) -> String {
        let host = self.config.index_host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            format!("{}/query", host)
        } else {
            format!("https://{}/query", host)
        }
    }

    fn to_passage(&self, m: QueryMatch) -> Passage {
        Passage {
            content: metadata_str(&m.metadata, &self.config.text_key).unwrap_or_default(),
            title: metadata_str(&m.metadata, "title"),
            published: metadata_str(&m.metadata, "estimated_published_time"),
            source_domain: metadata_str(&m.metadata, "source_domain"),
            url: metadata_str(&m.metadata, "url_source"),
            id: m.id,
            score: m.score,
        }
    }
}

fn metadata_str(metadata: &Map<String, Value>, key: &str) -> Option<String> {
    match metadata.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[async_trait::async_trait]
impl VectorStore for PineconeStore {
    async fn query(&self, vector: Vec<f32>, top_k: usize) -> Result<Vec<Passage>> {
        let request = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            namespace: self.config.namespace.as_deref(),
        };

        let response = self
            .client
            .post(self.query_url())
            .header("Api-Key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to connect to vector index")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Vector index error ({}): {}", status, body);
        }

        let result: QueryResponse = response
            .json()
            .await
            .context("Failed to parse vector index response")?;

        debug!("Vector index returned {} matches", result.matches.len());

        Ok(result
            .matches
            .into_iter()
            .map(|m| self.to_passage(m))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(index_host: String) -> VectorStoreConfig {
        VectorStoreConfig {
            index_host,
            api_key: "pc-key".into(),
            namespace: None,
            text_key: "text".into(),
            timeout_seconds: 5,
        }
    }

    #[test]
    fn test_query_url_adds_scheme() {
        let store = PineconeStore::new(config("pensiones-abc.svc.pinecone.io".into())).unwrap();
        assert_eq!(store.query_url(), "https://pensiones-abc.svc.pinecone.io/query");

        let store = PineconeStore::new(config("http://localhost:5080/".into())).unwrap();
        assert_eq!(store.query_url(), "http://localhost:5080/query");
    }

    #[test]
    fn test_missing_host_is_rejected() {
        assert!(PineconeStore::new(config("  ".into())).is_err());
    }

    #[tokio::test]
    async fn test_query_maps_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/query"))
            .and(header("Api-Key", "pc-key"))
            .and(body_json(json!({
                "vector": [0.5, 0.25],
                "topK": 4,
                "includeMetadata": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "matches": [
                    {
                        "id": "doc-1",
                        "score": 0.91,
                        "metadata": {
                            "title": "Reforma de pensiones",
                            "estimated_published_time": "2025-01-29",
                            "source_domain": "spensiones.cl",
                            "url_source": "https://www.spensiones.cl/reforma",
                            "text": "La reforma crea el Seguro Social."
                        }
                    },
                    { "id": "doc-2", "score": 0.5, "metadata": { "text": "Sin metadatos." } }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = PineconeStore::new(config(server.uri())).unwrap();
        let passages = store.query(vec![0.5, 0.25], 4).await.unwrap();

        assert_eq!(passages.len(), 2);
        assert_eq!(passages[0].title(), "Reforma de pensiones");
        assert_eq!(passages[0].url(), "https://www.spensiones.cl/reforma");
        assert_eq!(passages[0].content, "La reforma crea el Seguro Social.");
        assert_eq!(passages[1].title(), "Sin título");
        assert_eq!(passages[1].published(), "Fecha no especificada");
        assert_eq!(passages[1].url(), "#");
    }

    #[tokio::test]
    async fn test_query_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/query"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let store = PineconeStore::new(config(server.uri())).unwrap();
        assert!(store.query(vec![0.1], 4).await.is_err());
    }
}
