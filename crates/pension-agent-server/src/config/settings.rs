use anyhow::Result;
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub vector_store: VectorStoreConfig,
    pub rag: RagConfig,
    pub memory: MemoryConfig,
    pub agent: AgentConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    /// JSON array (`["https://a.cl"]`) or comma separated list.
    pub origins: String,
}

#[derive(Deserialize, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub timeout_seconds: u64,
}

#[derive(Deserialize, Clone)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub dimension: Option<usize>,
    pub timeout_seconds: u64,
}

#[derive(Deserialize, Clone)]
pub struct VectorStoreConfig {
    /// Pinecone index host, e.g. `https://pensiones-abc123.svc.us-east-1.pinecone.io`
    pub index_host: String,
    pub api_key: String,
    pub namespace: Option<String>,
    /// Metadata key holding the passage body.
    pub text_key: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RagConfig {
    pub retrieval_top_k: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MemoryConfig {
    /// Empty string disables Redis and keeps history in process.
    pub redis_url: String,
    pub key_prefix: String,
    pub ttl_seconds: u64,
    pub connect_timeout_ms: u64,
    pub cleanup_interval_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    pub default_name: String,
    pub timezone: String,
}

// API keys stay out of Debug output.
macro_rules! redacted_debug {
    ($ty:ty, $($field:ident),+) => {
        impl std::fmt::Debug for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($ty))
                    $(.field(stringify!($field), &self.$field))+
                    .field("api_key", &"<redacted>")
                    .finish()
            }
        }
    };
}

redacted_debug!(LlmConfig, base_url, model, temperature, max_tokens, timeout_seconds);
redacted_debug!(EmbeddingConfig, base_url, model, dimension, timeout_seconds);
redacted_debug!(VectorStoreConfig, index_host, namespace, text_key, timeout_seconds);

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::builder()?
            .add_source(File::with_name("config/settings").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        Ok(settings)
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        let builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8001)?
            .set_default("cors.origins", "")?
            .set_default("llm.base_url", "https://api.openai.com/v1")?
            .set_default("llm.api_key", "")?
            .set_default("llm.model", "gpt-4o-mini")?
            .set_default("llm.temperature", 0.2)?
            .set_default("llm.timeout_seconds", 60)?
            .set_default("embedding.base_url", "https://api.openai.com/v1")?
            .set_default("embedding.api_key", "")?
            .set_default("embedding.model", "text-embedding-3-small")?
            .set_default("embedding.timeout_seconds", 30)?
            .set_default("vector_store.index_host", "")?
            .set_default("vector_store.api_key", "")?
            .set_default("vector_store.text_key", "text")?
            .set_default("vector_store.timeout_seconds", 30)?
            .set_default("rag.retrieval_top_k", 4)?
            .set_default("memory.redis_url", "redis://localhost:6379/0")?
            .set_default("memory.key_prefix", "chat:")?
            .set_default("memory.ttl_seconds", 3600)?
            .set_default("memory.connect_timeout_ms", 2000)?
            .set_default("memory.cleanup_interval_seconds", 300)?
            .set_default("agent.default_name", "Alexandra")?
            .set_default("agent.timezone", "America/Santiago")?;
        Ok(builder)
    }
}

#[cfg(test)]
impl Settings {
    /// Built-in defaults only, no file or environment
    pub(crate) fn defaults() -> Self {
        Self::builder()
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }
}
