use redis::aio::ConnectionManager;
use std::time::Duration;
use tracing::debug;

use super::store::{HistoryStore, MemoryBackend, MemoryError};
use crate::models::ChatMessage;

/// Session history kept in a Redis list, one JSON message per element
#[derive(Clone)]
pub struct RedisHistoryStore {
    connection: ConnectionManager,
    key_prefix: String,
    ttl: Duration,
}

impl RedisHistoryStore {
    pub fn new(connection: ConnectionManager, key_prefix: String, ttl: Duration) -> Self {
        Self {
            connection,
            key_prefix,
            ttl,
        }
    }

    pub fn key(&self, session_id: &str) -> String {
        history_key(&self.key_prefix, session_id)
    }
}

fn history_key(prefix: &str, session_id: &str) -> String {
    format!("{}{}", prefix, session_id)
}

#[async_trait::async_trait]
impl HistoryStore for RedisHistoryStore {
    fn backend(&self) -> MemoryBackend {
        MemoryBackend::Redis
    }

    async fn append(&self, session_id: &str, input: &str, output: &str) -> Result<(), MemoryError> {
        let key = self.key(session_id);
        let input = serde_json::to_string(&ChatMessage::user(input))?;
        let output = serde_json::to_string(&ChatMessage::assistant(output))?;

        let mut conn = self.connection.clone();
        redis::pipe()
            .atomic()
            .cmd("RPUSH")
            .arg(&key)
            .arg(input)
            .arg(output)
            .ignore()
            .cmd("EXPIRE")
            .arg(&key)
            .arg(self.ttl.as_secs())
            .ignore()
            .query_async::<()>(&mut conn)
            .await?;

        debug!("Appended exchange to {}", key);
        Ok(())
    }

    async fn messages(&self, session_id: &str) -> Result<Vec<ChatMessage>, MemoryError> {
        let key = self.key(session_id);
        let mut conn = self.connection.clone();

        let raw: Vec<String> = redis::cmd("LRANGE")
            .arg(&key)
            .arg(0)
            .arg(-1)
            .query_async(&mut conn)
            .await?;

        raw.iter()
            .map(|item| serde_json::from_str::<ChatMessage>(item).map_err(MemoryError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_key() {
        assert_eq!(history_key("chat:", "abc-123"), "chat:abc-123");
    }

    /// Needs a running Redis: `REDIS_URL=redis://localhost:6379/0 cargo test -- --ignored`
    #[tokio::test]
    #[ignore]
    async fn test_roundtrip_against_live_redis() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379/0".into());
        let client = redis::Client::open(url).unwrap();
        let connection = ConnectionManager::new(client).await.unwrap();
        let store = RedisHistoryStore::new(connection, "test-chat:".into(), Duration::from_secs(60));

        let session = uuid::Uuid::new_v4().to_string();
        store.append(&session, "hola", "¡Hola!").await.unwrap();
        store.append(&session, "¿y la PGU?", "Es una pensión.").await.unwrap();

        let messages = store.messages(&session).await.unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0], ChatMessage::user("hola"));
        assert_eq!(messages[3], ChatMessage::assistant("Es una pensión."));
    }
}
