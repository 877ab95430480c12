use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::store::{HistoryStore, MemoryBackend, MemoryError};
use crate::models::{ChatMessage, SessionId};

#[derive(Debug, Clone)]
struct LocalSession {
    messages: Vec<ChatMessage>,
    /// Refreshed on every append, like the Redis key TTL
    touched_at: Instant,
}

impl LocalSession {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.touched_at.elapsed() > ttl
    }
}

/// Process-local history used when Redis is unreachable.
/// Uses DashMap for lock-free concurrent access; lost on restart.
#[derive(Clone)]
pub struct LocalHistoryStore {
    storage: Arc<DashMap<SessionId, LocalSession>>,
    ttl: Duration,
}

impl LocalHistoryStore {
    pub fn new(ttl: Duration) -> Self {
        info!("Initializing local history store (ttl: {:?})", ttl);
        Self {
            storage: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Number of live sessions (expired ones may still be counted until cleanup)
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Expiry is re-checked under the shard lock, so a session refreshed
    /// by a concurrent append is kept.
    fn remove_if_expired(&self, session_id: &str) -> bool {
        let ttl = self.ttl;
        self.storage
            .remove_if(session_id, |_, session| session.is_expired(ttl))
            .is_some()
    }

    /// Drop expired sessions, returns how many were removed
    pub fn cleanup_expired(&self) -> usize {
        let start_len = self.storage.len();
        let ttl = self.ttl;
        self.storage.retain(|_, session| !session.is_expired(ttl));
        let count = start_len.saturating_sub(self.storage.len());

        if count > 0 {
            info!("Cleaned up {} expired local sessions", count);
        }

        count
    }
}

#[async_trait::async_trait]
impl HistoryStore for LocalHistoryStore {
    fn backend(&self) -> MemoryBackend {
        MemoryBackend::Local
    }

    async fn append(&self, session_id: &str, input: &str, output: &str) -> Result<(), MemoryError> {
        let mut entry = self
            .storage
            .entry(session_id.to_string())
            .or_insert_with(|| LocalSession {
                messages: Vec::new(),
                touched_at: Instant::now(),
            });

        if entry.is_expired(self.ttl) {
            debug!("Local session {} expired, starting fresh", session_id);
            entry.messages.clear();
        }

        entry.messages.push(ChatMessage::user(input));
        entry.messages.push(ChatMessage::assistant(output));
        entry.touched_at = Instant::now();

        debug!(
            "Appended exchange to local session {} ({} messages)",
            session_id,
            entry.messages.len()
        );
        Ok(())
    }

    async fn messages(&self, session_id: &str) -> Result<Vec<ChatMessage>, MemoryError> {
        let Some(entry) = self.storage.get(session_id) else {
            return Ok(Vec::new());
        };

        // Lazy expiry
        if entry.is_expired(self.ttl) {
            drop(entry);
            if self.remove_if_expired(session_id) {
                debug!("Local session {} expired, removed", session_id);
                return Ok(Vec::new());
            }
            return Ok(self
                .storage
                .get(session_id)
                .map(|session| session.messages.clone())
                .unwrap_or_default());
        }

        Ok(entry.messages.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_is_ordered() {
        let store = LocalHistoryStore::new(Duration::from_secs(3600));

        store.append("s1", "hola", "¡Hola!").await.unwrap();
        store.append("s1", "¿qué es la PGU?", "La PGU es...").await.unwrap();

        let messages = store.messages("s1").await.unwrap();
        assert_eq!(
            messages,
            vec![
                ChatMessage::user("hola"),
                ChatMessage::assistant("¡Hola!"),
                ChatMessage::user("¿qué es la PGU?"),
                ChatMessage::assistant("La PGU es..."),
            ]
        );
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = LocalHistoryStore::new(Duration::from_secs(3600));
        store.append("a", "1", "uno").await.unwrap();

        assert!(store.messages("b").await.unwrap().is_empty());
        assert_eq!(store.messages("a").await.unwrap().len(), 2);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_sessions_disappear() {
        let store = LocalHistoryStore::new(Duration::from_millis(20));
        store.append("s1", "hola", "¡Hola!").await.unwrap();
        store.append("s2", "hola", "¡Hola!").await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(store.messages("s1").await.unwrap().is_empty());
        assert_eq!(store.cleanup_expired(), 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_append_after_expiry_starts_fresh() {
        let store = LocalHistoryStore::new(Duration::from_millis(20));
        store.append("s1", "viejo", "old").await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        store.append("s1", "nuevo", "new").await.unwrap();

        let messages = store.messages("s1").await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "nuevo");
    }

    #[tokio::test]
    async fn test_expired_read_keeps_refreshed_session() {
        let store = LocalHistoryStore::new(Duration::from_millis(100));
        store.append("s1", "viejo", "old").await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;

        // A concurrent append refreshes the session between the expired
        // read and the removal.
        store.append("s1", "nuevo", "new").await.unwrap();
        assert!(!store.remove_if_expired("s1"));

        let messages = store.messages("s1").await.unwrap();
        assert_eq!(messages, vec![ChatMessage::user("nuevo"), ChatMessage::assistant("new")]);
    }
}
