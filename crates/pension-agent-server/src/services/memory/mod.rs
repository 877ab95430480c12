//! Session memory
//!
//! Chat history per session, kept in Redis when it is reachable and in a
//! process-local store otherwise:
//! - `MemoryProvider::open` decides the backend for each request
//! - `SessionMemory` is the handle the agent graph writes to
//! - History is append-only; entries only disappear when the session expires

mod local_store;
mod redis_store;
mod store;

pub use local_store::LocalHistoryStore;
pub use redis_store::RedisHistoryStore;
pub use store::{HistoryStore, MemoryBackend, MemoryError};

use anyhow::{Context, Result};
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::MemoryConfig;
use crate::models::{ChatMessage, SessionId};

/// History handle bound to one session
#[derive(Clone)]
pub struct SessionMemory {
    session_id: SessionId,
    store: Arc<dyn HistoryStore>,
}

impl SessionMemory {
    pub fn new(session_id: impl Into<SessionId>, store: Arc<dyn HistoryStore>) -> Self {
        Self {
            session_id: session_id.into(),
            store,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn backend(&self) -> MemoryBackend {
        self.store.backend()
    }

    pub async fn save_exchange(&self, input: &str, output: &str) -> Result<(), MemoryError> {
        self.store.append(&self.session_id, input, output).await
    }

    pub async fn history(&self) -> Result<Vec<ChatMessage>, MemoryError> {
        self.store.messages(&self.session_id).await
    }
}

/// Failed connects are not retried for this long; sessions go straight to
/// local memory in the meantime.
const UNREACHABLE_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Default)]
struct RedisSlot {
    connection: Option<ConnectionManager>,
    failed_at: Option<Instant>,
}

struct RedisTarget {
    client: redis::Client,
    slot: Mutex<RedisSlot>,
}

impl RedisTarget {
    async fn record_failure(&self) {
        self.slot.lock().await.failed_at = Some(Instant::now());
    }
}

/// Opens session memories, falling back to local storage when Redis is down
pub struct MemoryProvider {
    redis: Option<RedisTarget>,
    local: LocalHistoryStore,
    key_prefix: String,
    ttl: Duration,
    connect_timeout: Duration,
}

impl MemoryProvider {
    pub fn new(config: &MemoryConfig) -> Result<Self> {
        let ttl = Duration::from_secs(config.ttl_seconds);

        let redis = if config.redis_url.trim().is_empty() {
            warn!("No Redis URL configured, session history stays in process memory");
            None
        } else {
            let client = redis::Client::open(config.redis_url.as_str())
                .context("Invalid memory.redis_url")?;
            Some(RedisTarget {
                client,
                slot: Mutex::new(RedisSlot::default()),
            })
        };

        Ok(Self {
            redis,
            local: LocalHistoryStore::new(ttl),
            key_prefix: config.key_prefix.clone(),
            ttl,
            connect_timeout: Duration::from_millis(config.connect_timeout_ms.max(1)),
        })
    }

    pub fn local_store(&self) -> &LocalHistoryStore {
        &self.local
    }

    /// Memory for one session. Only an unreachable Redis falls back to local.
    pub async fn open(&self, session_id: &str) -> Result<SessionMemory, MemoryError> {
        match self.connect_redis().await {
            Ok(Some(store)) => {
                debug!("Session {} using Redis history", session_id);
                Ok(SessionMemory::new(session_id, Arc::new(store)))
            }
            Ok(None) => Ok(self.open_local(session_id)),
            Err(MemoryError::Unreachable(reason)) => {
                warn!(
                    "Redis unreachable ({}), using local memory for session {}",
                    reason, session_id
                );
                Ok(self.open_local(session_id))
            }
            Err(e) => Err(e),
        }
    }

    /// Backend a new session would get right now
    pub async fn probe(&self) -> Result<MemoryBackend, MemoryError> {
        match self.connect_redis().await {
            Ok(Some(_)) => Ok(MemoryBackend::Redis),
            Ok(None) | Err(MemoryError::Unreachable(_)) => Ok(MemoryBackend::Local),
            Err(e) => Err(e),
        }
    }

    fn open_local(&self, session_id: &str) -> SessionMemory {
        SessionMemory::new(session_id, Arc::new(self.local.clone()))
    }

    async fn connect_redis(&self) -> Result<Option<RedisHistoryStore>, MemoryError> {
        let Some(target) = &self.redis else {
            return Ok(None);
        };

        // The lock is never held across network I/O
        let cached = {
            let slot = target.slot.lock().await;
            if let Some(failed_at) = slot.failed_at {
                if failed_at.elapsed() < UNREACHABLE_BACKOFF {
                    return Err(MemoryError::Unreachable(
                        "recent connection failure".to_string(),
                    ));
                }
            }
            slot.connection.clone()
        };

        let mut conn = match cached {
            Some(conn) => conn,
            None => {
                let conn = match self.connect(&target.client).await {
                    Ok(conn) => conn,
                    Err(e) => {
                        if matches!(e, MemoryError::Unreachable(_)) {
                            target.record_failure().await;
                        }
                        return Err(e);
                    }
                };
                info!("Redis connection established");
                target.slot.lock().await.connection = Some(conn.clone());
                conn
            }
        };

        let ping = tokio::time::timeout(
            self.connect_timeout,
            redis::cmd("PING").query_async::<String>(&mut conn),
        )
        .await
        .map_err(|_| MemoryError::Unreachable("ping timed out".to_string()))
        .and_then(|reply| reply.map_err(MemoryError::from));

        match ping {
            Ok(_) => {
                target.slot.lock().await.failed_at = None;
                Ok(Some(RedisHistoryStore::new(
                    conn,
                    self.key_prefix.clone(),
                    self.ttl,
                )))
            }
            Err(e) => {
                if matches!(e, MemoryError::Unreachable(_)) {
                    target.record_failure().await;
                }
                Err(e)
            }
        }
    }

    /// Single connection attempt; the manager reconnects on its own later.
    async fn connect(&self, client: &redis::Client) -> Result<ConnectionManager, MemoryError> {
        let config = ConnectionManagerConfig::new().set_number_of_retries(0);
        let conn = tokio::time::timeout(
            self.connect_timeout,
            ConnectionManager::new_with_config(client.clone(), config),
        )
        .await
        .map_err(|_| MemoryError::Unreachable("connect timed out".to_string()))??;
        Ok(conn)
    }
}
