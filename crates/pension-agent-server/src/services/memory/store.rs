use std::fmt;

use thiserror::Error;

use crate::models::ChatMessage;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("history store unreachable: {0}")]
    Unreachable(String),

    #[error("history store error: {0}")]
    Backend(String),

    #[error("invalid history entry: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<redis::RedisError> for MemoryError {
    fn from(err: redis::RedisError) -> Self {
        if is_unreachable(&err) {
            MemoryError::Unreachable(err.to_string())
        } else {
            MemoryError::Backend(err.to_string())
        }
    }
}

/// Server replies meaning the instance cannot serve this client yet.
const UNAVAILABLE_CODES: [&str; 4] = ["NOAUTH", "WRONGPASS", "LOADING", "MASTERDOWN"];

/// Failures that switch a session to the local fallback: connection-level
/// errors plus a server that refuses to serve (auth missing, still loading).
fn is_unreachable(err: &redis::RedisError) -> bool {
    err.is_connection_refusal()
        || err.is_connection_dropped()
        || err.is_io_error()
        || err.is_timeout()
        || err.code().is_some_and(|code| UNAVAILABLE_CODES.contains(&code))
}

/// Where a session's history lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryBackend {
    Redis,
    Local,
}

impl fmt::Display for MemoryBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryBackend::Redis => write!(f, "redis"),
            MemoryBackend::Local => write!(f, "local"),
        }
    }
}

/// Append-only, session-keyed chat history
#[async_trait::async_trait]
pub trait HistoryStore: Send + Sync {
    fn backend(&self) -> MemoryBackend;

    /// Append one exchange: the user input followed by the assistant output
    async fn append(&self, session_id: &str, input: &str, output: &str) -> Result<(), MemoryError>;

    /// All messages of the session, oldest first
    async fn messages(&self, session_id: &str) -> Result<Vec<ChatMessage>, MemoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_errors_are_unreachable() {
        let refused = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = MemoryError::from(redis::RedisError::from(refused));
        assert!(matches!(err, MemoryError::Unreachable(_)));
    }

    #[test]
    fn test_backend_display() {
        assert_eq!(MemoryBackend::Redis.to_string(), "redis");
        assert_eq!(MemoryBackend::Local.to_string(), "local");
    }
}
