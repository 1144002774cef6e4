//! Store Client Adapter: per-database sessions against the key-value store.
//!
//! The scan pipeline only talks to [`QueueStore`] / [`StoreSession`], so the Redis client
//! and the in-memory backend are interchangeable.

pub mod client;
#[cfg(any(test, feature = "testing"))]
pub mod glob;
#[cfg(any(test, feature = "testing"))]
pub mod memory;

pub use client::RedisStore;
#[cfg(any(test, feature = "testing"))]
pub use memory::MemoryStore;

use async_trait::async_trait;

/// Logical database number inside the store.
pub type DatabaseIndex = u32;

/// Key names are binary-safe; they are only turned into text when rendered.
pub type QueueName = Vec<u8>;

// ========================================
// ERRORS
// ========================================

/// Every variant means the store could not answer: the affected database's cycle is aborted.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    Unavailable(String),
    Timeout(&'static str),
    Protocol(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Unavailable(msg) => write!(f, "store unavailable: {}", msg),
            StoreError::Timeout(op) => write!(f, "store timed out during {}", op),
            StoreError::Protocol(msg) => write!(f, "store protocol error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<redis::RedisError> for StoreError {
    fn from(error: redis::RedisError) -> Self {
        if error.is_io_error() || error.is_connection_dropped() {
            StoreError::Unavailable(error.to_string())
        } else {
            StoreError::Protocol(error.to_string())
        }
    }
}

// ========================================
// LENGTH OUTCOME
// ========================================

/// Result of measuring one key.
#[derive(Debug, Clone, PartialEq)]
pub enum LengthOutcome {
    Measured(u64),
    /// Not a list, or gone since it was enumerated.
    NotApplicable,
    Failed(StoreError),
}

// ========================================
// TRAITS
// ========================================

#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Opens a session bound to `db`.
    async fn open(&self, db: DatabaseIndex) -> Result<Box<dyn StoreSession>, StoreError>;
}

#[async_trait]
pub trait StoreSession: Send {
    /// Raw keyspace section of the server info report.
    async fn keyspace(&mut self) -> Result<String, StoreError>;

    /// Keys of the selected database matching `pattern`, byte for byte as stored.
    async fn keys(&mut self, pattern: &str) -> Result<Vec<QueueName>, StoreError>;

    async fn list_length(&mut self, key: &[u8]) -> LengthOutcome;

    /// Best-effort teardown.
    async fn close(self: Box<Self>);
}
