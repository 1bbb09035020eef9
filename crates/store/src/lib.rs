//! Ephemeral TTL key-value store.
//!
//! Rate-limit markers, pending verification codes, and verified flags all
//! live in a shared store with automatic expiry, so every service instance
//! observes the same rate-limit and verification state. [`RedisTtlStore`]
//! is the production implementation; [`MemoryTtlStore`] backs tests and
//! local development.

mod memory;
mod redis;

use async_trait::async_trait;

pub use self::memory::MemoryTtlStore;
pub use self::redis::RedisTtlStore;

/// Error type for TTL store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The underlying Redis command failed (connection, protocol, type).
    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
}

/// Short-lived string storage with expiry, following Redis TTL
/// conventions.
#[async_trait]
pub trait TtlStore: Send + Sync {
    /// Store `value` under `key`, expiring automatically after `ttl_secs`.
    ///
    /// Overwrites any existing value and resets the expiry.
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError>;

    /// Fetch the value under `key`, or `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Remaining lifetime of `key` in seconds.
    ///
    /// Returns `-1` when the key exists without an expiry and `-2` when the
    /// key does not exist (Redis `TTL` semantics).
    async fn ttl(&self, key: &str) -> Result<i64, StoreError>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}
