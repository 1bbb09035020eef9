//! In-memory TTL store for tests and local development.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{StoreError, TtlStore};

struct Entry {
    value: String,
    expires_at: Instant,
}

/// [`TtlStore`] backed by a process-local map with deadline-based expiry.
///
/// Every entry carries an expiry, so [`TtlStore::ttl`] never returns `-1`
/// from this implementation. Expired entries are dropped lazily on access.
#[derive(Default)]
pub struct MemoryTtlStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryTtlStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force-expire a key immediately, as if its TTL had elapsed.
    ///
    /// Lets tests exercise expiry paths without sleeping.
    pub async fn expire_now(&self, key: &str) {
        self.entries.write().await.remove(key);
    }
}

#[async_trait]
impl TtlStore for MemoryTtlStore {
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError> {
        let entry = Entry {
            value: value.to_string(),
            expires_at: Instant::now() + Duration::from_secs(ttl_secs),
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|e| e.expires_at > Instant::now())
            .map(|e| e.value.clone()))
    }

    async fn ttl(&self, key: &str) -> Result<i64, StoreError> {
        let entries = self.entries.read().await;
        let Some(entry) = entries.get(key) else {
            return Ok(-2);
        };
        let remaining = entry.expires_at.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(-2);
        }
        // Round up so a freshly set N-second key reports N, matching Redis.
        Ok(remaining.as_millis().div_ceil(1000) as i64)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}
