//! Redis-backed TTL store.

use std::time::Duration;

use async_trait::async_trait;

use ::redis::aio::{ConnectionManager, ConnectionManagerConfig};
use ::redis::AsyncCommands;

use crate::{StoreError, TtlStore};

/// Timeout for establishing the Redis connection.
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for a single command round-trip.
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Production [`TtlStore`] over a multiplexed Redis connection.
///
/// The connection manager reconnects automatically; cloning the store is
/// cheap and shares the underlying connection. Every command is bounded by
/// [`RESPONSE_TIMEOUT`].
#[derive(Clone)]
pub struct RedisTtlStore {
    conn: ConnectionManager,
}

impl RedisTtlStore {
    /// Connect to Redis at `url` (e.g. `redis://127.0.0.1:6379/0`).
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = ::redis::Client::open(url)?;
        let config = ConnectionManagerConfig::new()
            .set_connection_timeout(CONNECTION_TIMEOUT)
            .set_response_timeout(RESPONSE_TIMEOUT);
        let conn = client.get_connection_manager_with_config(config).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl TtlStore for RedisTtlStore {
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, ttl_secs).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn ttl(&self, key: &str) -> Result<i64, StoreError> {
        let mut conn = self.conn.clone();
        let remaining: i64 = conn.ttl(key).await?;
        Ok(remaining)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }
}
