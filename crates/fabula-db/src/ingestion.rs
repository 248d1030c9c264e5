//! Redis-backed ingestion queue.
//!
//! One sorted set per tenant holds the entities awaiting (re)indexing.
//! Pushing an entity that is already queued only bumps its score, so a
//! burst of edits collapses into one entry whose score is the time of the
//! latest edit. Consumers pop entries whose score is old enough.
//!
//! # Key Patterns
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `ingestion:queue:{tenant_id}` | Sorted set | `{kind}:{id}` scored by last push (unix s) |

use async_trait::async_trait;
use fabula_core::side_channel::{IngestionQueue, SideChannelError};
use fabula_types::TenantId;
use fred::prelude::*;
use uuid::Uuid;

use crate::error::DbError;

/// Sorted-set key of a tenant's queue.
pub fn queue_key(tenant: TenantId) -> String {
    format!("ingestion:queue:{tenant}")
}

/// Sorted-set member of one entity.
pub fn queue_member(kind: &str, id: Uuid) -> String {
    format!("{kind}:{id}")
}

/// Connection handle to the Redis instance holding the queues.
#[derive(Clone)]
pub struct RedisIngestionQueue {
    client: Client,
}

impl RedisIngestionQueue {
    /// Connect to Redis at the given URL (`redis://host:port[/db]`).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the URL cannot be parsed.
    /// Returns [`DbError::Redis`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        let config = Config::from_url(url)
            .map_err(|e| DbError::Config(format!("Invalid Redis URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        tracing::info!("Connected to ingestion queue");
        Ok(Self { client })
    }

    /// Number of entities queued for `tenant`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Redis`] if the read fails.
    pub async fn pending(&self, tenant: TenantId) -> Result<u64, DbError> {
        let count: u64 = self.client.zcard(queue_key(tenant)).await?;
        Ok(count)
    }
}

impl core::fmt::Debug for RedisIngestionQueue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RedisIngestionQueue").finish_non_exhaustive()
    }
}

#[async_trait]
impl IngestionQueue for RedisIngestionQueue {
    async fn push(&self, tenant: TenantId, kind: &str, id: Uuid) -> Result<(), SideChannelError> {
        // Unix seconds stay far below 2^53, so the conversion is exact.
        #[allow(clippy::cast_precision_loss)]
        let score = chrono::Utc::now().timestamp() as f64;
        let _: i64 = self
            .client
            .zadd(
                queue_key(tenant),
                None,
                None,
                false,
                false,
                (score, queue_member(kind, id)),
            )
            .await
            .map_err(|e| SideChannelError::Write(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_follow_the_consumer_layout() {
        let tenant = TenantId(Uuid::nil());
        let id = Uuid::from_u128(7);
        assert_eq!(
            queue_key(tenant),
            "ingestion:queue:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            queue_member("chapter", id),
            "chapter:00000000-0000-0000-0000-000000000007"
        );
    }
}
