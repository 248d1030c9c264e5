//! Audit and ingestion side channels.
//!
//! Both collaborators are write-only and best-effort: a failed write is
//! logged at `warn` and never fails the use case that triggered it. Writes
//! happen after the primary transaction commits.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use fabula_types::{AuditAction, AuditEntry, AuditEntryId, EntityKind, TenantId};
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use crate::clock;
use crate::tenant::TenantContext;

/// Failure of a side-channel collaborator.
#[derive(Debug, thiserror::Error)]
pub enum SideChannelError {
    /// The sink or queue rejected the write.
    #[error("side channel write failed: {0}")]
    Write(String),
}

/// Append-only audit log.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Append one entry.
    async fn record(&self, entry: &AuditEntry) -> Result<(), SideChannelError>;
}

/// Queue of entities that downstream consumers should (re)index.
#[async_trait]
pub trait IngestionQueue: Send + Sync {
    /// Enqueue `(tenant, kind, id)`.
    async fn push(&self, tenant: TenantId, kind: &str, id: Uuid) -> Result<(), SideChannelError>;
}

/// Audit sink that drops every entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditSink;

#[async_trait]
impl AuditSink for NoopAuditSink {
    async fn record(&self, _entry: &AuditEntry) -> Result<(), SideChannelError> {
        Ok(())
    }
}

/// Audit sink that keeps entries in memory. Used by tests.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every recorded entry, oldest first.
    pub async fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().await.clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, entry: &AuditEntry) -> Result<(), SideChannelError> {
        self.entries.lock().await.push(entry.clone());
        Ok(())
    }
}

/// Queue that keeps pushed items in memory. Used by tests.
#[derive(Debug, Default)]
pub struct MemoryIngestionQueue {
    items: Mutex<Vec<(TenantId, String, Uuid)>>,
}

impl MemoryIngestionQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every pushed item, oldest first.
    pub async fn items(&self) -> Vec<(TenantId, String, Uuid)> {
        self.items.lock().await.clone()
    }
}

#[async_trait]
impl IngestionQueue for MemoryIngestionQueue {
    async fn push(&self, tenant: TenantId, kind: &str, id: Uuid) -> Result<(), SideChannelError> {
        self.items.lock().await.push((tenant, kind.to_owned(), id));
        Ok(())
    }
}

/// The audit sink plus the optional ingestion queue, shared by every service.
pub struct SideChannels {
    audit: Arc<dyn AuditSink>,
    ingestion: RwLock<Option<Arc<dyn IngestionQueue>>>,
}

impl SideChannels {
    /// Wire an audit sink with no ingestion queue.
    pub fn new(audit: Arc<dyn AuditSink>) -> Self {
        Self {
            audit,
            ingestion: RwLock::new(None),
        }
    }

    /// Side channels that discard everything.
    pub fn noop() -> Self {
        Self::new(Arc::new(NoopAuditSink))
    }

    /// Install (or clear) the ingestion queue.
    pub fn set_ingestion_queue(&self, queue: Option<Arc<dyn IngestionQueue>>) {
        *self
            .ingestion
            .write()
            .unwrap_or_else(PoisonError::into_inner) = queue;
    }

    fn queue(&self) -> Option<Arc<dyn IngestionQueue>> {
        self.ingestion
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Record an audit entry without metadata.
    pub async fn audit(
        &self,
        ctx: &TenantContext,
        action: AuditAction,
        kind: EntityKind,
        id: impl Into<Uuid> + Send,
    ) {
        self.audit_with(ctx, action, kind, id, BTreeMap::new())
            .await;
    }

    /// Record an audit entry with metadata.
    pub async fn audit_with(
        &self,
        ctx: &TenantContext,
        action: AuditAction,
        kind: EntityKind,
        id: impl Into<Uuid> + Send,
        metadata: BTreeMap<String, serde_json::Value>,
    ) {
        let entry = AuditEntry {
            id: AuditEntryId::new(),
            tenant_id: ctx.tenant_id,
            actor_user_id: ctx.actor,
            action,
            entity_type: kind,
            entity_id: id.into(),
            metadata,
            created_at: clock::now(),
        };
        if let Err(e) = self.audit.record(&entry).await {
            warn!(
                tenant_id = %entry.tenant_id,
                action = %action,
                entity_type = %kind,
                entity_id = %entry.entity_id,
                error = %e,
                "Audit write failed"
            );
        }
    }

    /// Push an entity onto the ingestion queue when one is installed.
    pub async fn ingest(&self, ctx: &TenantContext, kind: &str, id: impl Into<Uuid> + Send) {
        let Some(queue) = self.queue() else {
            return;
        };
        let id = id.into();
        if let Err(e) = queue.push(ctx.tenant_id, kind, id).await {
            warn!(
                tenant_id = %ctx.tenant_id,
                entity_type = kind,
                entity_id = %id,
                error = %e,
                "Ingestion push failed"
            );
        }
    }
}

impl Default for SideChannels {
    fn default() -> Self {
        Self::noop()
    }
}

impl core::fmt::Debug for SideChannels {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SideChannels")
            .field("ingestion", &self.queue().is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    struct FailingSink;

    #[async_trait]
    impl AuditSink for FailingSink {
        async fn record(&self, _entry: &AuditEntry) -> Result<(), SideChannelError> {
            Err(SideChannelError::Write("sink offline".into()))
        }
    }

    #[tokio::test]
    async fn audit_failures_are_swallowed() {
        let side = SideChannels::new(Arc::new(FailingSink));
        let ctx = TenantContext::new(TenantId::new());
        side.audit(&ctx, AuditAction::Create, EntityKind::World, Uuid::now_v7())
            .await;
    }

    #[tokio::test]
    async fn ingestion_is_a_noop_until_installed() {
        let side = SideChannels::noop();
        let ctx = TenantContext::new(TenantId::new());
        let queue = Arc::new(MemoryIngestionQueue::new());

        side.ingest(&ctx, "world", Uuid::now_v7()).await;
        side.set_ingestion_queue(Some(queue.clone()));
        let id = Uuid::now_v7();
        side.ingest(&ctx, "world", id).await;

        let items = queue.items().await;
        assert_eq!(items, vec![(ctx.tenant_id, "world".to_owned(), id)]);
    }

    #[tokio::test]
    async fn memory_sink_keeps_entries() {
        let sink = Arc::new(MemoryAuditSink::new());
        let side = SideChannels::new(sink.clone());
        let ctx = TenantContext::new(TenantId::new());
        let id = Uuid::now_v7();
        side.audit(&ctx, AuditAction::Delete, EntityKind::Character, id)
            .await;

        let entries = sink.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entity_id, id);
        assert_eq!(entries[0].action, AuditAction::Delete);
    }
}
