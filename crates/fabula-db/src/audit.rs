//! Audit sink writing to the `audit_log` table.

use async_trait::async_trait;
use fabula_core::side_channel::{AuditSink, SideChannelError};
use fabula_types::{AuditEntry, UserId};
use sqlx::types::Json;

use crate::postgres::PostgresPool;
use crate::sqlite::SqlitePool;

const INSERT_AUDIT: &str = "INSERT INTO audit_log \
     (id, tenant_id, actor_user_id, action, entity_type, entity_id, metadata, created_at)";

#[derive(Debug, Clone)]
enum Backend {
    Postgres(sqlx::PgPool),
    Sqlite(sqlx::SqlitePool),
}

/// Append-only audit log in the relational store.
#[derive(Debug, Clone)]
pub struct SqlAuditSink {
    backend: Backend,
}

impl SqlAuditSink {
    /// Sink writing through a `PostgreSQL` pool.
    pub fn postgres(pool: &PostgresPool) -> Self {
        Self {
            backend: Backend::Postgres(pool.pool().clone()),
        }
    }

    /// Sink writing through a `SQLite` pool.
    pub fn sqlite(pool: &SqlitePool) -> Self {
        Self {
            backend: Backend::Sqlite(pool.pool().clone()),
        }
    }
}

fn write_failed(err: &sqlx::Error) -> SideChannelError {
    SideChannelError::Write(err.to_string())
}

#[async_trait]
impl AuditSink for SqlAuditSink {
    async fn record(&self, entry: &AuditEntry) -> Result<(), SideChannelError> {
        let actor = entry.actor_user_id.map(UserId::into_inner);
        match &self.backend {
            Backend::Postgres(pool) => {
                sqlx::query(&format!(
                    "{INSERT_AUDIT} VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
                ))
                .bind(entry.id.into_inner())
                .bind(entry.tenant_id.into_inner())
                .bind(actor)
                .bind(entry.action.as_str())
                .bind(entry.entity_type.as_str())
                .bind(entry.entity_id)
                .bind(Json(&entry.metadata))
                .bind(entry.created_at)
                .execute(pool)
                .await
                .map_err(|e| write_failed(&e))?;
            }
            Backend::Sqlite(pool) => {
                sqlx::query(&format!("{INSERT_AUDIT} VALUES (?, ?, ?, ?, ?, ?, ?, ?)"))
                    .bind(entry.id.into_inner())
                    .bind(entry.tenant_id.into_inner())
                    .bind(actor)
                    .bind(entry.action.as_str())
                    .bind(entry.entity_type.as_str())
                    .bind(entry.entity_id)
                    .bind(Json(&entry.metadata))
                    .bind(entry.created_at)
                    .execute(pool)
                    .await
                    .map_err(|e| write_failed(&e))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;
    use fabula_types::{AuditAction, AuditEntryId, EntityKind, TenantId};
    use sqlx::Row;
    use uuid::Uuid;

    use super::*;
    use crate::sqlite::SqliteConfig;

    #[tokio::test]
    async fn entries_land_in_the_audit_log() {
        let pool = SqlitePool::connect(&SqliteConfig::in_memory()).await.unwrap();
        pool.run_migrations().await.unwrap();
        let sink = SqlAuditSink::sqlite(&pool);
        let entry = AuditEntry {
            id: AuditEntryId::new(),
            tenant_id: TenantId::new(),
            actor_user_id: None,
            action: AuditAction::Clone,
            entity_type: EntityKind::Story,
            entity_id: Uuid::now_v7(),
            metadata: BTreeMap::from([("version_number".to_owned(), serde_json::json!(2))]),
            created_at: Utc::now(),
        };
        sink.record(&entry).await.unwrap();

        let row = sqlx::query("SELECT action, entity_type FROM audit_log")
            .fetch_one(pool.pool())
            .await
            .unwrap();
        assert_eq!(row.get::<String, _>("action"), "clone");
        assert_eq!(row.get::<String, _>("entity_type"), "story");
    }
}
