//! [`Store`] backed by `SQLite`.
//!
//! `SQLite` transactions are serializable already and the pool holds a
//! single connection, so the requested [`Isolation`] needs no statement.

use async_trait::async_trait;
use fabula_core::StoreError;
use fabula_core::store::{Isolation, Store, Transaction};
use sqlx::Sqlite;

use crate::error::store_error;
use crate::sql::sql_transaction;
use crate::sqlite::SqlitePool;

/// Engine store over a `SQLite` pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: sqlx::SqlitePool,
}

impl SqliteStore {
    /// Store sharing `pool`'s connection.
    pub fn new(pool: &SqlitePool) -> Self {
        Self {
            pool: pool.pool().clone(),
        }
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn begin(&self, _isolation: Isolation) -> Result<Box<dyn Transaction>, StoreError> {
        let tx = self.pool.begin().await.map_err(store_error)?;
        Ok(Box::new(SqliteTransaction::new(tx)))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(())
    }
}

sql_transaction!(
    /// An open `SQLite` transaction. Dropping it rolls back.
    SqliteTransaction,
    Sqlite
);

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{SubsecRound, Utc};
    use fabula_core::store::{Document, Filter, RelationEndpoint, RelationQuery, Table};
    use fabula_types::{EntityKind, EntityRelation, RelationId, TenantId, WorldId};
    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::sqlite::SqliteConfig;

    async fn store() -> SqliteStore {
        let pool = SqlitePool::connect(&SqliteConfig::in_memory()).await.unwrap();
        pool.run_migrations().await.unwrap();
        SqliteStore::new(&pool)
    }

    fn doc(tenant: TenantId, scope: Uuid, sort_key: Option<f64>) -> Document {
        let now = Utc::now().trunc_subsecs(6);
        Document {
            id: Uuid::now_v7(),
            tenant_id: tenant,
            scope_id: Some(scope),
            parent_id: None,
            ref_id: None,
            sort_key,
            body: json!({ "name": "row" }),
            created_at: now,
            updated_at: now,
        }
    }

    fn edge(tenant: TenantId, world: WorldId, label: &str) -> EntityRelation {
        let now = Utc::now().trunc_subsecs(6);
        EntityRelation {
            id: RelationId::new(),
            tenant_id: tenant,
            world_id: world,
            source_type: EntityKind::Character,
            source_id: Uuid::now_v7(),
            target_type: EntityKind::Location,
            target_id: Uuid::now_v7(),
            relation_type: label.to_owned(),
            context_type: None,
            context_id: None,
            attributes: BTreeMap::from([("notes".to_owned(), json!("seen here"))]),
            summary: String::new(),
            mirror_id: None,
            created_by_user_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn documents_round_trip_and_roll_back() {
        let store = store().await;
        let tenant = TenantId::new();
        let scope = Uuid::now_v7();
        let kept = doc(tenant, scope, Some(1.0));
        let unplaced = doc(tenant, scope, None);
        let early = doc(tenant, scope, Some(-2.5));

        let mut tx = store.begin(Isolation::ReadCommitted).await.unwrap();
        for row in [&kept, &unplaced, &early] {
            tx.insert(Table::Events, row).await.unwrap();
        }
        tx.commit().await.unwrap();

        {
            let mut tx = store.begin(Isolation::Serializable).await.unwrap();
            tx.delete(Table::Events, tenant, kept.id).await.unwrap();
        }

        let mut tx = store.begin(Isolation::ReadCommitted).await.unwrap();
        let fetched = tx.get(Table::Events, tenant, kept.id).await.unwrap();
        assert_eq!(fetched, Some(kept.clone()));
        assert!(
            tx.get(Table::Events, TenantId::new(), kept.id)
                .await
                .unwrap()
                .is_none()
        );
        let ids: Vec<Uuid> = tx
            .list(Table::Events, tenant, Filter::scope(scope))
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec![early.id, kept.id, unplaced.id]);
    }

    #[tokio::test]
    async fn relations_page_by_cursor() {
        let store = store().await;
        let tenant = TenantId::new();
        let world = WorldId::new();
        let first = edge(tenant, world, "visits");
        let second = edge(tenant, world, "visits");

        let mut tx = store.begin(Isolation::ReadCommitted).await.unwrap();
        tx.insert_relation(&first).await.unwrap();
        tx.insert_relation(&second).await.unwrap();

        let mut query = RelationQuery::all(RelationEndpoint::World(world));
        query.limit = Some(1);
        let page = tx.list_relations(tenant, &query).await.unwrap();
        assert_eq!(page, vec![first.clone()]);

        query.after = Some(fabula_core::store::CursorPosition {
            id: first.id,
            created_at: first.created_at,
        });
        let page = tx.list_relations(tenant, &query).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, second.id);

        let removed = tx
            .delete_relations_touching(tenant, EntityKind::Location, first.target_id)
            .await
            .unwrap();
        assert_eq!(removed, 1);
        tx.commit().await.unwrap();
    }
}
