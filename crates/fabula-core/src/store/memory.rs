//! In-process [`Store`] used by tests and embedded deployments.
//!
//! All state sits behind one async mutex. A transaction takes the lock for
//! its whole lifetime and works on a private copy of the state, which is
//! written back on commit and discarded on drop. Transactions are therefore
//! fully serialized, which trivially satisfies every isolation level the
//! engine asks for.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use fabula_types::{EntityKind, EntityRelation, RelationId, TenantId};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{
    Document, Filter, Isolation, RelationQuery, SortDirection, Store, Table, Transaction,
};
use crate::error::StoreError;

/// Snapshot of every table.
#[derive(Debug, Clone, Default)]
struct MemoryState {
    tables: HashMap<Table, BTreeMap<Uuid, Document>>,
    relations: BTreeMap<RelationId, EntityRelation>,
}

impl MemoryState {
    fn table(&self, table: Table) -> Option<&BTreeMap<Uuid, Document>> {
        self.tables.get(&table)
    }

    fn table_mut(&mut self, table: Table) -> &mut BTreeMap<Uuid, Document> {
        self.tables.entry(table).or_default()
    }
}

/// Shared in-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self, _isolation: Isolation) -> Result<Box<dyn Transaction>, StoreError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, working }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// A locked, copy-on-begin view of the store.
struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

/// Row order shared with the SQL stores: `sort_key` ascending with nulls
/// last, then `created_at`, then `id`.
fn document_order(a: &Document, b: &Document) -> Ordering {
    let by_key = match (a.sort_key, b.sort_key) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_key
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn get(
        &mut self,
        table: Table,
        tenant: TenantId,
        id: Uuid,
    ) -> Result<Option<Document>, StoreError> {
        Ok(self
            .working
            .table(table)
            .and_then(|rows| rows.get(&id))
            .filter(|doc| doc.tenant_id == tenant)
            .cloned())
    }

    async fn list(
        &mut self,
        table: Table,
        tenant: TenantId,
        filter: Filter,
    ) -> Result<Vec<Document>, StoreError> {
        let mut docs: Vec<Document> = self
            .working
            .table(table)
            .map(|rows| {
                rows.values()
                    .filter(|doc| doc.tenant_id == tenant && filter.matches(doc))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        docs.sort_by(document_order);
        Ok(docs)
    }

    async fn insert(&mut self, table: Table, doc: &Document) -> Result<(), StoreError> {
        let rows = self.working.table_mut(table);
        if rows.contains_key(&doc.id) {
            return Err(StoreError::Duplicate(format!("{table}.id = {}", doc.id)));
        }
        rows.insert(doc.id, doc.clone());
        Ok(())
    }

    async fn update(&mut self, table: Table, doc: &Document) -> Result<bool, StoreError> {
        let rows = self.working.table_mut(table);
        match rows.get_mut(&doc.id) {
            Some(existing) if existing.tenant_id == doc.tenant_id => {
                *existing = doc.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(
        &mut self,
        table: Table,
        tenant: TenantId,
        id: Uuid,
    ) -> Result<bool, StoreError> {
        let rows = self.working.table_mut(table);
        if rows.get(&id).is_some_and(|doc| doc.tenant_id == tenant) {
            rows.remove(&id);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn delete_where(
        &mut self,
        table: Table,
        tenant: TenantId,
        filter: Filter,
    ) -> Result<u64, StoreError> {
        let rows = self.working.table_mut(table);
        let before = rows.len();
        rows.retain(|_, doc| !(doc.tenant_id == tenant && filter.matches(doc)));
        Ok(u64::try_from(before.saturating_sub(rows.len())).unwrap_or(u64::MAX))
    }

    async fn insert_relation(&mut self, relation: &EntityRelation) -> Result<(), StoreError> {
        if self.working.relations.contains_key(&relation.id) {
            return Err(StoreError::Duplicate(format!(
                "entity_relations.id = {}",
                relation.id
            )));
        }
        self.working.relations.insert(relation.id, relation.clone());
        Ok(())
    }

    async fn get_relation(
        &mut self,
        tenant: TenantId,
        id: RelationId,
    ) -> Result<Option<EntityRelation>, StoreError> {
        Ok(self
            .working
            .relations
            .get(&id)
            .filter(|r| r.tenant_id == tenant)
            .cloned())
    }

    async fn update_relation(&mut self, relation: &EntityRelation) -> Result<bool, StoreError> {
        match self.working.relations.get_mut(&relation.id) {
            Some(existing) if existing.tenant_id == relation.tenant_id => {
                *existing = relation.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_relation(
        &mut self,
        tenant: TenantId,
        id: RelationId,
    ) -> Result<bool, StoreError> {
        if self
            .working
            .relations
            .get(&id)
            .is_some_and(|r| r.tenant_id == tenant)
        {
            self.working.relations.remove(&id);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn list_relations(
        &mut self,
        tenant: TenantId,
        query: &RelationQuery,
    ) -> Result<Vec<EntityRelation>, StoreError> {
        let mut rows: Vec<EntityRelation> = self
            .working
            .relations
            .values()
            .filter(|r| r.tenant_id == tenant && query.matches(r))
            .cloned()
            .collect();
        rows.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        if query.direction == SortDirection::Desc {
            rows.reverse();
        }
        if let Some(limit) = query.limit {
            rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        Ok(rows)
    }

    async fn delete_relations_touching(
        &mut self,
        tenant: TenantId,
        kind: EntityKind,
        id: Uuid,
    ) -> Result<u64, StoreError> {
        let before = self.working.relations.len();
        self.working
            .relations
            .retain(|_, r| !(r.tenant_id == tenant && r.touches(kind, id)));
        let removed = before.saturating_sub(self.working.relations.len());
        Ok(u64::try_from(removed).unwrap_or(u64::MAX))
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let Self { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;

    fn doc(tenant: TenantId, scope: Uuid, sort_key: Option<f64>) -> Document {
        let now = Utc::now();
        Document {
            id: Uuid::now_v7(),
            tenant_id: tenant,
            scope_id: Some(scope),
            parent_id: None,
            ref_id: None,
            sort_key,
            body: json!({}),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn dropped_transaction_rolls_back() {
        let store = MemoryStore::new();
        let tenant = TenantId::new();
        let row = doc(tenant, Uuid::now_v7(), None);

        {
            let mut tx = store.begin(Isolation::ReadCommitted).await.unwrap();
            tx.insert(Table::Worlds, &row).await.unwrap();
        }

        let mut tx = store.begin(Isolation::ReadCommitted).await.unwrap();
        assert!(tx.get(Table::Worlds, tenant, row.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn committed_rows_are_visible_to_their_tenant_only() {
        let store = MemoryStore::new();
        let tenant = TenantId::new();
        let row = doc(tenant, Uuid::now_v7(), None);

        let mut tx = store.begin(Isolation::ReadCommitted).await.unwrap();
        tx.insert(Table::Worlds, &row).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin(Isolation::ReadCommitted).await.unwrap();
        assert!(tx.get(Table::Worlds, tenant, row.id).await.unwrap().is_some());
        assert!(
            tx.get(Table::Worlds, TenantId::new(), row.id)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn list_orders_nulls_last() {
        let store = MemoryStore::new();
        let tenant = TenantId::new();
        let scope = Uuid::now_v7();
        let unplaced = doc(tenant, scope, None);
        let late = doc(tenant, scope, Some(2.5));
        let early = doc(tenant, scope, Some(-1.0));

        let mut tx = store.begin(Isolation::ReadCommitted).await.unwrap();
        for row in [&unplaced, &late, &early] {
            tx.insert(Table::Events, row).await.unwrap();
        }
        let ids: Vec<Uuid> = tx
            .list(Table::Events, tenant, Filter::scope(scope))
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec![early.id, late.id, unplaced.id]);
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let store = MemoryStore::new();
        let row = doc(TenantId::new(), Uuid::now_v7(), None);
        let mut tx = store.begin(Isolation::ReadCommitted).await.unwrap();
        tx.insert(Table::Worlds, &row).await.unwrap();
        let err = tx.insert(Table::Worlds, &row).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }
}
