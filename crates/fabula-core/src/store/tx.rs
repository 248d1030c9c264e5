//! Typed, tenant-bound view over a [`Transaction`].

use fabula_types::{EntityKind, EntityRelation, RelationId, TenantId};
use uuid::Uuid;

use super::{Document, Filter, Isolation, Record, RelationQuery, Store, Table, Transaction};
use crate::error::CoreError;
use crate::tenant::TenantContext;

/// A transaction opened on behalf of one tenant.
///
/// Every call is qualified with the tenant the transaction was opened
/// for; there is no way to reach another tenant's rows except through
/// the explicit `*_in` variants, which the engine only uses for rows in
/// the reserved system slot (the tenant registry and built-in RPG systems).
pub struct Tx {
    inner: Box<dyn Transaction>,
    ctx: TenantContext,
}

impl Tx {
    /// Open a transaction on `store` for `ctx`.
    pub async fn begin(
        store: &dyn Store,
        ctx: &TenantContext,
        isolation: Isolation,
    ) -> Result<Self, CoreError> {
        let inner = store.begin(isolation).await?;
        Ok(Self { inner, ctx: *ctx })
    }

    /// Tenant the transaction is bound to.
    pub const fn tenant(&self) -> TenantId {
        self.ctx.tenant_id
    }

    /// Request context the transaction was opened with.
    pub const fn context(&self) -> &TenantContext {
        &self.ctx
    }

    /// Commit every write.
    pub async fn commit(self) -> Result<(), CoreError> {
        self.inner.commit().await?;
        Ok(())
    }

    // -- documents ----------------------------------------------------------

    /// Load a record, or `None` when it does not exist for this tenant.
    pub async fn find<T: Record>(&mut self, id: impl Into<Uuid>) -> Result<Option<T>, CoreError> {
        let tenant = self.tenant();
        self.find_in(T::TABLE, tenant, id.into()).await
    }

    /// Load a record, failing with `NotFound` when absent.
    pub async fn fetch<T: Record>(&mut self, id: impl Into<Uuid>) -> Result<T, CoreError> {
        let id = id.into();
        self.find::<T>(id)
            .await?
            .ok_or_else(|| CoreError::not_found(T::RESOURCE, id))
    }

    /// Load a record from an explicit table and tenant slot.
    pub async fn find_in<T: Record>(
        &mut self,
        table: Table,
        tenant: TenantId,
        id: Uuid,
    ) -> Result<Option<T>, CoreError> {
        match self.inner.get(table, tenant, id).await? {
            Some(doc) => Ok(Some(T::from_document(doc)?)),
            None => Ok(None),
        }
    }

    /// Load the raw row of any table for this tenant.
    pub async fn find_document(
        &mut self,
        table: Table,
        id: Uuid,
    ) -> Result<Option<Document>, CoreError> {
        let tenant = self.tenant();
        Ok(self.inner.get(table, tenant, id).await?)
    }

    /// List records of this tenant matching `filter`.
    pub async fn list<T: Record>(&mut self, filter: Filter) -> Result<Vec<T>, CoreError> {
        let tenant = self.tenant();
        self.list_in(T::TABLE, tenant, filter).await
    }

    /// List records from an explicit table and tenant slot.
    pub async fn list_in<T: Record>(
        &mut self,
        table: Table,
        tenant: TenantId,
        filter: Filter,
    ) -> Result<Vec<T>, CoreError> {
        let docs = self.inner.list(table, tenant, filter).await?;
        let mut out = Vec::with_capacity(docs.len());
        for doc in docs {
            out.push(T::from_document(doc)?);
        }
        Ok(out)
    }

    /// Insert a new record into its home table.
    pub async fn insert<T: Record>(&mut self, record: &T) -> Result<(), CoreError> {
        self.insert_in(T::TABLE, record).await
    }

    /// Insert a new record into an explicit table.
    pub async fn insert_in<T: Record>(
        &mut self,
        table: Table,
        record: &T,
    ) -> Result<(), CoreError> {
        self.guard_tenant(record)?;
        let doc = record.to_document()?;
        self.inner.insert(table, &doc).await?;
        Ok(())
    }

    /// Replace an existing record in its home table.
    pub async fn update<T: Record>(&mut self, record: &T) -> Result<(), CoreError> {
        self.update_in(T::TABLE, record).await
    }

    /// Replace an existing record in an explicit table.
    pub async fn update_in<T: Record>(
        &mut self,
        table: Table,
        record: &T,
    ) -> Result<(), CoreError> {
        self.guard_tenant(record)?;
        let doc = record.to_document()?;
        if self.inner.update(table, &doc).await? {
            Ok(())
        } else {
            Err(CoreError::not_found(T::RESOURCE, record.id()))
        }
    }

    /// Delete a record by id. Returns whether a row was removed.
    pub async fn delete<T: Record>(&mut self, id: impl Into<Uuid>) -> Result<bool, CoreError> {
        let tenant = self.tenant();
        Ok(self.inner.delete(T::TABLE, tenant, id.into()).await?)
    }

    /// Delete by id from an explicit table of this tenant.
    pub async fn delete_in(&mut self, table: Table, id: Uuid) -> Result<bool, CoreError> {
        let tenant = self.tenant();
        Ok(self.inner.delete(table, tenant, id).await?)
    }

    /// Delete every row of `table` matching `filter`.
    pub async fn delete_where(&mut self, table: Table, filter: Filter) -> Result<u64, CoreError> {
        let tenant = self.tenant();
        Ok(self.inner.delete_where(table, tenant, filter).await?)
    }

    // -- relations ----------------------------------------------------------

    /// Insert a relation edge.
    pub async fn insert_relation(&mut self, relation: &EntityRelation) -> Result<(), CoreError> {
        if relation.tenant_id != self.tenant() {
            return Err(CoreError::Forbidden("cross-tenant relation write".into()));
        }
        self.inner.insert_relation(relation).await?;
        Ok(())
    }

    /// Load a relation edge, or `None`.
    pub async fn find_relation(
        &mut self,
        id: RelationId,
    ) -> Result<Option<EntityRelation>, CoreError> {
        let tenant = self.tenant();
        Ok(self.inner.get_relation(tenant, id).await?)
    }

    /// Load a relation edge, failing with `NotFound`.
    pub async fn fetch_relation(&mut self, id: RelationId) -> Result<EntityRelation, CoreError> {
        self.find_relation(id)
            .await?
            .ok_or_else(|| CoreError::not_found("relation", id))
    }

    /// Replace a relation edge.
    pub async fn update_relation(&mut self, relation: &EntityRelation) -> Result<(), CoreError> {
        if relation.tenant_id != self.tenant() {
            return Err(CoreError::Forbidden("cross-tenant relation write".into()));
        }
        if self.inner.update_relation(relation).await? {
            Ok(())
        } else {
            Err(CoreError::not_found("relation", relation.id))
        }
    }

    /// Delete a relation edge. Returns whether a row was removed.
    pub async fn delete_relation(&mut self, id: RelationId) -> Result<bool, CoreError> {
        let tenant = self.tenant();
        Ok(self.inner.delete_relation(tenant, id).await?)
    }

    /// List relation edges.
    pub async fn list_relations(
        &mut self,
        query: &RelationQuery,
    ) -> Result<Vec<EntityRelation>, CoreError> {
        let tenant = self.tenant();
        Ok(self.inner.list_relations(tenant, query).await?)
    }

    /// Delete every edge touching `(kind, id)`.
    pub async fn delete_relations_touching(
        &mut self,
        kind: EntityKind,
        id: Uuid,
    ) -> Result<u64, CoreError> {
        let tenant = self.tenant();
        Ok(self.inner.delete_relations_touching(tenant, kind, id).await?)
    }

    fn guard_tenant<T: Record>(&self, record: &T) -> Result<(), CoreError> {
        let owner = record.tenant_id();
        if owner == self.tenant() {
            Ok(())
        } else {
            Err(CoreError::Forbidden(format!(
                "{} {} belongs to another tenant",
                T::RESOURCE,
                record.id()
            )))
        }
    }
}
