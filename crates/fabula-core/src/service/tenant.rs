//! Tenant registry.
//!
//! Tenants live in the reserved system slot, so every transaction here is
//! opened for [`TenantId::BUILTIN`] rather than for a caller's tenant.

use fabula_types::{AuditAction, EntityKind, Tenant, TenantId, TenantStatus};
use serde::Deserialize;
use tracing::info;

use super::{Deps, required};
use crate::clock;
use crate::error::CoreError;
use crate::store::{Filter, Isolation, Table, Tx};
use crate::tenant::TenantContext;

/// Input of [`TenantService::create`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewTenant {
    /// Display name, unique across tenants.
    pub name: String,
}

/// Edits accepted by [`TenantService::update`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TenantChanges {
    /// New name.
    pub name: Option<String>,
    /// New status.
    pub status: Option<TenantStatus>,
}

/// Tenant use cases.
#[derive(Debug, Clone)]
pub struct TenantService {
    deps: Deps,
}

const SYSTEM: TenantContext = TenantContext::new(TenantId::BUILTIN);

async fn all(tx: &mut Tx) -> Result<Vec<Tenant>, CoreError> {
    tx.list_in(Table::Tenants, TenantId::BUILTIN, Filter::all())
        .await
}

async fn ensure_unique_name(
    tx: &mut Tx,
    name: &str,
    except: Option<TenantId>,
) -> Result<(), CoreError> {
    let taken = all(tx)
        .await?
        .iter()
        .any(|t| t.name == name && Some(t.id) != except);
    if taken {
        Err(CoreError::already_exists("tenant", "name", name))
    } else {
        Ok(())
    }
}

impl TenantService {
    /// Create the service.
    pub const fn new(deps: Deps) -> Self {
        Self { deps }
    }

    /// Register a tenant.
    pub async fn create(&self, input: NewTenant) -> Result<Tenant, CoreError> {
        let name = required("name", &input.name)?;
        self.insert(TenantId::new(), name).await
    }

    /// Register the tenant with a fixed id unless it already exists. Used
    /// by the offline runtime to seed its default tenant.
    pub async fn ensure(&self, id: TenantId, name: &str) -> Result<Tenant, CoreError> {
        if let Some(existing) = self.find(id).await? {
            return Ok(existing);
        }
        let name = required("name", name)?;
        self.insert(id, name).await
    }

    async fn insert(&self, id: TenantId, name: String) -> Result<Tenant, CoreError> {
        let mut tx = self.deps.begin(&SYSTEM, Isolation::Serializable).await?;
        ensure_unique_name(&mut tx, &name, None).await?;

        let now = clock::now();
        let tenant = Tenant {
            id,
            name,
            status: TenantStatus::Active,
            created_at: now,
            updated_at: now,
        };
        tx.insert(&tenant).await?;
        tx.commit().await?;

        info!(tenant_id = %tenant.id, name = %tenant.name, "Tenant created");
        let ctx = TenantContext::new(tenant.id);
        self.deps
            .side
            .audit(&ctx, AuditAction::Create, EntityKind::Tenant, tenant.id)
            .await;
        Ok(tenant)
    }

    async fn find(&self, id: TenantId) -> Result<Option<Tenant>, CoreError> {
        let mut tx = self.deps.open(&SYSTEM).await?;
        tx.find_in(Table::Tenants, TenantId::BUILTIN, id.into_inner())
            .await
    }

    /// Load a tenant.
    pub async fn get(&self, id: TenantId) -> Result<Tenant, CoreError> {
        self.find(id)
            .await?
            .ok_or_else(|| CoreError::not_found("tenant", id))
    }

    /// Every tenant, oldest first.
    pub async fn list(&self) -> Result<Vec<Tenant>, CoreError> {
        let mut tx = self.deps.open(&SYSTEM).await?;
        all(&mut tx).await
    }

    /// Rename or change the status of a tenant.
    pub async fn update(&self, id: TenantId, changes: TenantChanges) -> Result<Tenant, CoreError> {
        let mut tx = self.deps.begin(&SYSTEM, Isolation::Serializable).await?;
        let mut tenant: Tenant = tx
            .find_in(Table::Tenants, TenantId::BUILTIN, id.into_inner())
            .await?
            .ok_or_else(|| CoreError::not_found("tenant", id))?;

        if let Some(name) = changes.name {
            let name = required("name", &name)?;
            ensure_unique_name(&mut tx, &name, Some(id)).await?;
            tenant.name = name;
        }
        if let Some(status) = changes.status {
            tenant.status = status;
        }
        tenant.updated_at = clock::now();
        tx.update(&tenant).await?;
        tx.commit().await?;

        let ctx = TenantContext::new(tenant.id);
        self.deps
            .side
            .audit(&ctx, AuditAction::Update, EntityKind::Tenant, tenant.id)
            .await;
        Ok(tenant)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::side_channel::SideChannels;
    use crate::store::MemoryStore;

    fn service() -> TenantService {
        TenantService::new(Deps::new(
            Arc::new(MemoryStore::new()),
            Arc::new(SideChannels::noop()),
        ))
    }

    #[tokio::test]
    async fn names_are_unique() {
        let tenants = service();
        tenants
            .create(NewTenant { name: "Acme".into() })
            .await
            .unwrap();
        let err = tenants
            .create(NewTenant { name: " Acme ".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::AlreadyExists { resource: "tenant", .. }));
    }

    #[tokio::test]
    async fn ensure_is_idempotent() {
        let tenants = service();
        let first = tenants
            .ensure(TenantId::OFFLINE_DEFAULT, "Default")
            .await
            .unwrap();
        let second = tenants
            .ensure(TenantId::OFFLINE_DEFAULT, "Default")
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(tenants.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_changes_status() {
        let tenants = service();
        let tenant = tenants
            .create(NewTenant { name: "Acme".into() })
            .await
            .unwrap();
        let updated = tenants
            .update(
                tenant.id,
                TenantChanges {
                    status: Some(TenantStatus::Suspended),
                    ..TenantChanges::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, TenantStatus::Suspended);
        assert_eq!(tenants.get(tenant.id).await.unwrap(), updated);
    }
}
