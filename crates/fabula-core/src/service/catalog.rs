//! Tenant-wide trait catalogue and archetypes.

use fabula_types::{Archetype, ArchetypeId, ArchetypeTrait, AuditAction, EntityKind, Trait, TraitId};
use serde::Deserialize;

use super::{Deps, optional, require_tenant, required};
use crate::cascade;
use crate::clock;
use crate::error::CoreError;
use crate::store::{Filter, Isolation, Tx};
use crate::tenant::TenantContext;

/// Input of [`TraitService::create`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewTrait {
    /// Name, unique within the tenant.
    pub name: String,
    /// Free-form category.
    pub category: Option<String>,
    /// Description.
    pub description: Option<String>,
}

/// Edits accepted by [`TraitService::update`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TraitChanges {
    /// New name.
    pub name: Option<String>,
    /// New category.
    pub category: Option<String>,
    /// New description.
    pub description: Option<String>,
}

async fn ensure_unique_trait(
    tx: &mut Tx,
    name: &str,
    except: Option<TraitId>,
) -> Result<(), CoreError> {
    let taken = tx
        .list::<Trait>(Filter::all())
        .await?
        .iter()
        .any(|t| t.name.eq_ignore_ascii_case(name) && Some(t.id) != except);
    if taken {
        Err(CoreError::already_exists("trait", "name", name))
    } else {
        Ok(())
    }
}

/// Trait catalogue use cases.
#[derive(Debug, Clone)]
pub struct TraitService {
    deps: Deps,
}

impl TraitService {
    /// Create the service.
    pub const fn new(deps: Deps) -> Self {
        Self { deps }
    }

    /// Add a trait to the catalogue.
    pub async fn create(&self, ctx: &TenantContext, input: NewTrait) -> Result<Trait, CoreError> {
        let name = required("name", &input.name)?;
        let mut tx = self.deps.begin(ctx, Isolation::Serializable).await?;
        require_tenant(&mut tx).await?;
        ensure_unique_trait(&mut tx, &name, None).await?;

        let now = clock::now();
        let entry = Trait {
            id: TraitId::new(),
            tenant_id: ctx.tenant_id,
            name,
            category: optional(input.category),
            description: optional(input.description),
            created_at: now,
            updated_at: now,
        };
        tx.insert(&entry).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Create, EntityKind::Trait, entry.id)
            .await;
        Ok(entry)
    }

    /// Load a trait.
    pub async fn get(&self, ctx: &TenantContext, id: TraitId) -> Result<Trait, CoreError> {
        self.deps.open(ctx).await?.fetch(id).await
    }

    /// Every trait of the tenant.
    pub async fn list(&self, ctx: &TenantContext) -> Result<Vec<Trait>, CoreError> {
        self.deps.open(ctx).await?.list(Filter::all()).await
    }

    /// Update a trait.
    pub async fn update(
        &self,
        ctx: &TenantContext,
        id: TraitId,
        changes: TraitChanges,
    ) -> Result<Trait, CoreError> {
        let mut tx = self.deps.begin(ctx, Isolation::Serializable).await?;
        let mut entry: Trait = tx.fetch(id).await?;
        if let Some(name) = changes.name {
            let name = required("name", &name)?;
            ensure_unique_trait(&mut tx, &name, Some(id)).await?;
            entry.name = name;
        }
        if let Some(category) = changes.category {
            entry.category = optional(Some(category));
        }
        if let Some(description) = changes.description {
            entry.description = optional(Some(description));
        }
        entry.updated_at = clock::now();
        tx.update(&entry).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Update, EntityKind::Trait, entry.id)
            .await;
        Ok(entry)
    }

    /// Delete a trait and detach it from archetypes and characters.
    pub async fn delete(&self, ctx: &TenantContext, id: TraitId) -> Result<(), CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        let entry: Trait = tx.fetch(id).await?;
        cascade::trait_entry(&mut tx, &entry).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Delete, EntityKind::Trait, id)
            .await;
        Ok(())
    }
}

/// Input of [`ArchetypeService::create`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewArchetype {
    /// Display name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
}

/// Edits accepted by [`ArchetypeService::update`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ArchetypeChanges {
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
}

/// Archetype use cases.
#[derive(Debug, Clone)]
pub struct ArchetypeService {
    deps: Deps,
}

impl ArchetypeService {
    /// Create the service.
    pub const fn new(deps: Deps) -> Self {
        Self { deps }
    }

    /// Create an archetype with no traits.
    pub async fn create(
        &self,
        ctx: &TenantContext,
        input: NewArchetype,
    ) -> Result<Archetype, CoreError> {
        let name = required("name", &input.name)?;
        let mut tx = self.deps.open(ctx).await?;
        require_tenant(&mut tx).await?;

        let now = clock::now();
        let archetype = Archetype {
            id: ArchetypeId::new(),
            tenant_id: ctx.tenant_id,
            name,
            description: optional(input.description),
            traits: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        tx.insert(&archetype).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Create, EntityKind::Archetype, archetype.id)
            .await;
        Ok(archetype)
    }

    /// Load an archetype.
    pub async fn get(&self, ctx: &TenantContext, id: ArchetypeId) -> Result<Archetype, CoreError> {
        self.deps.open(ctx).await?.fetch(id).await
    }

    /// Every archetype of the tenant.
    pub async fn list(&self, ctx: &TenantContext) -> Result<Vec<Archetype>, CoreError> {
        self.deps.open(ctx).await?.list(Filter::all()).await
    }

    /// Update name or description.
    pub async fn update(
        &self,
        ctx: &TenantContext,
        id: ArchetypeId,
        changes: ArchetypeChanges,
    ) -> Result<Archetype, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        let mut archetype: Archetype = tx.fetch(id).await?;
        if let Some(name) = changes.name {
            archetype.name = required("name", &name)?;
        }
        if let Some(description) = changes.description {
            archetype.description = optional(Some(description));
        }
        archetype.updated_at = clock::now();
        tx.update(&archetype).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Update, EntityKind::Archetype, id)
            .await;
        Ok(archetype)
    }

    /// Delete an archetype.
    pub async fn delete(&self, ctx: &TenantContext, id: ArchetypeId) -> Result<(), CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        let archetype: Archetype = tx.fetch(id).await?;
        cascade::archetype(&mut tx, &archetype).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Delete, EntityKind::Archetype, id)
            .await;
        Ok(())
    }

    /// Bundle a trait with a default value. Adding a trait twice replaces
    /// its default value.
    pub async fn add_trait(
        &self,
        ctx: &TenantContext,
        id: ArchetypeId,
        trait_id: TraitId,
        default_value: String,
    ) -> Result<Archetype, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        let mut archetype: Archetype = tx.fetch(id).await?;
        tx.fetch::<Trait>(trait_id).await?;

        match archetype.traits.iter_mut().find(|t| t.trait_id == trait_id) {
            Some(existing) => existing.default_value = default_value,
            None => archetype.traits.push(ArchetypeTrait {
                trait_id,
                default_value,
            }),
        }
        archetype.updated_at = clock::now();
        tx.update(&archetype).await?;
        tx.commit().await?;
        Ok(archetype)
    }

    /// Remove a trait from the bundle.
    pub async fn remove_trait(
        &self,
        ctx: &TenantContext,
        id: ArchetypeId,
        trait_id: TraitId,
    ) -> Result<Archetype, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        let mut archetype: Archetype = tx.fetch(id).await?;
        let before = archetype.traits.len();
        archetype.traits.retain(|t| t.trait_id != trait_id);
        if archetype.traits.len() == before {
            return Err(CoreError::not_found("archetype trait", trait_id));
        }
        archetype.updated_at = clock::now();
        tx.update(&archetype).await?;
        tx.commit().await?;
        Ok(archetype)
    }
}
