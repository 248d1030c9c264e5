//! Artifacts.

use fabula_types::{Artifact, ArtifactId, AuditAction, EntityKind, World, WorldId};
use serde::Deserialize;

use super::{Deps, optional, require_tenant, required};
use crate::cascade;
use crate::clock;
use crate::error::CoreError;
use crate::store::Filter;
use crate::tenant::TenantContext;

/// Rarity given to artifacts created without one.
pub const DEFAULT_RARITY: &str = "common";

/// Input of [`ArtifactService::create`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewArtifact {
    /// Owning world.
    pub world_id: WorldId,
    /// Display name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Rarity tag, `common` when absent.
    #[serde(default)]
    pub rarity: Option<String>,
}

/// Edits accepted by [`ArtifactService::update`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ArtifactChanges {
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New rarity.
    pub rarity: Option<String>,
}

/// Artifact use cases.
#[derive(Debug, Clone)]
pub struct ArtifactService {
    deps: Deps,
}

impl ArtifactService {
    /// Create the service.
    pub const fn new(deps: Deps) -> Self {
        Self { deps }
    }

    /// Create an artifact in a world.
    pub async fn create(
        &self,
        ctx: &TenantContext,
        input: NewArtifact,
    ) -> Result<Artifact, CoreError> {
        let name = required("name", &input.name)?;
        let mut tx = self.deps.open(ctx).await?;
        require_tenant(&mut tx).await?;
        tx.fetch::<World>(input.world_id).await?;

        let now = clock::now();
        let artifact = Artifact {
            id: ArtifactId::new(),
            tenant_id: ctx.tenant_id,
            world_id: input.world_id,
            name,
            description: optional(input.description),
            rarity: optional(input.rarity).unwrap_or_else(|| DEFAULT_RARITY.to_owned()),
            created_at: now,
            updated_at: now,
        };
        tx.insert(&artifact).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Create, EntityKind::Artifact, artifact.id)
            .await;
        self.deps.side.ingest(ctx, "artifact", artifact.id).await;
        Ok(artifact)
    }

    /// Load an artifact.
    pub async fn get(&self, ctx: &TenantContext, id: ArtifactId) -> Result<Artifact, CoreError> {
        self.deps.open(ctx).await?.fetch(id).await
    }

    /// Artifacts of a world.
    pub async fn list_by_world(
        &self,
        ctx: &TenantContext,
        world: WorldId,
    ) -> Result<Vec<Artifact>, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        tx.fetch::<World>(world).await?;
        tx.list(Filter::scope(world.into_inner())).await
    }

    /// Update an artifact.
    pub async fn update(
        &self,
        ctx: &TenantContext,
        id: ArtifactId,
        changes: ArtifactChanges,
    ) -> Result<Artifact, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        let mut artifact: Artifact = tx.fetch(id).await?;
        if let Some(name) = changes.name {
            artifact.name = required("name", &name)?;
        }
        if let Some(description) = changes.description {
            artifact.description = optional(Some(description));
        }
        if let Some(rarity) = changes.rarity {
            artifact.rarity = required("rarity", &rarity)?;
        }
        artifact.updated_at = clock::now();
        tx.update(&artifact).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Update, EntityKind::Artifact, id)
            .await;
        self.deps.side.ingest(ctx, "artifact", id).await;
        Ok(artifact)
    }

    /// Delete an artifact with its stats chain and relations.
    pub async fn delete(&self, ctx: &TenantContext, id: ArtifactId) -> Result<(), CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        let artifact: Artifact = tx.fetch(id).await?;
        cascade::artifact(&mut tx, &artifact).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Delete, EntityKind::Artifact, id)
            .await;
        Ok(())
    }
}
