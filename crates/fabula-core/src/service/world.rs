//! Worlds.

use fabula_types::{AuditAction, EntityKind, RpgSystem, RpgSystemId, World, WorldId};
use serde::Deserialize;
use tracing::info;

use super::{Deps, optional, require_tenant, required};
use crate::cascade;
use crate::clock;
use crate::error::CoreError;
use crate::service::rpg::find_system;
use crate::store::{Filter, Isolation, Tx};
use crate::tenant::TenantContext;

/// Input of [`WorldService::create`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewWorld {
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Optional genre tag.
    pub genre: Option<String>,
    /// RPG system validating stats in this world.
    pub rpg_system_id: Option<RpgSystemId>,
}

/// Edits accepted by [`WorldService::update`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WorldChanges {
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New genre.
    pub genre: Option<String>,
    /// New RPG system.
    pub rpg_system_id: Option<RpgSystemId>,
}

/// Insert a world. Shared with story creation, which materialises an
/// implicit world inside its own transaction.
pub(crate) async fn insert_world(
    tx: &mut Tx,
    input: NewWorld,
    is_implicit: bool,
) -> Result<World, CoreError> {
    let name = required("name", &input.name)?;
    if let Some(system) = input.rpg_system_id {
        find_system(tx, system).await?;
    }
    let now = clock::now();
    let world = World {
        id: WorldId::new(),
        tenant_id: tx.tenant(),
        name,
        description: optional(input.description),
        genre: optional(input.genre),
        is_implicit,
        rpg_system_id: input.rpg_system_id,
        created_at: now,
        updated_at: now,
    };
    tx.insert(&world).await?;
    Ok(world)
}

/// Load the RPG system attached to `world`, if any.
pub(crate) async fn world_system(
    tx: &mut Tx,
    world: WorldId,
) -> Result<Option<RpgSystem>, CoreError> {
    let world = tx.fetch::<World>(world).await?;
    match world.rpg_system_id {
        Some(system) => Ok(Some(find_system(tx, system).await?)),
        None => Ok(None),
    }
}

/// World use cases.
#[derive(Debug, Clone)]
pub struct WorldService {
    deps: Deps,
}

impl WorldService {
    /// Create the service.
    pub const fn new(deps: Deps) -> Self {
        Self { deps }
    }

    /// Create a world.
    pub async fn create(&self, ctx: &TenantContext, input: NewWorld) -> Result<World, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        require_tenant(&mut tx).await?;
        let world = insert_world(&mut tx, input, false).await?;
        tx.commit().await?;

        info!(tenant_id = %ctx.tenant_id, world_id = %world.id, "World created");
        self.deps
            .side
            .audit(ctx, AuditAction::Create, EntityKind::World, world.id)
            .await;
        self.deps.side.ingest(ctx, "world", world.id).await;
        Ok(world)
    }

    /// Load a world.
    pub async fn get(&self, ctx: &TenantContext, id: WorldId) -> Result<World, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        tx.fetch(id).await
    }

    /// Every world of the tenant, oldest first.
    pub async fn list(&self, ctx: &TenantContext) -> Result<Vec<World>, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        tx.list(Filter::all()).await
    }

    /// Update a world.
    pub async fn update(
        &self,
        ctx: &TenantContext,
        id: WorldId,
        changes: WorldChanges,
    ) -> Result<World, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        let mut world: World = tx.fetch(id).await?;
        if let Some(name) = changes.name {
            world.name = required("name", &name)?;
        }
        if let Some(description) = changes.description {
            world.description = optional(Some(description));
        }
        if let Some(genre) = changes.genre {
            world.genre = optional(Some(genre));
        }
        if let Some(system) = changes.rpg_system_id {
            find_system(&mut tx, system).await?;
            world.rpg_system_id = Some(system);
        }
        world.updated_at = clock::now();
        tx.update(&world).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Update, EntityKind::World, world.id)
            .await;
        self.deps.side.ingest(ctx, "world", world.id).await;
        Ok(world)
    }

    /// Delete a world with every entity and relation scoped to it.
    pub async fn delete(&self, ctx: &TenantContext, id: WorldId) -> Result<(), CoreError> {
        let mut tx = self.deps.begin(ctx, Isolation::Serializable).await?;
        let world: World = tx.fetch(id).await?;
        cascade::world(&mut tx, &world).await?;
        tx.commit().await?;

        info!(tenant_id = %ctx.tenant_id, world_id = %id, "World deleted");
        self.deps
            .side
            .audit(ctx, AuditAction::Delete, EntityKind::World, id)
            .await;
        Ok(())
    }
}
