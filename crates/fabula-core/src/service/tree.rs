//! Locations, events, factions and lore on top of the hierarchy engine.
//!
//! One generic [`TreeService`] serves all four kinds. A kind plugs in
//! through [`TreeKind`], which supplies its create and update payloads and
//! how a node of that kind is removed.

use core::marker::PhantomData;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fabula_types::{
    AuditAction, Event, EventId, Faction, FactionId, Location, LocationId, Lore, LoreId, TenantId,
    World, WorldId,
};
use serde::Deserialize;
use uuid::Uuid;

use super::timeline::{EPOCH_POSITION, clear_epoch};
use super::{Deps, bounded, optional, require_tenant, required};
use crate::cascade;
use crate::clock;
use crate::error::CoreError;
use crate::hierarchy::{self, Hierarchical};
use crate::store::{Filter, Isolation, Tx};
use crate::tenant::TenantContext;

/// Importance given to events created without one.
pub const DEFAULT_IMPORTANCE: u8 = 5;

/// A hierarchical kind served by [`TreeService`].
#[async_trait]
pub trait TreeKind: Hierarchical + core::fmt::Debug {
    /// Typed identifier of the kind.
    type Id: Copy + Into<Uuid> + From<Uuid> + core::fmt::Display + Send + Sync;
    /// Create payload.
    type Draft: Send;
    /// Update payload.
    type Changes: Send;

    /// World named by a create payload.
    fn draft_world(draft: &Self::Draft) -> WorldId;

    /// Parent named by a create payload.
    fn draft_parent(draft: &Self::Draft) -> Option<Uuid>;

    /// Build a new node from a validated payload.
    fn build(
        draft: Self::Draft,
        tenant: TenantId,
        level: u32,
        now: DateTime<Utc>,
    ) -> Result<Self, CoreError>;

    /// Apply an update payload. The parent is never touched here.
    fn apply(&mut self, changes: Self::Changes) -> Result<(), CoreError>;

    /// Isolation of the create transaction.
    fn draft_isolation(_draft: &Self::Draft) -> Isolation {
        Isolation::ReadCommitted
    }

    /// Writes that must commit together with a freshly inserted node.
    async fn inserted(_tx: &mut Tx, _node: &Self) -> Result<(), CoreError> {
        Ok(())
    }

    /// Remove a node and everything that depends on it.
    async fn remove(tx: &mut Tx, node: &Self) -> Result<(), CoreError> {
        cascade::tree_node(tx, node).await
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// CRUD and tree navigation for one hierarchical kind.
#[derive(Debug, Clone)]
pub struct TreeService<T> {
    pub(super) deps: Deps,
    kind: PhantomData<fn() -> T>,
}

/// Locations.
pub type LocationService = TreeService<Location>;
/// Events. Epoch and timeline operations live in [`super::timeline`].
pub type EventService = TreeService<Event>;
/// Factions.
pub type FactionService = TreeService<Faction>;
/// Lore.
pub type LoreService = TreeService<Lore>;

impl<T: TreeKind> TreeService<T> {
    /// Create the service.
    pub const fn new(deps: Deps) -> Self {
        Self {
            deps,
            kind: PhantomData,
        }
    }

    /// Create a node, optionally under a parent of the same world.
    pub async fn create(&self, ctx: &TenantContext, draft: T::Draft) -> Result<T, CoreError> {
        let world = T::draft_world(&draft);
        let parent = T::draft_parent(&draft);

        let mut tx = self.deps.begin(ctx, T::draft_isolation(&draft)).await?;
        require_tenant(&mut tx).await?;
        tx.fetch::<World>(world).await?;
        let level = hierarchy::level_under::<T>(&mut tx, world, parent).await?;
        let node = T::build(draft, ctx.tenant_id, level, clock::now())?;
        tx.insert(&node).await?;
        T::inserted(&mut tx, &node).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Create, T::KIND, node.id())
            .await;
        self.deps.side.ingest(ctx, T::KIND.as_str(), node.id()).await;
        Ok(node)
    }

    /// Load a node.
    pub async fn get(&self, ctx: &TenantContext, id: T::Id) -> Result<T, CoreError> {
        self.deps.open(ctx).await?.fetch(id).await
    }

    /// Every node of a world.
    pub async fn list_by_world(
        &self,
        ctx: &TenantContext,
        world: WorldId,
    ) -> Result<Vec<T>, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        tx.fetch::<World>(world).await?;
        tx.list(Filter::scope(world.into_inner())).await
    }

    /// Update the attributes of a node. Use [`Self::move_to`] to change its
    /// parent.
    pub async fn update(
        &self,
        ctx: &TenantContext,
        id: T::Id,
        changes: T::Changes,
    ) -> Result<T, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        let mut node: T = tx.fetch(id).await?;
        node.apply(changes)?;
        node.touch(clock::now());
        tx.update(&node).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Update, T::KIND, node.id())
            .await;
        self.deps.side.ingest(ctx, T::KIND.as_str(), node.id()).await;
        Ok(node)
    }

    /// Re-parent a node (or make it a root) and re-level its subtree.
    pub async fn move_to(
        &self,
        ctx: &TenantContext,
        id: T::Id,
        new_parent: Option<T::Id>,
    ) -> Result<T, CoreError> {
        let mut tx = self.deps.begin(ctx, Isolation::Serializable).await?;
        let node =
            hierarchy::move_node::<T>(&mut tx, id.into(), new_parent.map(Into::into)).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Move, T::KIND, node.id())
            .await;
        self.deps.side.ingest(ctx, T::KIND.as_str(), node.id()).await;
        Ok(node)
    }

    /// Direct children.
    pub async fn children(&self, ctx: &TenantContext, id: T::Id) -> Result<Vec<T>, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        tx.fetch::<T>(id).await?;
        hierarchy::children(&mut tx, id.into()).await
    }

    /// Path to the root, closest first.
    pub async fn ancestors(&self, ctx: &TenantContext, id: T::Id) -> Result<Vec<T>, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        let node: T = tx.fetch(id).await?;
        hierarchy::ancestors(&mut tx, &node).await
    }

    /// Whole subtree, breadth-first.
    pub async fn descendants(&self, ctx: &TenantContext, id: T::Id) -> Result<Vec<T>, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        tx.fetch::<T>(id).await?;
        hierarchy::descendants(&mut tx, id.into()).await
    }

    /// Delete a node. Its children move up to its parent.
    pub async fn delete(&self, ctx: &TenantContext, id: T::Id) -> Result<(), CoreError> {
        let mut tx = self.deps.begin(ctx, Isolation::Serializable).await?;
        let node: T = tx.fetch(id).await?;
        T::remove(&mut tx, &node).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Delete, T::KIND, node.id())
            .await;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Locations
// ---------------------------------------------------------------------------

/// Input of [`LocationService::create`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewLocation {
    /// Owning world.
    pub world_id: WorldId,
    /// Parent location.
    #[serde(default)]
    pub parent_id: Option<LocationId>,
    /// Display name.
    pub name: String,
    /// Free-form type tag (city, region, ...).
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Edits accepted by [`LocationService::update`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LocationChanges {
    /// New name.
    pub name: Option<String>,
    /// New type tag.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// New description.
    pub description: Option<String>,
}

#[async_trait]
impl TreeKind for Location {
    type Id = LocationId;
    type Draft = NewLocation;
    type Changes = LocationChanges;

    fn draft_world(draft: &NewLocation) -> WorldId {
        draft.world_id
    }

    fn draft_parent(draft: &NewLocation) -> Option<Uuid> {
        draft.parent_id.map(Into::into)
    }

    fn build(
        draft: NewLocation,
        tenant: TenantId,
        level: u32,
        now: DateTime<Utc>,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            id: LocationId::new(),
            tenant_id: tenant,
            world_id: draft.world_id,
            parent_id: draft.parent_id,
            name: required("name", &draft.name)?,
            kind: optional(draft.kind),
            description: optional(draft.description),
            hierarchy_level: level,
            created_at: now,
            updated_at: now,
        })
    }

    fn apply(&mut self, changes: LocationChanges) -> Result<(), CoreError> {
        if let Some(name) = changes.name {
            self.name = required("name", &name)?;
        }
        if let Some(kind) = changes.kind {
            self.kind = optional(Some(kind));
        }
        if let Some(description) = changes.description {
            self.description = optional(Some(description));
        }
        Ok(())
    }

    async fn remove(tx: &mut Tx, node: &Self) -> Result<(), CoreError> {
        cascade::location(tx, node).await
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Input of [`EventService::create`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewEvent {
    /// Owning world.
    pub world_id: WorldId,
    /// Causing event.
    #[serde(default)]
    pub parent_id: Option<EventId>,
    /// Display name.
    pub name: String,
    /// Free-form type tag.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Free-form timeline label.
    #[serde(default)]
    pub timeline: Option<String>,
    /// Importance in `1..=10`, 5 when absent.
    #[serde(default)]
    pub importance: Option<u8>,
    /// Position on the world's timeline. Ignored for an epoch, which sits
    /// at [`EPOCH_POSITION`].
    #[serde(default)]
    pub timeline_position: Option<f64>,
    /// Make the new event the world's epoch, replacing any previous one.
    #[serde(default)]
    pub is_epoch: bool,
}

/// Edits accepted by [`EventService::update`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EventChanges {
    /// New name.
    pub name: Option<String>,
    /// New type tag.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New timeline label.
    pub timeline: Option<String>,
    /// New importance.
    pub importance: Option<u8>,
    /// New timeline position.
    pub timeline_position: Option<f64>,
}

fn importance(value: u8) -> Result<u8, CoreError> {
    bounded("importance", value, 1, 10)
}

fn timeline_position(value: f64) -> Result<f64, CoreError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CoreError::validation(
            "timeline_position",
            "timeline_position must be a finite number",
        ))
    }
}

#[async_trait]
impl TreeKind for Event {
    type Id = EventId;
    type Draft = NewEvent;
    type Changes = EventChanges;

    fn draft_world(draft: &NewEvent) -> WorldId {
        draft.world_id
    }

    fn draft_parent(draft: &NewEvent) -> Option<Uuid> {
        draft.parent_id.map(Into::into)
    }

    fn build(
        draft: NewEvent,
        tenant: TenantId,
        level: u32,
        now: DateTime<Utc>,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            id: EventId::new(),
            tenant_id: tenant,
            world_id: draft.world_id,
            parent_id: draft.parent_id,
            name: required("name", &draft.name)?,
            kind: optional(draft.kind),
            description: optional(draft.description),
            timeline: optional(draft.timeline),
            importance: importance(draft.importance.unwrap_or(DEFAULT_IMPORTANCE))?,
            hierarchy_level: level,
            timeline_position: if draft.is_epoch {
                Some(EPOCH_POSITION)
            } else {
                draft.timeline_position.map(timeline_position).transpose()?
            },
            is_epoch: draft.is_epoch,
            created_at: now,
            updated_at: now,
        })
    }

    fn apply(&mut self, changes: EventChanges) -> Result<(), CoreError> {
        if let Some(name) = changes.name {
            self.name = required("name", &name)?;
        }
        if let Some(kind) = changes.kind {
            self.kind = optional(Some(kind));
        }
        if let Some(description) = changes.description {
            self.description = optional(Some(description));
        }
        if let Some(timeline) = changes.timeline {
            self.timeline = optional(Some(timeline));
        }
        if let Some(value) = changes.importance {
            self.importance = importance(value)?;
        }
        if let Some(position) = changes.timeline_position {
            self.timeline_position = Some(timeline_position(position)?);
        }
        Ok(())
    }

    fn draft_isolation(draft: &NewEvent) -> Isolation {
        if draft.is_epoch {
            Isolation::Serializable
        } else {
            Isolation::ReadCommitted
        }
    }

    async fn inserted(tx: &mut Tx, node: &Self) -> Result<(), CoreError> {
        if node.is_epoch {
            clear_epoch(tx, node.world_id, node.id, node.created_at).await?;
        }
        Ok(())
    }

    async fn remove(tx: &mut Tx, node: &Self) -> Result<(), CoreError> {
        cascade::event(tx, node).await
    }
}

// ---------------------------------------------------------------------------
// Factions
// ---------------------------------------------------------------------------

/// Input of [`FactionService::create`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewFaction {
    /// Owning world.
    pub world_id: WorldId,
    /// Parent faction.
    #[serde(default)]
    pub parent_id: Option<FactionId>,
    /// Display name.
    pub name: String,
    /// Free-form type tag.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Beliefs.
    #[serde(default)]
    pub beliefs: Option<String>,
    /// Organisational structure.
    #[serde(default)]
    pub structure: Option<String>,
    /// Symbols and heraldry.
    #[serde(default)]
    pub symbols: Option<String>,
}

/// Edits accepted by [`FactionService::update`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FactionChanges {
    /// New name.
    pub name: Option<String>,
    /// New type tag.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New beliefs.
    pub beliefs: Option<String>,
    /// New structure.
    pub structure: Option<String>,
    /// New symbols.
    pub symbols: Option<String>,
}

impl TreeKind for Faction {
    type Id = FactionId;
    type Draft = NewFaction;
    type Changes = FactionChanges;

    fn draft_world(draft: &NewFaction) -> WorldId {
        draft.world_id
    }

    fn draft_parent(draft: &NewFaction) -> Option<Uuid> {
        draft.parent_id.map(Into::into)
    }

    fn build(
        draft: NewFaction,
        tenant: TenantId,
        level: u32,
        now: DateTime<Utc>,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            id: FactionId::new(),
            tenant_id: tenant,
            world_id: draft.world_id,
            parent_id: draft.parent_id,
            name: required("name", &draft.name)?,
            kind: optional(draft.kind),
            description: optional(draft.description),
            beliefs: optional(draft.beliefs),
            structure: optional(draft.structure),
            symbols: optional(draft.symbols),
            hierarchy_level: level,
            created_at: now,
            updated_at: now,
        })
    }

    fn apply(&mut self, changes: FactionChanges) -> Result<(), CoreError> {
        if let Some(name) = changes.name {
            self.name = required("name", &name)?;
        }
        if let Some(kind) = changes.kind {
            self.kind = optional(Some(kind));
        }
        if let Some(description) = changes.description {
            self.description = optional(Some(description));
        }
        if let Some(beliefs) = changes.beliefs {
            self.beliefs = optional(Some(beliefs));
        }
        if let Some(structure) = changes.structure {
            self.structure = optional(Some(structure));
        }
        if let Some(symbols) = changes.symbols {
            self.symbols = optional(Some(symbols));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Lore
// ---------------------------------------------------------------------------

/// Input of [`LoreService::create`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewLore {
    /// Owning world.
    pub world_id: WorldId,
    /// Parent lore entry.
    #[serde(default)]
    pub parent_id: Option<LoreId>,
    /// Display name.
    pub name: String,
    /// Free-form category.
    #[serde(default)]
    pub category: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Rules.
    #[serde(default)]
    pub rules: Option<String>,
    /// Limitations.
    #[serde(default)]
    pub limitations: Option<String>,
    /// Requirements.
    #[serde(default)]
    pub requirements: Option<String>,
}

/// Edits accepted by [`LoreService::update`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoreChanges {
    /// New name.
    pub name: Option<String>,
    /// New category.
    pub category: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New rules.
    pub rules: Option<String>,
    /// New limitations.
    pub limitations: Option<String>,
    /// New requirements.
    pub requirements: Option<String>,
}

impl TreeKind for Lore {
    type Id = LoreId;
    type Draft = NewLore;
    type Changes = LoreChanges;

    fn draft_world(draft: &NewLore) -> WorldId {
        draft.world_id
    }

    fn draft_parent(draft: &NewLore) -> Option<Uuid> {
        draft.parent_id.map(Into::into)
    }

    fn build(
        draft: NewLore,
        tenant: TenantId,
        level: u32,
        now: DateTime<Utc>,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            id: LoreId::new(),
            tenant_id: tenant,
            world_id: draft.world_id,
            parent_id: draft.parent_id,
            name: required("name", &draft.name)?,
            category: optional(draft.category),
            description: optional(draft.description),
            rules: optional(draft.rules),
            limitations: optional(draft.limitations),
            requirements: optional(draft.requirements),
            hierarchy_level: level,
            created_at: now,
            updated_at: now,
        })
    }

    fn apply(&mut self, changes: LoreChanges) -> Result<(), CoreError> {
        if let Some(name) = changes.name {
            self.name = required("name", &name)?;
        }
        if let Some(category) = changes.category {
            self.category = optional(Some(category));
        }
        if let Some(description) = changes.description {
            self.description = optional(Some(description));
        }
        if let Some(rules) = changes.rules {
            self.rules = optional(Some(rules));
        }
        if let Some(limitations) = changes.limitations {
            self.limitations = optional(Some(limitations));
        }
        if let Some(requirements) = changes.requirements {
            self.requirements = optional(Some(requirements));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::service::tenant::{NewTenant, TenantService};
    use crate::service::world::{NewWorld, WorldService};
    use crate::side_channel::SideChannels;
    use crate::store::MemoryStore;

    async fn setup() -> (Deps, TenantContext, WorldId) {
        let deps = Deps::new(Arc::new(MemoryStore::new()), Arc::new(SideChannels::noop()));
        let tenant = TenantService::new(deps.clone())
            .create(NewTenant { name: "Acme".into() })
            .await
            .unwrap();
        let ctx = TenantContext::new(tenant.id);
        let world = WorldService::new(deps.clone())
            .create(
                &ctx,
                NewWorld {
                    name: "Erde".into(),
                    ..NewWorld::default()
                },
            )
            .await
            .unwrap();
        (deps, ctx, world.id)
    }

    fn faction(world: WorldId, parent: Option<FactionId>, name: &str) -> NewFaction {
        NewFaction {
            world_id: world,
            parent_id: parent,
            name: name.into(),
            kind: None,
            description: None,
            beliefs: None,
            structure: None,
            symbols: None,
        }
    }

    #[tokio::test]
    async fn levels_follow_parents() {
        let (deps, ctx, world) = setup().await;
        let factions = FactionService::new(deps);
        let guild = factions.create(&ctx, faction(world, None, "Guild")).await.unwrap();
        let cell = factions
            .create(&ctx, faction(world, Some(guild.id), "Cell"))
            .await
            .unwrap();
        assert_eq!(guild.hierarchy_level, 0);
        assert_eq!(cell.hierarchy_level, 1);

        let path = factions.ancestors(&ctx, cell.id).await.unwrap();
        assert_eq!(path, vec![guild.clone()]);
        let below = factions.descendants(&ctx, guild.id).await.unwrap();
        assert_eq!(below, vec![cell]);
    }

    #[tokio::test]
    async fn update_keeps_parent() {
        let (deps, ctx, world) = setup().await;
        let factions = FactionService::new(deps);
        let guild = factions.create(&ctx, faction(world, None, "Guild")).await.unwrap();
        let cell = factions
            .create(&ctx, faction(world, Some(guild.id), "Cell"))
            .await
            .unwrap();
        let renamed = factions
            .update(
                &ctx,
                cell.id,
                FactionChanges {
                    name: Some("Cell Nine".into()),
                    ..FactionChanges::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.parent_id, Some(guild.id));
        assert_eq!(renamed.name, "Cell Nine");
    }

    #[tokio::test]
    async fn delete_promotes_children() {
        let (deps, ctx, world) = setup().await;
        let factions = FactionService::new(deps);
        let guild = factions.create(&ctx, faction(world, None, "Guild")).await.unwrap();
        let cell = factions
            .create(&ctx, faction(world, Some(guild.id), "Cell"))
            .await
            .unwrap();
        let agent = factions
            .create(&ctx, faction(world, Some(cell.id), "Agent"))
            .await
            .unwrap();

        factions.delete(&ctx, cell.id).await.unwrap();

        let agent = factions.get(&ctx, agent.id).await.unwrap();
        assert_eq!(agent.parent_id, Some(guild.id));
        assert_eq!(agent.hierarchy_level, 1);
    }

    #[tokio::test]
    async fn event_importance_is_bounded() {
        let (deps, ctx, world) = setup().await;
        let events = EventService::new(deps);
        let err = events
            .create(
                &ctx,
                NewEvent {
                    world_id: world,
                    parent_id: None,
                    name: "Flood".into(),
                    kind: None,
                    description: None,
                    timeline: None,
                    importance: Some(11),
                    timeline_position: None,
                    is_epoch: false,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation { field: "importance", .. }));
    }
}
