//! Store contract between the domain engine and its persistence collaborators.
//!
//! The engine persists every entity kind in its own table of
//! [`Document`]s: a JSON body plus the handful of indexed key columns the
//! engine queries by (`scope_id`, `parent_id`, `ref_id`, `sort_key`).
//! Relation edges live in a dedicated `entity_relations` table with real
//! columns because the graph is queried by endpoint, label and cursor.
//!
//! # Transactions and cancellation
//!
//! [`Store::begin`] opens a [`Transaction`]; [`Transaction::commit`]
//! consumes it. Dropping an uncommitted transaction rolls it back. Use
//! cases are `async` futures, so dropping the future of an aborted
//! request (client disconnect, deadline, shutdown) never commits.
//!
//! # Modules
//!
//! - [`record`] -- Mapping of entity structs onto documents
//! - [`tx`] -- Typed, tenant-bound transaction wrapper used by use cases
//! - [`memory`] -- In-process store for tests and embedded use

pub mod memory;
pub mod record;
pub mod tx;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fabula_types::{EntityKind, EntityRelation, RelationId, TenantId, WorldId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;

pub use memory::MemoryStore;
pub use record::Record;
pub use tx::Tx;

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// One table per persisted entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Table {
    /// `tenants`
    Tenants,
    /// `worlds`
    Worlds,
    /// `traits`
    Traits,
    /// `archetypes`
    Archetypes,
    /// `locations`
    Locations,
    /// `characters`
    Characters,
    /// `artifacts`
    Artifacts,
    /// `events`
    Events,
    /// `factions`
    Factions,
    /// `lores`
    Lore,
    /// `stories`
    Stories,
    /// `chapters`
    Chapters,
    /// `scenes`
    Scenes,
    /// `beats`
    Beats,
    /// `content_blocks`
    ContentBlocks,
    /// `rpg_systems`
    RpgSystems,
    /// `rpg_skills`
    Skills,
    /// `rpg_classes`
    RpgClasses,
    /// `rpg_class_skills`
    ClassSkills,
    /// `inventory_slots`
    InventorySlots,
    /// `inventory_items`
    InventoryItems,
    /// `character_rpg_stats`
    CharacterStats,
    /// `artifact_rpg_stats`
    ArtifactStats,
    /// `character_inventory`
    CharacterInventory,
    /// `character_skills`
    CharacterSkills,
}

impl Table {
    /// Every table, in dependency order (parents before children).
    pub const ALL: &'static [Self] = &[
        Self::Tenants,
        Self::Worlds,
        Self::Traits,
        Self::Archetypes,
        Self::Locations,
        Self::Characters,
        Self::Artifacts,
        Self::Events,
        Self::Factions,
        Self::Lore,
        Self::Stories,
        Self::Chapters,
        Self::Scenes,
        Self::Beats,
        Self::ContentBlocks,
        Self::RpgSystems,
        Self::Skills,
        Self::RpgClasses,
        Self::ClassSkills,
        Self::InventorySlots,
        Self::InventoryItems,
        Self::CharacterStats,
        Self::ArtifactStats,
        Self::CharacterInventory,
        Self::CharacterSkills,
    ];

    /// SQL table name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Tenants => "tenants",
            Self::Worlds => "worlds",
            Self::Traits => "traits",
            Self::Archetypes => "archetypes",
            Self::Locations => "locations",
            Self::Characters => "characters",
            Self::Artifacts => "artifacts",
            Self::Events => "events",
            Self::Factions => "factions",
            Self::Lore => "lores",
            Self::Stories => "stories",
            Self::Chapters => "chapters",
            Self::Scenes => "scenes",
            Self::Beats => "beats",
            Self::ContentBlocks => "content_blocks",
            Self::RpgSystems => "rpg_systems",
            Self::Skills => "rpg_skills",
            Self::RpgClasses => "rpg_classes",
            Self::ClassSkills => "rpg_class_skills",
            Self::InventorySlots => "inventory_slots",
            Self::InventoryItems => "inventory_items",
            Self::CharacterStats => "character_rpg_stats",
            Self::ArtifactStats => "artifact_rpg_stats",
            Self::CharacterInventory => "character_inventory",
            Self::CharacterSkills => "character_skills",
        }
    }

    /// Entity kind stored in the table, for kinds that can be relation
    /// endpoints or audit subjects.
    pub const fn entity_kind(self) -> Option<EntityKind> {
        match self {
            Self::Tenants => Some(EntityKind::Tenant),
            Self::Worlds => Some(EntityKind::World),
            Self::Traits => Some(EntityKind::Trait),
            Self::Archetypes => Some(EntityKind::Archetype),
            Self::Locations => Some(EntityKind::Location),
            Self::Characters => Some(EntityKind::Character),
            Self::Artifacts => Some(EntityKind::Artifact),
            Self::Events => Some(EntityKind::Event),
            Self::Factions => Some(EntityKind::Faction),
            Self::Lore => Some(EntityKind::Lore),
            Self::Stories => Some(EntityKind::Story),
            Self::Chapters => Some(EntityKind::Chapter),
            Self::Scenes => Some(EntityKind::Scene),
            Self::Beats => Some(EntityKind::Beat),
            Self::ContentBlocks => Some(EntityKind::ContentBlock),
            Self::RpgSystems => Some(EntityKind::RpgSystem),
            Self::Skills => Some(EntityKind::RpgSkill),
            Self::RpgClasses => Some(EntityKind::RpgClass),
            Self::InventoryItems => Some(EntityKind::InventoryItem),
            Self::CharacterStats => Some(EntityKind::CharacterStats),
            Self::ArtifactStats => Some(EntityKind::ArtifactStats),
            Self::ClassSkills
            | Self::InventorySlots
            | Self::CharacterInventory
            | Self::CharacterSkills => None,
        }
    }

    /// Table holding entities of `kind`.
    pub const fn for_kind(kind: EntityKind) -> Option<Self> {
        match kind {
            EntityKind::Tenant => Some(Self::Tenants),
            EntityKind::World => Some(Self::Worlds),
            EntityKind::Trait => Some(Self::Traits),
            EntityKind::Archetype => Some(Self::Archetypes),
            EntityKind::Location => Some(Self::Locations),
            EntityKind::Character => Some(Self::Characters),
            EntityKind::Artifact => Some(Self::Artifacts),
            EntityKind::Event => Some(Self::Events),
            EntityKind::Faction => Some(Self::Factions),
            EntityKind::Lore => Some(Self::Lore),
            EntityKind::Story => Some(Self::Stories),
            EntityKind::Chapter => Some(Self::Chapters),
            EntityKind::Scene => Some(Self::Scenes),
            EntityKind::Beat => Some(Self::Beats),
            EntityKind::ContentBlock => Some(Self::ContentBlocks),
            EntityKind::RpgSystem => Some(Self::RpgSystems),
            EntityKind::RpgSkill => Some(Self::Skills),
            EntityKind::RpgClass => Some(Self::RpgClasses),
            EntityKind::InventoryItem => Some(Self::InventoryItems),
            EntityKind::CharacterStats => Some(Self::CharacterStats),
            EntityKind::ArtifactStats => Some(Self::ArtifactStats),
            EntityKind::Relation => None,
        }
    }
}

impl core::fmt::Display for Table {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Documents and filters
// ---------------------------------------------------------------------------

/// A stored row: indexed key columns plus the serialized entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Primary key.
    pub id: Uuid,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Owning container (world, story, chapter, system, subject).
    pub scope_id: Option<Uuid>,
    /// Parent node for hierarchical kinds.
    pub parent_id: Option<Uuid>,
    /// Secondary lookup key (root story, cause event, linked item).
    pub ref_id: Option<Uuid>,
    /// Ordering key within the scope.
    pub sort_key: Option<f64>,
    /// The entity serialized as JSON.
    pub body: serde_json::Value,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Parent constraint of a [`Filter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParentFilter {
    /// No constraint.
    #[default]
    Any,
    /// Only rows without a parent.
    Root,
    /// Only direct children of the given row.
    Of(Uuid),
}

/// Key-column predicate for [`Transaction::list`].
///
/// Results are ordered by `sort_key` ascending (nulls last), then
/// `created_at`, then `id`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Filter {
    /// Required `scope_id`.
    pub scope_id: Option<Uuid>,
    /// Required parent.
    pub parent: ParentFilter,
    /// Required `ref_id`.
    pub ref_id: Option<Uuid>,
}

impl Filter {
    /// Every row of the tenant.
    pub const fn all() -> Self {
        Self {
            scope_id: None,
            parent: ParentFilter::Any,
            ref_id: None,
        }
    }

    /// Rows owned by `scope`.
    pub const fn scope(scope: Uuid) -> Self {
        Self {
            scope_id: Some(scope),
            parent: ParentFilter::Any,
            ref_id: None,
        }
    }

    /// Direct children of `parent`.
    pub const fn children_of(parent: Uuid) -> Self {
        Self {
            scope_id: None,
            parent: ParentFilter::Of(parent),
            ref_id: None,
        }
    }

    /// Rows whose `ref_id` is `reference`.
    pub const fn referencing(reference: Uuid) -> Self {
        Self {
            scope_id: None,
            parent: ParentFilter::Any,
            ref_id: Some(reference),
        }
    }

    /// Restrict to rows without a parent.
    #[must_use]
    pub const fn roots(mut self) -> Self {
        self.parent = ParentFilter::Root;
        self
    }

    /// Whether `doc` satisfies the predicate.
    pub fn matches(&self, doc: &Document) -> bool {
        let scope_ok = self.scope_id.is_none_or(|s| doc.scope_id == Some(s));
        let ref_ok = self.ref_id.is_none_or(|r| doc.ref_id == Some(r));
        let parent_ok = match self.parent {
            ParentFilter::Any => true,
            ParentFilter::Root => doc.parent_id.is_none(),
            ParentFilter::Of(p) => doc.parent_id == Some(p),
        };
        scope_ok && ref_ok && parent_ok
    }
}

/// Isolation level requested for a transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Isolation {
    /// Default level for single-row work.
    #[default]
    ReadCommitted,
    /// Required for multi-row invariants (moves, epochs, stats, clones).
    Serializable,
}

// ---------------------------------------------------------------------------
// Relation queries
// ---------------------------------------------------------------------------

/// Sort direction over `(created_at, id)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Oldest first.
    #[default]
    Asc,
    /// Newest first.
    Desc,
}

/// Position of a row in the `(created_at, id)` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorPosition {
    /// Row id.
    pub id: RelationId,
    /// Row creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Which edges a relation query starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationEndpoint {
    /// Edges leaving the entity.
    Source(EntityKind, Uuid),
    /// Edges arriving at the entity.
    Target(EntityKind, Uuid),
    /// Every edge of a world.
    World(WorldId),
}

/// Predicate and page window for [`Transaction::list_relations`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationQuery {
    /// Anchor of the query.
    pub endpoint: RelationEndpoint,
    /// The opposite endpoint, when only edges between two entities are wanted.
    pub counterpart: Option<(EntityKind, Uuid)>,
    /// Only edges with this label.
    pub relation_type: Option<String>,
    /// Drop the non-canonical row of mirrored pairs.
    pub exclude_mirrors: bool,
    /// Only rows strictly after this position in `direction` order.
    pub after: Option<CursorPosition>,
    /// Sort direction.
    pub direction: SortDirection,
    /// Maximum rows to return, `None` for all.
    pub limit: Option<u32>,
}

impl RelationQuery {
    /// Every edge anchored at `endpoint`, oldest first.
    pub const fn all(endpoint: RelationEndpoint) -> Self {
        Self {
            endpoint,
            counterpart: None,
            relation_type: None,
            exclude_mirrors: false,
            after: None,
            direction: SortDirection::Asc,
            limit: None,
        }
    }

    /// Whether `relation` satisfies every predicate except the window.
    pub fn matches(&self, relation: &EntityRelation) -> bool {
        let endpoint_ok = match self.endpoint {
            RelationEndpoint::Source(kind, id) => {
                relation.source_type == kind
                    && relation.source_id == id
                    && self
                        .counterpart
                        .is_none_or(|(k, i)| relation.target_type == k && relation.target_id == i)
            }
            RelationEndpoint::Target(kind, id) => {
                relation.target_type == kind
                    && relation.target_id == id
                    && self
                        .counterpart
                        .is_none_or(|(k, i)| relation.source_type == k && relation.source_id == i)
            }
            RelationEndpoint::World(world) => relation.world_id == world,
        };
        let type_ok = self
            .relation_type
            .as_deref()
            .is_none_or(|t| relation.relation_type == t);
        let mirror_ok = !self.exclude_mirrors || relation.is_canonical();
        let window_ok = self.after.is_none_or(|cursor| {
            let key = (relation.created_at, relation.id);
            let at = (cursor.created_at, cursor.id);
            match self.direction {
                SortDirection::Asc => key > at,
                SortDirection::Desc => key < at,
            }
        });
        endpoint_ok && type_ok && mirror_ok && window_ok
    }
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

/// A source of transactions over the shared relational store.
#[async_trait]
pub trait Store: Send + Sync {
    /// Open a transaction at the requested isolation level.
    async fn begin(&self, isolation: Isolation) -> Result<Box<dyn Transaction>, StoreError>;

    /// Reachability check used by the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// A unit of work. Every method is tenant-qualified.
#[async_trait]
pub trait Transaction: Send {
    /// Fetch one document by id.
    async fn get(
        &mut self,
        table: Table,
        tenant: TenantId,
        id: Uuid,
    ) -> Result<Option<Document>, StoreError>;

    /// List documents matching `filter`.
    async fn list(
        &mut self,
        table: Table,
        tenant: TenantId,
        filter: Filter,
    ) -> Result<Vec<Document>, StoreError>;

    /// Insert a new document.
    async fn insert(&mut self, table: Table, doc: &Document) -> Result<(), StoreError>;

    /// Replace an existing document. Returns `false` when no row matched.
    async fn update(&mut self, table: Table, doc: &Document) -> Result<bool, StoreError>;

    /// Delete one document. Returns `false` when no row matched.
    async fn delete(&mut self, table: Table, tenant: TenantId, id: Uuid)
    -> Result<bool, StoreError>;

    /// Delete every document matching `filter`. Returns the row count.
    async fn delete_where(
        &mut self,
        table: Table,
        tenant: TenantId,
        filter: Filter,
    ) -> Result<u64, StoreError>;

    /// Insert a relation edge.
    async fn insert_relation(&mut self, relation: &EntityRelation) -> Result<(), StoreError>;

    /// Fetch one relation edge.
    async fn get_relation(
        &mut self,
        tenant: TenantId,
        id: RelationId,
    ) -> Result<Option<EntityRelation>, StoreError>;

    /// Replace a relation edge. Returns `false` when no row matched.
    async fn update_relation(&mut self, relation: &EntityRelation) -> Result<bool, StoreError>;

    /// Delete one relation edge. Returns `false` when no row matched.
    async fn delete_relation(&mut self, tenant: TenantId, id: RelationId)
    -> Result<bool, StoreError>;

    /// List relation edges ordered by `(created_at, id)` in `query.direction`.
    async fn list_relations(
        &mut self,
        tenant: TenantId,
        query: &RelationQuery,
    ) -> Result<Vec<EntityRelation>, StoreError>;

    /// Delete every edge with `(kind, id)` as source or target.
    async fn delete_relations_touching(
        &mut self,
        tenant: TenantId,
        kind: EntityKind,
        id: Uuid,
    ) -> Result<u64, StoreError>;

    /// Make every write of the transaction durable.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
