//! Use-case services.
//!
//! Every write follows the same shape: validate the input, open a
//! transaction bound to the caller's tenant, load what the write depends
//! on, check invariants, persist, commit, then fan out to the audit sink
//! and the ingestion queue. Reads open a read-committed transaction and
//! drop it.
//!
//! A service never holds two transactions at once.
//!
//! # Modules
//!
//! - [`tenant`] -- Tenant registry
//! - [`world`] -- Worlds
//! - [`catalog`] -- Traits and archetypes
//! - [`character`] -- Characters and their trait instances
//! - [`artifact`] -- Artifacts
//! - [`tree`] -- Locations, factions, lore and events on the hierarchy engine
//! - [`timeline`] -- Event epoch and timeline queries
//! - [`relation`] -- The relation graph
//! - [`reference`] -- Per-owner reference adapters over the graph
//! - [`story`] -- Stories, cloning and the version graph
//! - [`content`] -- Chapters, scenes, beats and content blocks
//! - [`rpg`] -- RPG systems, skills, classes, slots and items
//! - [`progression`] -- Character inventories and skills
//! - [`stats`] -- Versioned character and artifact stats

pub mod artifact;
pub mod catalog;
pub mod character;
pub mod content;
pub mod progression;
pub mod reference;
pub mod relation;
pub mod rpg;
pub mod stats;
pub mod story;
pub mod tenant;
pub mod timeline;
pub mod tree;
pub mod world;

use std::sync::Arc;

use fabula_types::{Tenant, TenantId};

use crate::error::CoreError;
use crate::side_channel::{IngestionQueue, SideChannels};
use crate::store::{Isolation, Store, Table, Tx};
use crate::tenant::TenantContext;

pub use artifact::ArtifactService;
pub use catalog::{ArchetypeService, TraitService};
pub use character::CharacterService;
pub use content::{BeatService, ChapterService, ContentBlockService, SceneService};
pub use progression::{CharacterSkillService, InventoryService};
pub use reference::{GraphReferences, ReferenceAdapter};
pub use relation::RelationService;
pub use rpg::{RpgClassService, RpgSystemService, SkillService};
pub use stats::{ArtifactStatsService, CharacterStatsService, StatsService};
pub use story::StoryService;
pub use tenant::TenantService;
pub use tree::{EventService, FactionService, LocationService, LoreService, TreeService};
pub use world::WorldService;

/// Collaborators every service needs.
#[derive(Clone)]
pub struct Deps {
    /// Shared relational store.
    pub store: Arc<dyn Store>,
    /// Audit sink and ingestion queue.
    pub side: Arc<SideChannels>,
}

impl Deps {
    /// Bundle a store and side channels.
    pub fn new(store: Arc<dyn Store>, side: Arc<SideChannels>) -> Self {
        Self { store, side }
    }

    /// Open a transaction for `ctx`.
    pub async fn begin(&self, ctx: &TenantContext, isolation: Isolation) -> Result<Tx, CoreError> {
        Tx::begin(self.store.as_ref(), ctx, isolation).await
    }

    /// Open a read-committed transaction for `ctx`.
    pub async fn open(&self, ctx: &TenantContext) -> Result<Tx, CoreError> {
        self.begin(ctx, Isolation::ReadCommitted).await
    }
}

impl core::fmt::Debug for Deps {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Deps").field("side", &self.side).finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Shared validation
// ---------------------------------------------------------------------------

/// Trim `value` and reject it when empty.
pub(crate) fn required(field: &'static str, value: &str) -> Result<String, CoreError> {
    let value = value.trim();
    if value.is_empty() {
        Err(CoreError::validation(field, format!("{field} is required")))
    } else {
        Ok(value.to_owned())
    }
}

/// Drop blank optional strings.
pub(crate) fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Reject `value` unless it lies in `min..=max`.
pub(crate) fn bounded<T>(field: &'static str, value: T, min: T, max: T) -> Result<T, CoreError>
where
    T: PartialOrd + core::fmt::Display + Copy,
{
    if value < min || value > max {
        Err(CoreError::validation(
            field,
            format!("{field} must be between {min} and {max}"),
        ))
    } else {
        Ok(value)
    }
}

/// Reject a JSON value that is not an object.
pub(crate) fn json_object(
    field: &'static str,
    value: &serde_json::Value,
) -> Result<(), CoreError> {
    if value.is_object() {
        Ok(())
    } else {
        Err(CoreError::validation(
            field,
            format!("{field} must be a JSON object"),
        ))
    }
}

/// Fail with `NotFound` unless the transaction's tenant is registered.
pub(crate) async fn require_tenant(tx: &mut Tx) -> Result<Tenant, CoreError> {
    let tenant = tx.tenant();
    tx.find_in::<Tenant>(Table::Tenants, TenantId::BUILTIN, tenant.into_inner())
        .await?
        .ok_or_else(|| CoreError::not_found("tenant", tenant))
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Every service wired to one store and one set of side channels.
#[derive(Debug, Clone)]
pub struct Engine {
    deps: Deps,
    /// Tenant registry.
    pub tenants: TenantService,
    /// Worlds.
    pub worlds: WorldService,
    /// Trait catalogue.
    pub traits: TraitService,
    /// Archetypes.
    pub archetypes: ArchetypeService,
    /// Characters.
    pub characters: CharacterService,
    /// Artifacts.
    pub artifacts: ArtifactService,
    /// Locations.
    pub locations: LocationService,
    /// Events, including epoch and timeline.
    pub events: EventService,
    /// Factions.
    pub factions: FactionService,
    /// Lore.
    pub lore: LoreService,
    /// Relation graph.
    pub relations: RelationService,
    /// Reference adapters over the graph.
    pub references: GraphReferences,
    /// Stories, clones and version graphs.
    pub stories: StoryService,
    /// Chapters.
    pub chapters: ChapterService,
    /// Scenes.
    pub scenes: SceneService,
    /// Beats.
    pub beats: BeatService,
    /// Content blocks.
    pub content_blocks: ContentBlockService,
    /// RPG systems.
    pub rpg_systems: RpgSystemService,
    /// RPG skills.
    pub skills: SkillService,
    /// RPG classes.
    pub classes: RpgClassService,
    /// Inventory slots, items and character inventories.
    pub inventory: InventoryService,
    /// Character skills.
    pub character_skills: CharacterSkillService,
    /// Character stats chains.
    pub character_stats: CharacterStatsService,
    /// Artifact stats chains.
    pub artifact_stats: ArtifactStatsService,
}

impl Engine {
    /// Wire every service to `store` and `side`.
    pub fn new(store: Arc<dyn Store>, side: Arc<SideChannels>) -> Self {
        let deps = Deps::new(store, side);
        Self {
            tenants: TenantService::new(deps.clone()),
            worlds: WorldService::new(deps.clone()),
            traits: TraitService::new(deps.clone()),
            archetypes: ArchetypeService::new(deps.clone()),
            characters: CharacterService::new(deps.clone()),
            artifacts: ArtifactService::new(deps.clone()),
            locations: LocationService::new(deps.clone()),
            events: EventService::new(deps.clone()),
            factions: FactionService::new(deps.clone()),
            lore: LoreService::new(deps.clone()),
            relations: RelationService::new(deps.clone()),
            references: GraphReferences::new(deps.clone()),
            stories: StoryService::new(deps.clone()),
            chapters: ChapterService::new(deps.clone()),
            scenes: SceneService::new(deps.clone()),
            beats: BeatService::new(deps.clone()),
            content_blocks: ContentBlockService::new(deps.clone()),
            rpg_systems: RpgSystemService::new(deps.clone()),
            skills: SkillService::new(deps.clone()),
            classes: RpgClassService::new(deps.clone()),
            inventory: InventoryService::new(deps.clone()),
            character_skills: CharacterSkillService::new(deps.clone()),
            character_stats: StatsService::new(deps.clone()),
            artifact_stats: StatsService::new(deps.clone()),
            deps,
        }
    }

    /// Install (or clear) the ingestion queue on every service.
    pub fn set_ingestion_queue(&self, queue: Option<Arc<dyn IngestionQueue>>) {
        self.deps.side.set_ingestion_queue(queue);
    }

    /// Store reachability check.
    pub async fn ping(&self) -> Result<(), CoreError> {
        self.deps.store.ping().await?;
        Ok(())
    }
}
