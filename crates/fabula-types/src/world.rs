//! Tenancy and world-building entities.
//!
//! A tenant owns worlds and a catalogue of traits and archetypes. A world
//! owns characters, artifacts and four hierarchical kinds: locations,
//! events, factions and lore. Hierarchical entities store their parent and
//! a denormalized `hierarchy_level` (0 at roots).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::TenantStatus;
use crate::ids::{
    ArchetypeId, ArtifactId, CharacterId, EventId, FactionId, LocationId, LoreId, RpgClassId,
    RpgSystemId, TenantId, TraitId, WorldId,
};

// ---------------------------------------------------------------------------
// Tenant
// ---------------------------------------------------------------------------

/// Top-level isolation unit. Every other row carries a tenant id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Tenant {
    /// Unique identifier.
    pub id: TenantId,
    /// Display name, unique across tenants.
    pub name: String,
    /// Lifecycle state.
    pub status: TenantStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// A fictional universe within a tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct World {
    /// Unique identifier.
    pub id: WorldId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Display name.
    pub name: String,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Optional genre tag.
    pub genre: Option<String>,
    /// True when the world was materialised as a by-product of story creation.
    pub is_implicit: bool,
    /// RPG system whose schemas validate stats payloads in this world.
    pub rpg_system_id: Option<RpgSystemId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Traits and archetypes
// ---------------------------------------------------------------------------

/// Catalogue entry describing a character trait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Trait {
    /// Unique identifier.
    pub id: TraitId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Name, unique within the tenant.
    pub name: String,
    /// Free-form category ("personality", "physical", ...).
    pub category: Option<String>,
    /// Description of the trait.
    pub description: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A trait bundled into an archetype with its default value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ArchetypeTrait {
    /// The referenced trait.
    pub trait_id: TraitId,
    /// Value copied onto characters created from the archetype.
    pub default_value: String,
}

/// Tenant-scoped named bundle of traits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Archetype {
    /// Unique identifier.
    pub id: ArchetypeId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Bundled traits in insertion order.
    pub traits: Vec<ArchetypeTrait>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Characters and artifacts
// ---------------------------------------------------------------------------

/// Trait instance owned by a character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CharacterTrait {
    /// The referenced catalogue trait.
    pub trait_id: TraitId,
    /// Trait name captured when the instance was attached.
    pub trait_name: String,
    /// Free-form value ("high", "7", "left-handed").
    pub value: String,
    /// Optional author notes.
    pub notes: Option<String>,
}

/// A character living in a world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Character {
    /// Unique identifier.
    pub id: CharacterId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Owning world.
    pub world_id: WorldId,
    /// Archetype the character was created from.
    pub archetype_id: Option<ArchetypeId>,
    /// Current RPG class.
    pub current_class_id: Option<RpgClassId>,
    /// Level within the current class.
    pub class_level: u32,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Attached trait instances.
    pub traits: Vec<CharacterTrait>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// An object of narrative significance. Ownership and whereabouts are
/// expressed as relations, never as columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Artifact {
    /// Unique identifier.
    pub id: ArtifactId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Owning world.
    pub world_id: WorldId,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Rarity tag ("common", "legendary", ...).
    pub rarity: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Hierarchical entities
// ---------------------------------------------------------------------------

/// A place. Locations nest (continent > region > city > tavern).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Location {
    /// Unique identifier.
    pub id: LocationId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Owning world.
    pub world_id: WorldId,
    /// Enclosing location, `None` for roots.
    pub parent_id: Option<LocationId>,
    /// Display name.
    pub name: String,
    /// Free-form type ("city", "forest").
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Optional description.
    pub description: Option<String>,
    /// Depth in the tree, 0 at roots.
    pub hierarchy_level: u32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Something that happened in a world. The parent event is the cause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Event {
    /// Unique identifier.
    pub id: EventId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Owning world.
    pub world_id: WorldId,
    /// Causing event, `None` for roots.
    pub parent_id: Option<EventId>,
    /// Display name.
    pub name: String,
    /// Free-form type ("battle", "birth").
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Optional description.
    pub description: Option<String>,
    /// Free-form timeline label ("Year 3 of the Long Winter").
    pub timeline: Option<String>,
    /// Importance on a 1..=10 scale.
    pub importance: u8,
    /// Depth in the causality tree, 0 at roots.
    pub hierarchy_level: u32,
    /// Absolute position on the world's timeline.
    pub timeline_position: Option<f64>,
    /// Whether this event is the world's time-zero anchor.
    pub is_epoch: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// An organisation. Factions nest (empire > legion > cohort).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Faction {
    /// Unique identifier.
    pub id: FactionId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Owning world.
    pub world_id: WorldId,
    /// Parent faction, `None` for roots.
    pub parent_id: Option<FactionId>,
    /// Display name.
    pub name: String,
    /// Free-form type ("guild", "cult").
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Optional description.
    pub description: Option<String>,
    /// What the faction believes.
    pub beliefs: Option<String>,
    /// How the faction is organised.
    pub structure: Option<String>,
    /// Banners, sigils and colours.
    pub symbols: Option<String>,
    /// Depth in the tree, 0 at roots.
    pub hierarchy_level: u32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A piece of world lore (a magic system, a religion, a law of nature).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Lore {
    /// Unique identifier.
    pub id: LoreId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Owning world.
    pub world_id: WorldId,
    /// Parent lore entry, `None` for roots.
    pub parent_id: Option<LoreId>,
    /// Display name.
    pub name: String,
    /// Free-form category.
    pub category: Option<String>,
    /// Optional description.
    pub description: Option<String>,
    /// Rules the lore imposes.
    pub rules: Option<String>,
    /// Known limitations.
    pub limitations: Option<String>,
    /// Prerequisites for using it.
    pub requirements: Option<String>,
    /// Depth in the tree, 0 at roots.
    pub hierarchy_level: u32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}
