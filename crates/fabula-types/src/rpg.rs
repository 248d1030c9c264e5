//! RPG overlay entities: systems, skills, classes, items and per-character
//! state, plus the versioned stats rows shared by characters and artifacts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::enums::{EntityKind, ItemCategory, ItemSize, SkillCategory, SkillType};
use crate::ids::{
    ArtifactId, CharacterId, CharacterSkillId, ClassSkillId, EventId, InventoryEntryId,
    InventoryItemId, InventorySlotId, RpgClassId, RpgSystemId, SkillId, StatsVersionId, TenantId,
};

/// A rules system. Built-in systems have no tenant and are visible to all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RpgSystem {
    /// Unique identifier.
    pub id: RpgSystemId,
    /// Owning tenant, `None` for built-in systems.
    pub tenant_id: Option<TenantId>,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Schema of the base stats payload (a JSON object).
    pub base_stats_schema: serde_json::Value,
    /// Schema of derived stats.
    pub derived_stats_schema: Option<serde_json::Value>,
    /// Schema of progression data.
    pub progression_schema: Option<serde_json::Value>,
    /// Whether the system ships with the engine.
    pub is_builtin: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A skill defined by an RPG system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Skill {
    /// Unique identifier.
    pub id: SkillId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Defining system.
    pub rpg_system_id: RpgSystemId,
    /// Display name.
    pub name: String,
    /// Skill category.
    pub category: SkillCategory,
    /// Activation model.
    #[serde(rename = "type")]
    pub skill_type: SkillType,
    /// Optional description.
    pub description: Option<String>,
    /// Prerequisites (a JSON array of skill ids or conditions).
    pub prerequisites: serde_json::Value,
    /// Highest attainable rank, at least 1.
    pub max_rank: u32,
    /// Schema of the skill's effects.
    pub effects_schema: Option<serde_json::Value>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A character class. Classes evolve through `parent_class_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RpgClass {
    /// Unique identifier.
    pub id: RpgClassId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Defining system.
    pub rpg_system_id: RpgSystemId,
    /// Class this one evolves from.
    pub parent_class_id: Option<RpgClassId>,
    /// Display name.
    pub name: String,
    /// Tier in `1..=3`.
    pub tier: u8,
    /// Optional description.
    pub description: Option<String>,
    /// Requirements to enter the class.
    pub requirements: serde_json::Value,
    /// Stat bonuses granted by the class.
    pub stat_bonuses: serde_json::Value,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A skill granted by a class from a given level on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ClassSkill {
    /// Unique identifier.
    pub id: ClassSkillId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Granting class.
    pub class_id: RpgClassId,
    /// Granted skill.
    pub skill_id: SkillId,
    /// Class level at which the skill unlocks, at least 1.
    pub unlock_level: u32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// An equipment slot defined by a system ("head", "main_hand").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct InventorySlot {
    /// Unique identifier.
    pub id: InventorySlotId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Defining system.
    pub rpg_system_id: RpgSystemId,
    /// Display name.
    pub name: String,
    /// Free-form slot type ("equipment", "bag").
    pub slot_type: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// An item definition. May be backed by a world artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct InventoryItem {
    /// Unique identifier.
    pub id: InventoryItemId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Defining system.
    pub rpg_system_id: RpgSystemId,
    /// Backing artifact.
    pub artifact_id: Option<ArtifactId>,
    /// Display name.
    pub name: String,
    /// Item category.
    pub category: ItemCategory,
    /// Optional description.
    pub description: Option<String>,
    /// Inventory slots one unit occupies, at least 1.
    pub slots_required: u32,
    /// Weight of one unit.
    pub weight: Option<f64>,
    /// Size class.
    pub size: ItemSize,
    /// Units per stack, at least 1.
    pub max_stack: u32,
    /// Names of slots the item can be equipped in.
    pub equip_slots: Vec<String>,
    /// Requirements to use the item.
    pub requirements: serde_json::Value,
    /// Item stats.
    pub item_stats: serde_json::Value,
    /// Whether the item is a template for generated items.
    pub is_template: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// One version in a subject's stats chain.
///
/// The subject is a character or an artifact. Versions of a subject are
/// numbered `1..=n` and exactly one of them is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StatsVersion {
    /// Unique identifier.
    pub id: StatsVersionId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Kind of the subject (`character` or `artifact`).
    pub subject_type: EntityKind,
    /// Id of the subject.
    pub subject_id: Uuid,
    /// Event that caused this version.
    pub event_id: Option<EventId>,
    /// Base stats payload.
    pub base_stats: serde_json::Value,
    /// Derived stats payload.
    pub derived_stats: Option<serde_json::Value>,
    /// Progression payload.
    pub progression: Option<serde_json::Value>,
    /// Whether this is the applied version.
    pub is_active: bool,
    /// Position in the chain, starting at 1.
    pub version: u32,
    /// Why the stats changed.
    pub reason: Option<String>,
    /// Free-form timeline tag.
    pub timeline: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A stack of items in a character's inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct InventoryEntry {
    /// Unique identifier.
    pub id: InventoryEntryId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Owning character.
    pub character_id: CharacterId,
    /// Item definition.
    pub item_id: InventoryItemId,
    /// Units in the stack, at least 1.
    pub quantity: u32,
    /// Slot the stack occupies.
    pub slot_id: Option<InventorySlotId>,
    /// Whether the stack is equipped.
    pub is_equipped: bool,
    /// Name override.
    pub custom_name: Option<String>,
    /// Stats override.
    pub custom_stats: Option<serde_json::Value>,
    /// When the character acquired the stack.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A character's progress in a skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CharacterSkill {
    /// Unique identifier.
    pub id: CharacterSkillId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Owning character.
    pub character_id: CharacterId,
    /// Skill learned.
    pub skill_id: SkillId,
    /// Current rank, at most the skill's `max_rank`.
    pub rank: u32,
    /// Experience accumulated in the skill.
    pub xp_in_skill: u64,
    /// Whether the skill is currently usable.
    pub is_active: bool,
    /// When the skill was learned.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}
