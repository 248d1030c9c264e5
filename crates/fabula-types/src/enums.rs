//! Enumeration types for the story engine.
//!
//! Every enum serializes as its `snake_case` wire name and can be parsed
//! back from that name with [`core::str::FromStr`], which is how the HTTP
//! and gRPC layers turn path segments and string fields into typed values.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Error returned when a string does not name a variant of an enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    /// Name of the enum that was being parsed.
    pub enum_name: &'static str,
    /// The rejected input.
    pub value: String,
}

impl core::fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "invalid {}: {:?}", self.enum_name, self.value)
    }
}

impl std::error::Error for ParseEnumError {}

/// Implements `as_str`, `Display`, `FromStr` and `ALL` for a fieldless enum.
macro_rules! wire_names {
    ($name:ident, $label:literal { $($variant:ident => $wire:literal),+ $(,)? }) => {
        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The wire name of this variant.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl core::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok(Self::$variant),)+
                    other => Err(ParseEnumError {
                        enum_name: $label,
                        value: other.to_owned(),
                    }),
                }
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Entity kinds
// ---------------------------------------------------------------------------

/// Kind of an addressable entity.
///
/// Used as the `source_type` / `target_type` of relation edges, as the
/// `entity_type` of audit entries and as the source type of ingestion
/// queue items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum EntityKind {
    /// A tenant.
    Tenant,
    /// A world.
    World,
    /// A character.
    Character,
    /// A location.
    Location,
    /// An artifact.
    Artifact,
    /// A world event.
    Event,
    /// A faction.
    Faction,
    /// A lore entry.
    Lore,
    /// A trait catalogue entry.
    Trait,
    /// An archetype.
    Archetype,
    /// A story version.
    Story,
    /// A chapter.
    Chapter,
    /// A scene.
    Scene,
    /// A beat.
    Beat,
    /// A content block.
    ContentBlock,
    /// An entity-relation edge.
    Relation,
    /// An RPG system.
    RpgSystem,
    /// An RPG skill.
    RpgSkill,
    /// An RPG class.
    RpgClass,
    /// An inventory item definition.
    InventoryItem,
    /// A character stats version.
    CharacterStats,
    /// An artifact stats version.
    ArtifactStats,
}

wire_names!(EntityKind, "entity kind" {
    Tenant => "tenant",
    World => "world",
    Character => "character",
    Location => "location",
    Artifact => "artifact",
    Event => "event",
    Faction => "faction",
    Lore => "lore",
    Trait => "trait",
    Archetype => "archetype",
    Story => "story",
    Chapter => "chapter",
    Scene => "scene",
    Beat => "beat",
    ContentBlock => "content_block",
    Relation => "relation",
    RpgSystem => "rpg_system",
    RpgSkill => "rpg_skill",
    RpgClass => "rpg_class",
    InventoryItem => "inventory_item",
    CharacterStats => "character_stats",
    ArtifactStats => "artifact_stats",
});

impl EntityKind {
    /// Whether entities of this kind are owned by exactly one world.
    pub const fn is_world_scoped(self) -> bool {
        matches!(
            self,
            Self::Character
                | Self::Location
                | Self::Artifact
                | Self::Event
                | Self::Faction
                | Self::Lore
        )
    }

    /// Whether entities of this kind form a parent/child tree.
    pub const fn is_hierarchical(self) -> bool {
        matches!(
            self,
            Self::Location | Self::Event | Self::Faction | Self::Lore
        )
    }

    /// Whether entities of this kind belong to a story.
    pub const fn is_story_scoped(self) -> bool {
        matches!(
            self,
            Self::Story | Self::Chapter | Self::Scene | Self::Beat | Self::ContentBlock
        )
    }

    /// Whether this kind may appear as an endpoint of a relation edge.
    pub const fn is_relatable(self) -> bool {
        self.is_world_scoped()
            || self.is_story_scoped()
            || matches!(
                self,
                Self::World
                    | Self::RpgSystem
                    | Self::RpgSkill
                    | Self::RpgClass
                    | Self::InventoryItem
            )
    }
}

// ---------------------------------------------------------------------------
// Tenancy and stories
// ---------------------------------------------------------------------------

/// Lifecycle state of a tenant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum TenantStatus {
    /// The tenant can read and write.
    #[default]
    Active,
    /// The tenant is suspended by an operator.
    Suspended,
}

wire_names!(TenantStatus, "tenant status" {
    Active => "active",
    Suspended => "suspended",
});

/// Publication state of a story or chapter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum StoryStatus {
    /// Work in progress.
    #[default]
    Draft,
    /// Released to readers.
    Published,
    /// Kept for reference only.
    Archived,
}

wire_names!(StoryStatus, "story status" {
    Draft => "draft",
    Published => "published",
    Archived => "archived",
});

/// Narrative function of a beat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum BeatType {
    /// Establishes context.
    Setup,
    /// Changes the direction of the scene.
    Turn,
    /// Discloses hidden information.
    Reveal,
    /// Opposition between forces.
    Conflict,
    /// Peak of tension.
    Climax,
    /// Tension released.
    Resolution,
    /// Pulls the reader forward.
    Hook,
    /// Connects two moments.
    Transition,
    /// Anything else.
    #[default]
    Other,
}

wire_names!(BeatType, "beat type" {
    Setup => "setup",
    Turn => "turn",
    Reveal => "reveal",
    Conflict => "conflict",
    Climax => "climax",
    Resolution => "resolution",
    Hook => "hook",
    Transition => "transition",
    Other => "other",
});

/// Kind of a content block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ContentKind {
    /// One-paragraph summary of the chapter.
    Synopsis,
    /// Structural plan of the chapter.
    Outline,
    /// Finished prose.
    Prose,
    /// Free-form author notes.
    Notes,
    /// Draft prose.
    Draft,
    /// An image reference.
    Image,
    /// A video reference.
    Video,
    /// An audio reference.
    Audio,
    /// Embedded third-party content.
    Embed,
    /// A hyperlink.
    Link,
}

wire_names!(ContentKind, "content kind" {
    Synopsis => "synopsis",
    Outline => "outline",
    Prose => "prose",
    Notes => "notes",
    Draft => "draft",
    Image => "image",
    Video => "video",
    Audio => "audio",
    Embed => "embed",
    Link => "link",
});

impl ContentKind {
    /// Kinds of which a chapter may hold at most one block.
    pub const fn is_singleton(self) -> bool {
        matches!(self, Self::Synopsis | Self::Outline)
    }

    /// Kinds whose content is text and carries a word count.
    pub const fn is_text(self) -> bool {
        matches!(
            self,
            Self::Synopsis | Self::Outline | Self::Prose | Self::Notes | Self::Draft
        )
    }
}

// ---------------------------------------------------------------------------
// RPG overlay
// ---------------------------------------------------------------------------

/// Category of an RPG skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum SkillCategory {
    /// Fighting techniques.
    Combat,
    /// Spellcraft.
    Magic,
    /// Always-on bonuses.
    Passive,
    /// Everything else.
    Utility,
}

wire_names!(SkillCategory, "skill category" {
    Combat => "combat",
    Magic => "magic",
    Passive => "passive",
    Utility => "utility",
});

/// Activation model of an RPG skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum SkillType {
    /// Triggered by the character.
    Active,
    /// Applies continuously.
    Passive,
    /// A cast spell.
    Spell,
    /// An innate ability.
    Ability,
}

wire_names!(SkillType, "skill type" {
    Active => "active",
    Passive => "passive",
    Spell => "spell",
    Ability => "ability",
});

/// Category of an inventory item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ItemCategory {
    /// Offensive equipment.
    Weapon,
    /// Defensive equipment.
    Armor,
    /// Used up on use.
    Consumable,
    /// Plot item.
    Quest,
    /// Anything else.
    Misc,
}

wire_names!(ItemCategory, "item category" {
    Weapon => "weapon",
    Armor => "armor",
    Consumable => "consumable",
    Quest => "quest",
    Misc => "misc",
});

/// Physical size class of an inventory item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ItemSize {
    /// Fits in a pocket.
    Tiny,
    /// Fits in one hand.
    Small,
    /// Needs both hands.
    #[default]
    Medium,
    /// Needs a pack animal.
    Large,
    /// Needs a wagon.
    Huge,
}

wire_names!(ItemSize, "item size" {
    Tiny => "tiny",
    Small => "small",
    Medium => "medium",
    Large => "large",
    Huge => "huge",
});

// ---------------------------------------------------------------------------
// Audit
// ---------------------------------------------------------------------------

/// Action recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum AuditAction {
    /// An entity was created.
    Create,
    /// An entity was modified.
    Update,
    /// An entity was removed.
    Delete,
    /// A story was cloned into a new version.
    Clone,
    /// A hierarchy node was re-parented.
    Move,
    /// A stats version was activated.
    Activate,
}

wire_names!(AuditAction, "audit action" {
    Create => "create",
    Update => "update",
    Delete => "delete",
    Clone => "clone",
    Move => "move",
    Activate => "activate",
});

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn entity_kind_wire_names_round_trip() {
        for kind in EntityKind::ALL {
            let parsed: EntityKind = kind.as_str().parse().unwrap();
            assert_eq!(parsed, *kind);
            let json = serde_json::to_string(kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = "dragon".parse::<EntityKind>().unwrap_err();
        assert_eq!(err.value, "dragon");
        assert_eq!(err.to_string(), "invalid entity kind: \"dragon\"");
    }

    #[test]
    fn scoping_predicates() {
        assert!(EntityKind::Location.is_hierarchical());
        assert!(EntityKind::Location.is_world_scoped());
        assert!(!EntityKind::Character.is_hierarchical());
        assert!(EntityKind::ContentBlock.is_story_scoped());
        assert!(EntityKind::ContentBlock.is_relatable());
        assert!(!EntityKind::Tenant.is_relatable());
        assert!(!EntityKind::World.is_world_scoped());
    }

    #[test]
    fn singleton_content_kinds() {
        assert!(ContentKind::Synopsis.is_singleton());
        assert!(ContentKind::Outline.is_singleton());
        assert!(!ContentKind::Prose.is_singleton());
        assert!(ContentKind::Prose.is_text());
        assert!(!ContentKind::Image.is_text());
    }
}
