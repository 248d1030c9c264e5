//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Every entity in the story engine has a strongly-typed ID so that a
//! chapter id can never be handed to a call expecting a scene id. All IDs
//! are generated application-side as UUID v7 (time-ordered), which keeps
//! b-tree indexes on `id` append-friendly.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
        )]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Identifier of a tenant, the top-level isolation unit.
    TenantId
}

impl TenantId {
    /// Reserved slot for system-owned rows: the tenant registry itself and
    /// the built-in RPG systems every tenant can read.
    pub const BUILTIN: Self = Self(Uuid::nil());

    /// Fixed tenant bound by the offline single-tenant runtime.
    pub const OFFLINE_DEFAULT: Self = Self(Uuid::from_u128(1));
}

define_id! {
    /// Identifier of a user acting on behalf of a tenant.
    UserId
}

define_id! {
    /// Identifier of a world (a fictional universe).
    WorldId
}

define_id! {
    /// Identifier of a trait catalogue entry.
    TraitId
}

define_id! {
    /// Identifier of an archetype (a named bundle of traits).
    ArchetypeId
}

define_id! {
    /// Identifier of a location node.
    LocationId
}

define_id! {
    /// Identifier of a character.
    CharacterId
}

define_id! {
    /// Identifier of an artifact.
    ArtifactId
}

define_id! {
    /// Identifier of a world event.
    EventId
}

define_id! {
    /// Identifier of a faction node.
    FactionId
}

define_id! {
    /// Identifier of a lore node.
    LoreId
}

define_id! {
    /// Identifier of a story version.
    StoryId
}

define_id! {
    /// Identifier of a chapter.
    ChapterId
}

define_id! {
    /// Identifier of a scene.
    SceneId
}

define_id! {
    /// Identifier of a beat.
    BeatId
}

define_id! {
    /// Identifier of a content block.
    ContentBlockId
}

define_id! {
    /// Identifier of an entity-relation edge.
    RelationId
}

define_id! {
    /// Identifier of an RPG system.
    RpgSystemId
}

define_id! {
    /// Identifier of an RPG skill.
    SkillId
}

define_id! {
    /// Identifier of an RPG class.
    RpgClassId
}

define_id! {
    /// Identifier of a class-skill link.
    ClassSkillId
}

define_id! {
    /// Identifier of an inventory slot definition.
    InventorySlotId
}

define_id! {
    /// Identifier of an inventory item definition.
    InventoryItemId
}

define_id! {
    /// Identifier of one version row in a stats chain.
    StatsVersionId
}

define_id! {
    /// Identifier of a stack in a character's inventory.
    InventoryEntryId
}

define_id! {
    /// Identifier of a character's skill state.
    CharacterSkillId
}

define_id! {
    /// Identifier of an audit log entry.
    AuditEntryId
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_time_ordered() {
        let a = WorldId::new();
        let b = WorldId::new();
        assert!(a <= b);
    }

    #[test]
    fn ids_serialize_transparently() {
        let raw = Uuid::from_u128(42);
        let id = StoryId::from(raw);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{raw}\""));
    }

    #[test]
    fn reserved_tenants_are_distinct() {
        assert_ne!(TenantId::BUILTIN, TenantId::OFFLINE_DEFAULT);
        assert_eq!(
            TenantId::OFFLINE_DEFAULT.to_string(),
            "00000000-0000-0000-0000-000000000001"
        );
    }
}
