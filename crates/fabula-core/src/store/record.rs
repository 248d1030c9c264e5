//! Mapping of entity structs onto [`Document`] rows.

use chrono::{DateTime, Utc};
use fabula_types::{
    Archetype, Artifact, Beat, Chapter, Character, CharacterSkill, ClassSkill, ContentBlock, Event,
    Faction, InventoryEntry, InventoryItem, InventorySlot, Location, Lore, RpgClass, RpgSystem,
    Scene, Skill, StatsVersion, Story, Tenant, TenantId, Trait, World,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::{Document, Table};
use crate::error::StoreError;

/// An entity persisted as a [`Document`].
///
/// The key-column accessors default to `None`; each impl fills in the
/// columns its queries need.
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Home table.
    const TABLE: Table;
    /// Resource name used in error messages.
    const RESOURCE: &'static str;

    /// Primary key.
    fn id(&self) -> Uuid;
    /// Owning tenant.
    fn tenant_id(&self) -> TenantId;
    /// Creation timestamp.
    fn created_at(&self) -> DateTime<Utc>;
    /// Last update timestamp.
    fn updated_at(&self) -> DateTime<Utc>;

    /// Owning container.
    fn scope_id(&self) -> Option<Uuid> {
        None
    }

    /// Parent node.
    fn parent_id(&self) -> Option<Uuid> {
        None
    }

    /// Secondary lookup key.
    fn ref_id(&self) -> Option<Uuid> {
        None
    }

    /// Ordering key within the scope.
    fn sort_key(&self) -> Option<f64> {
        None
    }

    /// Serialize into a row.
    fn to_document(&self) -> Result<Document, StoreError> {
        Ok(Document {
            id: self.id(),
            tenant_id: self.tenant_id(),
            scope_id: self.scope_id(),
            parent_id: self.parent_id(),
            ref_id: self.ref_id(),
            sort_key: self.sort_key(),
            body: serde_json::to_value(self)?,
            created_at: self.created_at(),
            updated_at: self.updated_at(),
        })
    }

    /// Deserialize from a row.
    fn from_document(doc: Document) -> Result<Self, StoreError> {
        Ok(serde_json::from_value(doc.body)?)
    }
}

/// Implements the accessors every tenant-owned entity shares.
macro_rules! record {
    ($ty:ty => $table:ident, $resource:literal { $($extra:tt)* }) => {
        impl Record for $ty {
            const TABLE: Table = Table::$table;
            const RESOURCE: &'static str = $resource;

            fn id(&self) -> Uuid {
                self.id.into_inner()
            }

            fn tenant_id(&self) -> TenantId {
                self.tenant_id
            }

            fn created_at(&self) -> DateTime<Utc> {
                self.created_at
            }

            fn updated_at(&self) -> DateTime<Utc> {
                self.updated_at
            }

            $($extra)*
        }
    };
}

impl Record for Tenant {
    const TABLE: Table = Table::Tenants;
    const RESOURCE: &'static str = "tenant";

    fn id(&self) -> Uuid {
        self.id.into_inner()
    }

    /// The tenant registry lives in the reserved system slot.
    fn tenant_id(&self) -> TenantId {
        TenantId::BUILTIN
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

record!(World => Worlds, "world" {});
record!(Trait => Traits, "trait" {});
record!(Archetype => Archetypes, "archetype" {});

record!(Location => Locations, "location" {
    fn scope_id(&self) -> Option<Uuid> {
        Some(self.world_id.into_inner())
    }

    fn parent_id(&self) -> Option<Uuid> {
        self.parent_id.map(Into::into)
    }
});

record!(Character => Characters, "character" {
    fn scope_id(&self) -> Option<Uuid> {
        Some(self.world_id.into_inner())
    }

    fn ref_id(&self) -> Option<Uuid> {
        self.current_class_id.map(Into::into)
    }
});

record!(Artifact => Artifacts, "artifact" {
    fn scope_id(&self) -> Option<Uuid> {
        Some(self.world_id.into_inner())
    }
});

record!(Event => Events, "event" {
    fn scope_id(&self) -> Option<Uuid> {
        Some(self.world_id.into_inner())
    }

    fn parent_id(&self) -> Option<Uuid> {
        self.parent_id.map(Into::into)
    }

    fn sort_key(&self) -> Option<f64> {
        self.timeline_position
    }
});

record!(Faction => Factions, "faction" {
    fn scope_id(&self) -> Option<Uuid> {
        Some(self.world_id.into_inner())
    }

    fn parent_id(&self) -> Option<Uuid> {
        self.parent_id.map(Into::into)
    }
});

record!(Lore => Lore, "lore" {
    fn scope_id(&self) -> Option<Uuid> {
        Some(self.world_id.into_inner())
    }

    fn parent_id(&self) -> Option<Uuid> {
        self.parent_id.map(Into::into)
    }
});

record!(Story => Stories, "story" {
    fn scope_id(&self) -> Option<Uuid> {
        self.world_id.map(Into::into)
    }

    fn parent_id(&self) -> Option<Uuid> {
        self.previous_story_id.map(Into::into)
    }

    fn ref_id(&self) -> Option<Uuid> {
        Some(self.root_story_id.into_inner())
    }

    fn sort_key(&self) -> Option<f64> {
        Some(f64::from(self.version_number))
    }
});

record!(Chapter => Chapters, "chapter" {
    fn scope_id(&self) -> Option<Uuid> {
        Some(self.story_id.into_inner())
    }

    fn sort_key(&self) -> Option<f64> {
        Some(f64::from(self.number))
    }
});

record!(Scene => Scenes, "scene" {
    fn scope_id(&self) -> Option<Uuid> {
        self.chapter_id.map(Into::into)
    }

    fn ref_id(&self) -> Option<Uuid> {
        Some(self.story_id.into_inner())
    }

    fn sort_key(&self) -> Option<f64> {
        Some(f64::from(self.order_num))
    }
});

record!(Beat => Beats, "beat" {
    fn scope_id(&self) -> Option<Uuid> {
        Some(self.scene_id.into_inner())
    }

    fn sort_key(&self) -> Option<f64> {
        Some(f64::from(self.order_num))
    }
});

record!(ContentBlock => ContentBlocks, "content block" {
    fn scope_id(&self) -> Option<Uuid> {
        Some(self.chapter_id.into_inner())
    }

    fn sort_key(&self) -> Option<f64> {
        Some(f64::from(self.order_num))
    }
});

impl Record for RpgSystem {
    const TABLE: Table = Table::RpgSystems;
    const RESOURCE: &'static str = "rpg system";

    fn id(&self) -> Uuid {
        self.id.into_inner()
    }

    /// Built-in systems live in the reserved [`TenantId::BUILTIN`] slot.
    fn tenant_id(&self) -> TenantId {
        self.tenant_id.unwrap_or(TenantId::BUILTIN)
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

record!(Skill => Skills, "rpg skill" {
    fn scope_id(&self) -> Option<Uuid> {
        Some(self.rpg_system_id.into_inner())
    }
});

record!(RpgClass => RpgClasses, "rpg class" {
    fn scope_id(&self) -> Option<Uuid> {
        Some(self.rpg_system_id.into_inner())
    }

    fn parent_id(&self) -> Option<Uuid> {
        self.parent_class_id.map(Into::into)
    }

    fn sort_key(&self) -> Option<f64> {
        Some(f64::from(self.tier))
    }
});

record!(ClassSkill => ClassSkills, "class skill" {
    fn scope_id(&self) -> Option<Uuid> {
        Some(self.class_id.into_inner())
    }

    fn ref_id(&self) -> Option<Uuid> {
        Some(self.skill_id.into_inner())
    }

    fn sort_key(&self) -> Option<f64> {
        Some(f64::from(self.unlock_level))
    }
});

record!(InventorySlot => InventorySlots, "inventory slot" {
    fn scope_id(&self) -> Option<Uuid> {
        Some(self.rpg_system_id.into_inner())
    }
});

record!(InventoryItem => InventoryItems, "inventory item" {
    fn scope_id(&self) -> Option<Uuid> {
        Some(self.rpg_system_id.into_inner())
    }

    fn ref_id(&self) -> Option<Uuid> {
        self.artifact_id.map(Into::into)
    }
});

// Stats rows default to the character table; the stats engine routes
// artifact chains to `Table::ArtifactStats` explicitly.
record!(StatsVersion => CharacterStats, "rpg stats" {
    fn scope_id(&self) -> Option<Uuid> {
        Some(self.subject_id)
    }

    fn ref_id(&self) -> Option<Uuid> {
        self.event_id.map(Into::into)
    }

    fn sort_key(&self) -> Option<f64> {
        Some(f64::from(self.version))
    }
});

record!(InventoryEntry => CharacterInventory, "inventory entry" {
    fn scope_id(&self) -> Option<Uuid> {
        Some(self.character_id.into_inner())
    }

    fn ref_id(&self) -> Option<Uuid> {
        Some(self.item_id.into_inner())
    }
});

record!(CharacterSkill => CharacterSkills, "character skill" {
    fn scope_id(&self) -> Option<Uuid> {
        Some(self.character_id.into_inner())
    }

    fn ref_id(&self) -> Option<Uuid> {
        Some(self.skill_id.into_inner())
    }
});

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use fabula_types::{LocationId, WorldId};

    use super::*;
    use crate::clock;

    #[test]
    fn location_document_carries_key_columns() {
        let now = clock::now();
        let parent = LocationId::new();
        let loc = Location {
            id: LocationId::new(),
            tenant_id: TenantId::new(),
            world_id: WorldId::new(),
            parent_id: Some(parent),
            name: "Harbor".into(),
            kind: Some("district".into()),
            description: None,
            hierarchy_level: 1,
            created_at: now,
            updated_at: now,
        };

        let doc = loc.to_document().unwrap();
        assert_eq!(doc.id, loc.id.into_inner());
        assert_eq!(doc.scope_id, Some(loc.world_id.into_inner()));
        assert_eq!(doc.parent_id, Some(parent.into_inner()));
        assert_eq!(doc.body["type"], "district");

        let back = Location::from_document(doc).unwrap();
        assert_eq!(back, loc);
    }

    #[test]
    fn builtin_system_maps_to_reserved_tenant() {
        let now = clock::now();
        let system = RpgSystem {
            id: fabula_types::RpgSystemId::new(),
            tenant_id: None,
            name: "d20".into(),
            description: None,
            base_stats_schema: serde_json::json!({}),
            derived_stats_schema: None,
            progression_schema: None,
            is_builtin: true,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(Record::tenant_id(&system), TenantId::BUILTIN);
    }
}
