//! Shared type definitions for the Fabula story engine.
//!
//! This crate is the single source of truth for the entities persisted by
//! the engine. Types flow downstream to `TypeScript` via `ts-rs` so an
//! authoring UI can consume the same shapes the HTTP API returns.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for all entity identifiers
//! - [`enums`] -- Entity kinds, statuses and RPG categories
//! - [`world`] -- Tenants and world-building entities
//! - [`story`] -- Stories, chapters, scenes, beats and content blocks
//! - [`relation`] -- Relation edges and audit entries
//! - [`rpg`] -- RPG systems, classes, skills, items and versioned stats

pub mod enums;
pub mod ids;
pub mod relation;
pub mod rpg;
pub mod story;
pub mod world;

// Re-export all public types at crate root for convenience.
pub use enums::{
    AuditAction, BeatType, ContentKind, EntityKind, ItemCategory, ItemSize, ParseEnumError,
    SkillCategory, SkillType, StoryStatus, TenantStatus,
};
pub use ids::{
    ArchetypeId, ArtifactId, AuditEntryId, BeatId, ChapterId, CharacterId, CharacterSkillId,
    ClassSkillId, ContentBlockId, EventId, FactionId, InventoryEntryId, InventoryItemId,
    InventorySlotId, LocationId, LoreId, RelationId, RpgClassId, RpgSystemId, SceneId, SkillId,
    StatsVersionId, StoryId, TenantId, TraitId, UserId, WorldId,
};
pub use relation::{AuditEntry, EntityRelation};
pub use rpg::{
    CharacterSkill, ClassSkill, InventoryEntry, InventoryItem, InventorySlot, RpgClass, RpgSystem,
    Skill, StatsVersion,
};
pub use story::{Beat, Chapter, ContentBlock, Scene, Story};
pub use world::{
    Archetype, ArchetypeTrait, Artifact, Character, CharacterTrait, Event, Faction, Location, Lore,
    Tenant, Trait, World,
};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // ts-rs writes bindings for every #[ts(export)] type reachable from
        // these roots into the crate's `bindings/` directory.
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::TenantId::export_all();
        let _ = crate::ids::WorldId::export_all();
        let _ = crate::ids::StoryId::export_all();
        let _ = crate::ids::RelationId::export_all();
        let _ = crate::ids::StatsVersionId::export_all();

        // Enums
        let _ = crate::enums::EntityKind::export_all();
        let _ = crate::enums::ContentKind::export_all();
        let _ = crate::enums::AuditAction::export_all();

        // World building
        let _ = crate::world::Tenant::export_all();
        let _ = crate::world::World::export_all();
        let _ = crate::world::Trait::export_all();
        let _ = crate::world::Archetype::export_all();
        let _ = crate::world::Character::export_all();
        let _ = crate::world::Artifact::export_all();
        let _ = crate::world::Location::export_all();
        let _ = crate::world::Event::export_all();
        let _ = crate::world::Faction::export_all();
        let _ = crate::world::Lore::export_all();

        // Stories
        let _ = crate::story::Story::export_all();
        let _ = crate::story::Chapter::export_all();
        let _ = crate::story::Scene::export_all();
        let _ = crate::story::Beat::export_all();
        let _ = crate::story::ContentBlock::export_all();

        // Relations
        let _ = crate::relation::EntityRelation::export_all();
        let _ = crate::relation::AuditEntry::export_all();

        // RPG
        let _ = crate::rpg::RpgSystem::export_all();
        let _ = crate::rpg::Skill::export_all();
        let _ = crate::rpg::RpgClass::export_all();
        let _ = crate::rpg::ClassSkill::export_all();
        let _ = crate::rpg::InventorySlot::export_all();
        let _ = crate::rpg::InventoryItem::export_all();
        let _ = crate::rpg::StatsVersion::export_all();
        let _ = crate::rpg::InventoryEntry::export_all();
        let _ = crate::rpg::CharacterSkill::export_all();
    }
}
