//! Characters and their trait instances.

use fabula_types::{
    Archetype, ArchetypeId, AuditAction, Character, CharacterId, CharacterTrait, EntityKind,
    RpgClass, RpgClassId, Trait, TraitId, World, WorldId,
};
use serde::Deserialize;

use super::{Deps, optional, require_tenant, required};
use crate::cascade;
use crate::clock;
use crate::error::CoreError;
use crate::store::{Filter, Isolation};
use crate::tenant::TenantContext;

/// Input of [`CharacterService::create`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewCharacter {
    /// Owning world.
    pub world_id: WorldId,
    /// Display name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Archetype whose traits are copied onto the character.
    #[serde(default)]
    pub archetype_id: Option<ArchetypeId>,
}

/// Edits accepted by [`CharacterService::update`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CharacterChanges {
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New archetype. Existing traits are kept.
    pub archetype_id: Option<ArchetypeId>,
}

/// Edits accepted by [`CharacterService::update_trait`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TraitValueChanges {
    /// New value.
    pub value: Option<String>,
    /// New notes.
    pub notes: Option<String>,
}

/// Character use cases.
#[derive(Debug, Clone)]
pub struct CharacterService {
    deps: Deps,
}

impl CharacterService {
    /// Create the service.
    pub const fn new(deps: Deps) -> Self {
        Self { deps }
    }

    /// Create a character, seeding its traits from the archetype if given.
    pub async fn create(
        &self,
        ctx: &TenantContext,
        input: NewCharacter,
    ) -> Result<Character, CoreError> {
        let name = required("name", &input.name)?;
        let mut tx = self.deps.open(ctx).await?;
        require_tenant(&mut tx).await?;
        tx.fetch::<World>(input.world_id).await?;

        let mut traits = Vec::new();
        if let Some(archetype_id) = input.archetype_id {
            let archetype: Archetype = tx.fetch(archetype_id).await?;
            for entry in archetype.traits {
                let Some(catalogue) = tx.find::<Trait>(entry.trait_id).await? else {
                    continue;
                };
                traits.push(CharacterTrait {
                    trait_id: entry.trait_id,
                    trait_name: catalogue.name,
                    value: entry.default_value,
                    notes: None,
                });
            }
        }

        let now = clock::now();
        let character = Character {
            id: CharacterId::new(),
            tenant_id: ctx.tenant_id,
            world_id: input.world_id,
            archetype_id: input.archetype_id,
            current_class_id: None,
            class_level: 0,
            name,
            description: optional(input.description),
            traits,
            created_at: now,
            updated_at: now,
        };
        tx.insert(&character).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Create, EntityKind::Character, character.id)
            .await;
        self.deps.side.ingest(ctx, "character", character.id).await;
        Ok(character)
    }

    /// Load a character.
    pub async fn get(&self, ctx: &TenantContext, id: CharacterId) -> Result<Character, CoreError> {
        self.deps.open(ctx).await?.fetch(id).await
    }

    /// Characters of a world.
    pub async fn list_by_world(
        &self,
        ctx: &TenantContext,
        world: WorldId,
    ) -> Result<Vec<Character>, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        tx.fetch::<World>(world).await?;
        tx.list(Filter::scope(world.into_inner())).await
    }

    /// Update name, description or archetype.
    pub async fn update(
        &self,
        ctx: &TenantContext,
        id: CharacterId,
        changes: CharacterChanges,
    ) -> Result<Character, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        let mut character: Character = tx.fetch(id).await?;
        if let Some(name) = changes.name {
            character.name = required("name", &name)?;
        }
        if let Some(description) = changes.description {
            character.description = optional(Some(description));
        }
        if let Some(archetype_id) = changes.archetype_id {
            tx.fetch::<Archetype>(archetype_id).await?;
            character.archetype_id = Some(archetype_id);
        }
        character.updated_at = clock::now();
        tx.update(&character).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Update, EntityKind::Character, id)
            .await;
        self.deps.side.ingest(ctx, "character", id).await;
        Ok(character)
    }

    /// Delete a character with its relations, stats, inventory and skills.
    pub async fn delete(&self, ctx: &TenantContext, id: CharacterId) -> Result<(), CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        let character: Character = tx.fetch(id).await?;
        cascade::character(&mut tx, &character).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Delete, EntityKind::Character, id)
            .await;
        Ok(())
    }

    /// Give the character a trait. Setting a trait it already has replaces
    /// the value and notes.
    pub async fn add_trait(
        &self,
        ctx: &TenantContext,
        id: CharacterId,
        trait_id: TraitId,
        value: String,
        notes: Option<String>,
    ) -> Result<Character, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        let mut character: Character = tx.fetch(id).await?;
        let catalogue: Trait = tx.fetch(trait_id).await?;
        let notes = optional(notes);

        match character.traits.iter_mut().find(|t| t.trait_id == trait_id) {
            Some(existing) => {
                existing.value = value;
                existing.notes = notes;
            }
            None => character.traits.push(CharacterTrait {
                trait_id,
                trait_name: catalogue.name,
                value,
                notes,
            }),
        }
        character.updated_at = clock::now();
        tx.update(&character).await?;
        tx.commit().await?;
        self.deps.side.ingest(ctx, "character", id).await;
        Ok(character)
    }

    /// Change the value or notes of a trait the character has.
    pub async fn update_trait(
        &self,
        ctx: &TenantContext,
        id: CharacterId,
        trait_id: TraitId,
        changes: TraitValueChanges,
    ) -> Result<Character, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        let mut character: Character = tx.fetch(id).await?;
        let entry = character
            .traits
            .iter_mut()
            .find(|t| t.trait_id == trait_id)
            .ok_or_else(|| CoreError::not_found("character trait", trait_id))?;
        if let Some(value) = changes.value {
            entry.value = value;
        }
        if let Some(notes) = changes.notes {
            entry.notes = optional(Some(notes));
        }
        character.updated_at = clock::now();
        tx.update(&character).await?;
        tx.commit().await?;
        self.deps.side.ingest(ctx, "character", id).await;
        Ok(character)
    }

    /// Take a trait away from the character.
    pub async fn remove_trait(
        &self,
        ctx: &TenantContext,
        id: CharacterId,
        trait_id: TraitId,
    ) -> Result<Character, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        let mut character: Character = tx.fetch(id).await?;
        let before = character.traits.len();
        character.traits.retain(|t| t.trait_id != trait_id);
        if character.traits.len() == before {
            return Err(CoreError::not_found("character trait", trait_id));
        }
        character.updated_at = clock::now();
        tx.update(&character).await?;
        tx.commit().await?;
        self.deps.side.ingest(ctx, "character", id).await;
        Ok(character)
    }

    /// Trait instances of a character.
    pub async fn list_traits(
        &self,
        ctx: &TenantContext,
        id: CharacterId,
    ) -> Result<Vec<CharacterTrait>, CoreError> {
        let character = self.get(ctx, id).await?;
        Ok(character.traits)
    }

    /// Assign (or clear) the character's RPG class.
    ///
    /// # Errors
    ///
    /// `Validation` on `class_level` when the level is zero, `NotFound` when
    /// the class is missing.
    pub async fn change_class(
        &self,
        ctx: &TenantContext,
        id: CharacterId,
        class_id: Option<RpgClassId>,
        level: Option<u32>,
    ) -> Result<Character, CoreError> {
        let level = level.unwrap_or(1);
        if level < 1 {
            return Err(CoreError::validation(
                "class_level",
                "class_level must be at least 1",
            ));
        }
        let mut tx = self.deps.begin(ctx, Isolation::Serializable).await?;
        let mut character: Character = tx.fetch(id).await?;
        match class_id {
            Some(class_id) => {
                tx.fetch::<RpgClass>(class_id).await?;
                character.current_class_id = Some(class_id);
                character.class_level = level;
            }
            None => {
                character.current_class_id = None;
                character.class_level = 0;
            }
        }
        character.updated_at = clock::now();
        tx.update(&character).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Update, EntityKind::Character, id)
            .await;
        Ok(character)
    }
}
