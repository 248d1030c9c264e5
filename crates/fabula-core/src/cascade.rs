//! Dependent-row cleanup run inside the transaction of a delete.
//!
//! Each function removes (or unlinks) everything that points at the entity
//! being deleted, then the entity itself, so the store never holds a
//! dangling edge or child row after commit.

use fabula_types::{
    Archetype, Artifact, Beat, Chapter, Character, ContentBlock, EntityKind, Event, InventoryItem,
    Location, RpgClass, Scene, Skill, StatsVersion, Story, Trait, World,
};
use uuid::Uuid;

use crate::clock;
use crate::error::CoreError;
use crate::graph;
use crate::hierarchy::{self, Hierarchical};
use crate::store::{Filter, RelationEndpoint, RelationQuery, Table, Tx};

/// Delete a hierarchical node: promote its children, drop its edges.
pub async fn tree_node<T: Hierarchical>(tx: &mut Tx, node: &T) -> Result<(), CoreError> {
    hierarchy::detach(tx, node).await?;
    graph::delete_by_entity(tx, T::KIND, node.id()).await?;
    tx.delete::<T>(node.id()).await?;
    Ok(())
}

/// Delete a location: scenes set there lose the link, then it goes as a
/// node.
pub async fn location(tx: &mut Tx, location: &Location) -> Result<(), CoreError> {
    let now = clock::now();
    for mut scene_row in tx.list::<Scene>(Filter::all()).await? {
        if scene_row.location_id == Some(location.id) {
            scene_row.location_id = None;
            scene_row.updated_at = now;
            tx.update(&scene_row).await?;
        }
    }
    tree_node(tx, location).await
}

/// Delete an event: unlink stats rows it caused, then delete it as a node.
pub async fn event(tx: &mut Tx, event: &Event) -> Result<(), CoreError> {
    let id = event.id.into_inner();
    let now = clock::now();
    for table in [Table::CharacterStats, Table::ArtifactStats] {
        let tenant = tx.tenant();
        let caused: Vec<StatsVersion> = tx
            .list_in(table, tenant, Filter::referencing(id))
            .await?;
        for mut row in caused {
            row.event_id = None;
            row.updated_at = now;
            tx.update_in(table, &row).await?;
        }
    }
    tree_node(tx, event).await
}

/// Delete a character with its stats chain, inventory, skills and edges.
/// Scenes told from its point of view lose the link.
pub async fn character(tx: &mut Tx, character: &Character) -> Result<(), CoreError> {
    let id = character.id.into_inner();
    let now = clock::now();
    for mut scene_row in tx.list::<Scene>(Filter::all()).await? {
        if scene_row.pov_character_id == Some(character.id) {
            scene_row.pov_character_id = None;
            scene_row.updated_at = now;
            tx.update(&scene_row).await?;
        }
    }
    tx.delete_where(Table::CharacterStats, Filter::scope(id))
        .await?;
    tx.delete_where(Table::CharacterInventory, Filter::scope(id))
        .await?;
    tx.delete_where(Table::CharacterSkills, Filter::scope(id))
        .await?;
    graph::delete_by_entity(tx, EntityKind::Character, id).await?;
    tx.delete::<Character>(id).await?;
    Ok(())
}

/// Delete an artifact with its stats chain and edges. Inventory items
/// linked to it lose the link.
pub async fn artifact(tx: &mut Tx, artifact: &Artifact) -> Result<(), CoreError> {
    let id = artifact.id.into_inner();
    tx.delete_where(Table::ArtifactStats, Filter::scope(id))
        .await?;
    let now = clock::now();
    for mut item in tx
        .list::<InventoryItem>(Filter::referencing(id))
        .await?
    {
        item.artifact_id = None;
        item.updated_at = now;
        tx.update(&item).await?;
    }
    graph::delete_by_entity(tx, EntityKind::Artifact, id).await?;
    tx.delete::<Artifact>(id).await?;
    Ok(())
}

/// Delete a world and everything scoped to it.
///
/// # Errors
///
/// `Validation` on `world_id` while stories are still set in the world.
pub async fn world(tx: &mut Tx, world: &World) -> Result<(), CoreError> {
    let id = world.id.into_inner();
    if !tx.list::<Story>(Filter::scope(id)).await?.is_empty() {
        return Err(CoreError::validation(
            "world_id",
            "world still has stories; delete them first",
        ));
    }

    let edges = tx
        .list_relations(&RelationQuery::all(RelationEndpoint::World(world.id)))
        .await?;
    for edge in edges {
        tx.delete_relation(edge.id).await?;
    }

    for character_row in tx.list::<Character>(Filter::scope(id)).await? {
        character(tx, &character_row).await?;
    }
    for artifact_row in tx.list::<Artifact>(Filter::scope(id)).await? {
        artifact(tx, &artifact_row).await?;
    }
    for table in [Table::Locations, Table::Events, Table::Factions, Table::Lore] {
        tx.delete_where(table, Filter::scope(id)).await?;
    }
    tx.delete::<World>(id).await?;
    Ok(())
}

/// Delete a trait and detach it from every archetype and character.
pub async fn trait_entry(tx: &mut Tx, entry: &Trait) -> Result<(), CoreError> {
    let now = clock::now();
    for mut archetype in tx.list::<Archetype>(Filter::all()).await? {
        let before = archetype.traits.len();
        archetype.traits.retain(|t| t.trait_id != entry.id);
        if archetype.traits.len() != before {
            archetype.updated_at = now;
            tx.update(&archetype).await?;
        }
    }
    for mut row in tx.list::<Character>(Filter::all()).await? {
        let before = row.traits.len();
        row.traits.retain(|t| t.trait_id != entry.id);
        if row.traits.len() != before {
            row.updated_at = now;
            tx.update(&row).await?;
        }
    }
    tx.delete::<Trait>(entry.id).await?;
    Ok(())
}

/// Delete an archetype. Characters created from it keep their traits.
pub async fn archetype(tx: &mut Tx, archetype: &Archetype) -> Result<(), CoreError> {
    let now = clock::now();
    for mut row in tx.list::<Character>(Filter::all()).await? {
        if row.archetype_id == Some(archetype.id) {
            row.archetype_id = None;
            row.updated_at = now;
            tx.update(&row).await?;
        }
    }
    tx.delete::<Archetype>(archetype.id).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Story content
// ---------------------------------------------------------------------------

/// Delete a beat and its edges.
pub async fn beat(tx: &mut Tx, beat: &Beat) -> Result<(), CoreError> {
    graph::delete_by_entity(tx, EntityKind::Beat, beat.id.into_inner()).await?;
    tx.delete::<Beat>(beat.id).await?;
    Ok(())
}

/// Delete a scene with its beats and edges.
pub async fn scene(tx: &mut Tx, scene: &Scene) -> Result<(), CoreError> {
    let id = scene.id.into_inner();
    for beat_row in tx.list::<Beat>(Filter::scope(id)).await? {
        beat(tx, &beat_row).await?;
    }
    graph::delete_by_entity(tx, EntityKind::Scene, id).await?;
    tx.delete::<Scene>(id).await?;
    Ok(())
}

/// Delete a content block and its edges.
pub async fn content_block(tx: &mut Tx, block: &ContentBlock) -> Result<(), CoreError> {
    graph::delete_by_entity(tx, EntityKind::ContentBlock, block.id.into_inner()).await?;
    tx.delete::<ContentBlock>(block.id).await?;
    Ok(())
}

/// Delete a chapter with its scenes, content blocks and edges.
pub async fn chapter(tx: &mut Tx, chapter: &Chapter) -> Result<(), CoreError> {
    let id = chapter.id.into_inner();
    for scene_row in tx.list::<Scene>(Filter::scope(id)).await? {
        scene(tx, &scene_row).await?;
    }
    for block in tx.list::<ContentBlock>(Filter::scope(id)).await? {
        content_block(tx, &block).await?;
    }
    graph::delete_by_entity(tx, EntityKind::Chapter, id).await?;
    tx.delete::<Chapter>(id).await?;
    Ok(())
}

/// Delete a story version with its whole subtree.
///
/// # Errors
///
/// `Validation` on `story_id` when other versions were cloned from it.
pub async fn story(tx: &mut Tx, story: &Story) -> Result<(), CoreError> {
    let id = story.id.into_inner();
    let derived = tx.list::<Story>(Filter::children_of(id)).await?;
    if !derived.is_empty() {
        return Err(CoreError::validation(
            "story_id",
            format!("{} later versions were cloned from this story", derived.len()),
        ));
    }
    for chapter_row in tx.list::<Chapter>(Filter::scope(id)).await? {
        chapter(tx, &chapter_row).await?;
    }
    // Scenes not filed under a chapter.
    for scene_row in tx.list::<Scene>(Filter::referencing(id)).await? {
        scene(tx, &scene_row).await?;
    }
    graph::delete_by_entity(tx, EntityKind::Story, id).await?;
    tx.delete::<Story>(id).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// RPG overlay
// ---------------------------------------------------------------------------

/// Delete a skill, its class links and every character's progress in it.
pub async fn skill(tx: &mut Tx, skill: &Skill) -> Result<(), CoreError> {
    let id = skill.id.into_inner();
    tx.delete_where(Table::ClassSkills, Filter::referencing(id))
        .await?;
    tx.delete_where(Table::CharacterSkills, Filter::referencing(id))
        .await?;
    graph::delete_by_entity(tx, EntityKind::RpgSkill, id).await?;
    tx.delete::<Skill>(id).await?;
    Ok(())
}

/// Delete a class. Child classes become roots and characters of the class
/// lose it.
pub async fn class(tx: &mut Tx, class: &RpgClass) -> Result<(), CoreError> {
    let id = class.id.into_inner();
    let now = clock::now();
    tx.delete_where(Table::ClassSkills, Filter::scope(id))
        .await?;
    for mut child in tx.list::<RpgClass>(Filter::children_of(id)).await? {
        child.parent_class_id = None;
        child.updated_at = now;
        tx.update(&child).await?;
    }
    for mut row in tx.list::<Character>(Filter::referencing(id)).await? {
        row.current_class_id = None;
        row.updated_at = now;
        tx.update(&row).await?;
    }
    graph::delete_by_entity(tx, EntityKind::RpgClass, id).await?;
    tx.delete::<RpgClass>(id).await?;
    Ok(())
}

/// Delete an item and every inventory stack of it.
pub async fn item(tx: &mut Tx, item: &InventoryItem) -> Result<(), CoreError> {
    let id = item.id.into_inner();
    tx.delete_where(Table::CharacterInventory, Filter::referencing(id))
        .await?;
    graph::delete_by_entity(tx, EntityKind::InventoryItem, id).await?;
    tx.delete::<InventoryItem>(id).await?;
    Ok(())
}

/// Delete every skill, class, slot and item of a system.
pub async fn system_contents(tx: &mut Tx, system: Uuid) -> Result<(), CoreError> {
    for skill_row in tx.list::<Skill>(Filter::scope(system)).await? {
        skill(tx, &skill_row).await?;
    }
    for class_row in tx.list::<RpgClass>(Filter::scope(system)).await? {
        // Children may already have been unlinked by an earlier iteration.
        if let Some(fresh) = tx.find::<RpgClass>(class_row.id).await? {
            class(tx, &fresh).await?;
        }
    }
    for item_row in tx.list::<InventoryItem>(Filter::scope(system)).await? {
        item(tx, &item_row).await?;
    }
    tx.delete_where(Table::InventorySlots, Filter::scope(system))
        .await?;

    let now = clock::now();
    for mut world_row in tx.list::<World>(Filter::all()).await? {
        if world_row.rpg_system_id.map(Uuid::from) == Some(system) {
            world_row.rpg_system_id = None;
            world_row.updated_at = now;
            tx.update(&world_row).await?;
        }
    }
    Ok(())
}
