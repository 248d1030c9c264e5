//! Inventory definitions and per-character progression.
//!
//! [`InventoryService`] owns slot and item definitions as well as the
//! stacks characters carry; [`CharacterSkillService`] tracks what a
//! character has learned.

use fabula_types::{
    Artifact, ArtifactId, AuditAction, Character, CharacterId, CharacterSkill, CharacterSkillId,
    EntityKind, InventoryEntry, InventoryEntryId, InventoryItem, InventoryItemId, InventorySlot,
    InventorySlotId, ItemCategory, ItemSize, RpgSystemId, Skill, SkillId,
};
use serde::Deserialize;
use serde_json::Value;

use super::rpg::find_system;
use super::world::world_system;
use super::{Deps, json_object, optional, require_tenant, required};
use crate::cascade;
use crate::clock;
use crate::error::CoreError;
use crate::store::{Filter, Isolation, Tx};
use crate::tenant::TenantContext;

fn at_least_one(field: &'static str, value: u32) -> Result<u32, CoreError> {
    if value == 0 {
        Err(CoreError::validation(
            field,
            format!("{field} must be at least 1"),
        ))
    } else {
        Ok(value)
    }
}

fn object_or_empty(field: &'static str, value: Option<Value>) -> Result<Value, CoreError> {
    match value {
        Some(value) => {
            json_object(field, &value)?;
            Ok(value)
        }
        None => Ok(Value::Object(serde_json::Map::new())),
    }
}

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// Input of [`InventoryService::create_slot`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewSlot {
    /// Defining system.
    pub rpg_system_id: RpgSystemId,
    /// Display name ("head", "main_hand").
    pub name: String,
    /// Free-form slot type.
    #[serde(default = "default_slot_type")]
    pub slot_type: String,
}

fn default_slot_type() -> String {
    "equipment".to_owned()
}

/// Input of [`InventoryService::create_item`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewItem {
    /// Defining system.
    pub rpg_system_id: RpgSystemId,
    /// Display name.
    pub name: String,
    /// Item category.
    pub category: ItemCategory,
    /// Backing artifact.
    #[serde(default)]
    pub artifact_id: Option<ArtifactId>,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Slots one unit occupies, 1 when absent.
    #[serde(default)]
    pub slots_required: Option<u32>,
    /// Weight of one unit.
    #[serde(default)]
    pub weight: Option<f64>,
    /// Size class.
    #[serde(default)]
    pub size: ItemSize,
    /// Units per stack, 1 when absent.
    #[serde(default)]
    pub max_stack: Option<u32>,
    /// Slots the item can be equipped in.
    #[serde(default)]
    pub equip_slots: Vec<String>,
    /// Requirements object.
    #[serde(default)]
    pub requirements: Option<Value>,
    /// Item stats object.
    #[serde(default)]
    pub item_stats: Option<Value>,
    /// Whether the item is a template.
    #[serde(default)]
    pub is_template: bool,
}

/// Edits accepted by [`InventoryService::update_item`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ItemChanges {
    /// New name.
    pub name: Option<String>,
    /// New category.
    pub category: Option<ItemCategory>,
    /// New backing artifact.
    pub artifact_id: Option<ArtifactId>,
    /// New description.
    pub description: Option<String>,
    /// New slot footprint.
    pub slots_required: Option<u32>,
    /// New weight.
    pub weight: Option<f64>,
    /// New size class.
    pub size: Option<ItemSize>,
    /// New stack size.
    pub max_stack: Option<u32>,
    /// Replacement equip slots.
    pub equip_slots: Option<Vec<String>>,
    /// Replacement requirements.
    pub requirements: Option<Value>,
    /// Replacement item stats.
    pub item_stats: Option<Value>,
    /// New template flag.
    pub is_template: Option<bool>,
}

/// Input of [`InventoryService::add_item`].
#[derive(Debug, Clone, Deserialize)]
pub struct AddItem {
    /// Item definition.
    pub item_id: InventoryItemId,
    /// Units to add.
    pub quantity: u32,
    /// Slot to place a new stack in.
    #[serde(default)]
    pub slot_id: Option<InventorySlotId>,
}

/// Edits accepted by [`InventoryService::update_entry`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EntryChanges {
    /// New quantity, within the item's stack size.
    pub quantity: Option<u32>,
    /// New slot.
    pub slot_id: Option<InventorySlotId>,
    /// Name override; an empty string clears it.
    pub custom_name: Option<String>,
    /// Stats override object.
    pub custom_stats: Option<Value>,
}

fn weight(value: Option<f64>) -> Result<Option<f64>, CoreError> {
    match value {
        Some(w) if !w.is_finite() || w < 0.0 => Err(CoreError::validation(
            "weight",
            "weight must be a non-negative number",
        )),
        other => Ok(other),
    }
}

async fn slot_in_system(
    tx: &mut Tx,
    slot: InventorySlotId,
    system: RpgSystemId,
) -> Result<InventorySlot, CoreError> {
    let slot: InventorySlot = tx.fetch(slot).await?;
    if slot.rpg_system_id == system {
        Ok(slot)
    } else {
        Err(CoreError::validation(
            "slot_id",
            "slot must belong to the item's rpg system",
        ))
    }
}

/// Pick the unequipped stack of `item` that can take `quantity` more units.
fn open_stack(
    stacks: &[InventoryEntry],
    item: &InventoryItem,
    quantity: u32,
) -> Option<InventoryEntry> {
    stacks
        .iter()
        .filter(|s| s.item_id == item.id && !s.is_equipped)
        .find(|s| {
            s.quantity
                .checked_add(quantity)
                .is_some_and(|total| total <= item.max_stack)
        })
        .cloned()
}

/// Slots, items and character inventories.
#[derive(Debug, Clone)]
pub struct InventoryService {
    deps: Deps,
}

impl InventoryService {
    /// Create the service.
    pub const fn new(deps: Deps) -> Self {
        Self { deps }
    }

    // -- slots --------------------------------------------------------------

    /// Define an equipment slot.
    pub async fn create_slot(
        &self,
        ctx: &TenantContext,
        input: NewSlot,
    ) -> Result<InventorySlot, CoreError> {
        let name = required("name", &input.name)?;
        let slot_type = required("slot_type", &input.slot_type)?;
        let mut tx = self.deps.open(ctx).await?;
        require_tenant(&mut tx).await?;
        find_system(&mut tx, input.rpg_system_id).await?;

        let now = clock::now();
        let slot = InventorySlot {
            id: InventorySlotId::new(),
            tenant_id: ctx.tenant_id,
            rpg_system_id: input.rpg_system_id,
            name,
            slot_type,
            created_at: now,
            updated_at: now,
        };
        tx.insert(&slot).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Update, EntityKind::RpgSystem, slot.rpg_system_id)
            .await;
        Ok(slot)
    }

    /// Slots the tenant defined in `system`.
    pub async fn list_slots(
        &self,
        ctx: &TenantContext,
        system: RpgSystemId,
    ) -> Result<Vec<InventorySlot>, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        find_system(&mut tx, system).await?;
        tx.list(Filter::scope(system.into_inner())).await
    }

    /// Delete a slot. Stacks placed in it keep their items but lose the slot.
    pub async fn delete_slot(
        &self,
        ctx: &TenantContext,
        id: InventorySlotId,
    ) -> Result<(), CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        let slot: InventorySlot = tx.fetch(id).await?;
        let now = clock::now();
        for mut entry in tx.list::<InventoryEntry>(Filter::all()).await? {
            if entry.slot_id == Some(id) {
                entry.slot_id = None;
                entry.updated_at = now;
                tx.update(&entry).await?;
            }
        }
        tx.delete::<InventorySlot>(id).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Update, EntityKind::RpgSystem, slot.rpg_system_id)
            .await;
        Ok(())
    }

    // -- items --------------------------------------------------------------

    /// Define an item.
    pub async fn create_item(
        &self,
        ctx: &TenantContext,
        input: NewItem,
    ) -> Result<InventoryItem, CoreError> {
        let name = required("name", &input.name)?;
        let slots_required = at_least_one("slots_required", input.slots_required.unwrap_or(1))?;
        let max_stack = at_least_one("max_stack", input.max_stack.unwrap_or(1))?;
        let requirements = object_or_empty("requirements", input.requirements)?;
        let item_stats = object_or_empty("item_stats", input.item_stats)?;
        let weight = weight(input.weight)?;

        let mut tx = self.deps.open(ctx).await?;
        require_tenant(&mut tx).await?;
        find_system(&mut tx, input.rpg_system_id).await?;
        if let Some(artifact) = input.artifact_id {
            tx.fetch::<Artifact>(artifact).await?;
        }

        let now = clock::now();
        let item = InventoryItem {
            id: InventoryItemId::new(),
            tenant_id: ctx.tenant_id,
            rpg_system_id: input.rpg_system_id,
            artifact_id: input.artifact_id,
            name,
            category: input.category,
            description: optional(input.description),
            slots_required,
            weight,
            size: input.size,
            max_stack,
            equip_slots: input.equip_slots,
            requirements,
            item_stats,
            is_template: input.is_template,
            created_at: now,
            updated_at: now,
        };
        tx.insert(&item).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Create, EntityKind::InventoryItem, item.id)
            .await;
        self.deps.side.ingest(ctx, "inventory_item", item.id).await;
        Ok(item)
    }

    /// Load an item definition.
    pub async fn get_item(
        &self,
        ctx: &TenantContext,
        id: InventoryItemId,
    ) -> Result<InventoryItem, CoreError> {
        self.deps.open(ctx).await?.fetch(id).await
    }

    /// Items the tenant defined in `system`.
    pub async fn list_items(
        &self,
        ctx: &TenantContext,
        system: RpgSystemId,
    ) -> Result<Vec<InventoryItem>, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        find_system(&mut tx, system).await?;
        tx.list(Filter::scope(system.into_inner())).await
    }

    /// Update an item definition.
    ///
    /// # Errors
    ///
    /// `Validation` on `max_stack` when an existing stack is larger than
    /// the new stack size.
    pub async fn update_item(
        &self,
        ctx: &TenantContext,
        id: InventoryItemId,
        changes: ItemChanges,
    ) -> Result<InventoryItem, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        let mut item: InventoryItem = tx.fetch(id).await?;
        if let Some(name) = changes.name {
            item.name = required("name", &name)?;
        }
        if let Some(category) = changes.category {
            item.category = category;
        }
        if let Some(artifact) = changes.artifact_id {
            tx.fetch::<Artifact>(artifact).await?;
            item.artifact_id = Some(artifact);
        }
        if let Some(description) = changes.description {
            item.description = optional(Some(description));
        }
        if let Some(slots) = changes.slots_required {
            item.slots_required = at_least_one("slots_required", slots)?;
        }
        if changes.weight.is_some() {
            item.weight = weight(changes.weight)?;
        }
        if let Some(size) = changes.size {
            item.size = size;
        }
        if let Some(max_stack) = changes.max_stack {
            let max_stack = at_least_one("max_stack", max_stack)?;
            let stacks: Vec<InventoryEntry> =
                tx.list(Filter::referencing(id.into_inner())).await?;
            if stacks.iter().any(|s| s.quantity > max_stack) {
                return Err(CoreError::validation(
                    "max_stack",
                    "an existing stack holds more units",
                ));
            }
            item.max_stack = max_stack;
        }
        if let Some(slots) = changes.equip_slots {
            item.equip_slots = slots;
        }
        if let Some(requirements) = changes.requirements {
            item.requirements = object_or_empty("requirements", Some(requirements))?;
        }
        if let Some(stats) = changes.item_stats {
            item.item_stats = object_or_empty("item_stats", Some(stats))?;
        }
        if let Some(template) = changes.is_template {
            item.is_template = template;
        }
        item.updated_at = clock::now();
        tx.update(&item).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Update, EntityKind::InventoryItem, id)
            .await;
        self.deps.side.ingest(ctx, "inventory_item", id).await;
        Ok(item)
    }

    /// Delete an item definition and every stack of it.
    pub async fn delete_item(
        &self,
        ctx: &TenantContext,
        id: InventoryItemId,
    ) -> Result<(), CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        let item: InventoryItem = tx.fetch(id).await?;
        cascade::item(&mut tx, &item).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Delete, EntityKind::InventoryItem, id)
            .await;
        Ok(())
    }

    // -- character inventories ------------------------------------------------

    /// Give `input.quantity` units of an item to a character.
    ///
    /// The units join an unequipped stack of the same item when it has
    /// room, and start a new stack otherwise.
    ///
    /// # Errors
    ///
    /// `Validation` on `quantity` when it is zero or exceeds the item's
    /// stack size, and on `item_id` when the character's world runs a
    /// different rpg system than the item.
    pub async fn add_item(
        &self,
        ctx: &TenantContext,
        character: CharacterId,
        input: AddItem,
    ) -> Result<InventoryEntry, CoreError> {
        let quantity = at_least_one("quantity", input.quantity)?;
        let mut tx = self.deps.begin(ctx, Isolation::Serializable).await?;
        let owner: Character = tx.fetch(character).await?;
        let item: InventoryItem = tx.fetch(input.item_id).await?;
        if quantity > item.max_stack {
            return Err(CoreError::validation(
                "quantity",
                format!("quantity exceeds the stack size of {}", item.max_stack),
            ));
        }
        let system = world_system(&mut tx, owner.world_id).await?;
        if system.is_some_and(|s| s.id != item.rpg_system_id) {
            return Err(CoreError::validation(
                "item_id",
                "item belongs to a different rpg system than the character's world",
            ));
        }
        if let Some(slot) = input.slot_id {
            slot_in_system(&mut tx, slot, item.rpg_system_id).await?;
        }

        let stacks: Vec<InventoryEntry> = tx.list(Filter::scope(character.into_inner())).await?;
        let now = clock::now();
        let entry = if let Some(mut stack) = open_stack(&stacks, &item, quantity) {
            stack.quantity = stack.quantity.saturating_add(quantity);
            stack.updated_at = now;
            tx.update(&stack).await?;
            stack
        } else {
            let stack = InventoryEntry {
                id: InventoryEntryId::new(),
                tenant_id: ctx.tenant_id,
                character_id: character,
                item_id: item.id,
                quantity,
                slot_id: input.slot_id,
                is_equipped: false,
                custom_name: None,
                custom_stats: None,
                created_at: now,
                updated_at: now,
            };
            tx.insert(&stack).await?;
            stack
        };
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Update, EntityKind::Character, character)
            .await;
        Ok(entry)
    }

    /// Stacks a character carries.
    pub async fn list(
        &self,
        ctx: &TenantContext,
        character: CharacterId,
    ) -> Result<Vec<InventoryEntry>, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        tx.fetch::<Character>(character).await?;
        tx.list(Filter::scope(character.into_inner())).await
    }

    /// Update a stack.
    pub async fn update_entry(
        &self,
        ctx: &TenantContext,
        id: InventoryEntryId,
        changes: EntryChanges,
    ) -> Result<InventoryEntry, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        let mut entry: InventoryEntry = tx.fetch(id).await?;
        let item: InventoryItem = tx.fetch(entry.item_id).await?;
        if let Some(quantity) = changes.quantity {
            let quantity = at_least_one("quantity", quantity)?;
            if quantity > item.max_stack {
                return Err(CoreError::validation(
                    "quantity",
                    format!("quantity exceeds the stack size of {}", item.max_stack),
                ));
            }
            entry.quantity = quantity;
        }
        if let Some(slot) = changes.slot_id {
            slot_in_system(&mut tx, slot, item.rpg_system_id).await?;
            entry.slot_id = Some(slot);
        }
        if let Some(name) = changes.custom_name {
            entry.custom_name = optional(Some(name));
        }
        if let Some(stats) = changes.custom_stats {
            json_object("custom_stats", &stats)?;
            entry.custom_stats = Some(stats);
        }
        entry.updated_at = clock::now();
        tx.update(&entry).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Update, EntityKind::Character, entry.character_id)
            .await;
        Ok(entry)
    }

    /// Equip a stack, optionally in a specific slot.
    ///
    /// # Errors
    ///
    /// `Validation` on `slot_id` when the item lists equip slots and the
    /// chosen slot is not one of them.
    pub async fn equip(
        &self,
        ctx: &TenantContext,
        id: InventoryEntryId,
        slot: Option<InventorySlotId>,
    ) -> Result<InventoryEntry, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        let mut entry: InventoryEntry = tx.fetch(id).await?;
        let item: InventoryItem = tx.fetch(entry.item_id).await?;
        if let Some(slot) = slot {
            let slot = slot_in_system(&mut tx, slot, item.rpg_system_id).await?;
            if !item.equip_slots.is_empty() && !item.equip_slots.contains(&slot.name) {
                return Err(CoreError::validation(
                    "slot_id",
                    format!("{} cannot be equipped in {}", item.name, slot.name),
                ));
            }
            entry.slot_id = Some(slot.id);
        }
        entry.is_equipped = true;
        entry.updated_at = clock::now();
        tx.update(&entry).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Update, EntityKind::Character, entry.character_id)
            .await;
        Ok(entry)
    }

    /// Unequip a stack. The slot assignment is kept.
    pub async fn unequip(
        &self,
        ctx: &TenantContext,
        id: InventoryEntryId,
    ) -> Result<InventoryEntry, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        let mut entry: InventoryEntry = tx.fetch(id).await?;
        entry.is_equipped = false;
        entry.updated_at = clock::now();
        tx.update(&entry).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Update, EntityKind::Character, entry.character_id)
            .await;
        Ok(entry)
    }

    /// Drop a stack.
    pub async fn remove(&self, ctx: &TenantContext, id: InventoryEntryId) -> Result<(), CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        let entry: InventoryEntry = tx.fetch(id).await?;
        tx.delete::<InventoryEntry>(id).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Update, EntityKind::Character, entry.character_id)
            .await;
        Ok(())
    }

    /// Hand `quantity` units of a stack (all of it when absent) to another
    /// character. The units merge into the receiver's unequipped stack of
    /// the same item when it has room; the source stack goes away once
    /// empty. Returns the receiving stack.
    pub async fn transfer(
        &self,
        ctx: &TenantContext,
        id: InventoryEntryId,
        to: CharacterId,
        quantity: Option<u32>,
    ) -> Result<InventoryEntry, CoreError> {
        let mut tx = self.deps.begin(ctx, Isolation::Serializable).await?;
        let mut source: InventoryEntry = tx.fetch(id).await?;
        if source.character_id == to {
            return Err(CoreError::validation(
                "to_character_id",
                "cannot transfer to the owning character",
            ));
        }
        tx.fetch::<Character>(to).await?;
        let item: InventoryItem = tx.fetch(source.item_id).await?;

        let moved = at_least_one("quantity", quantity.unwrap_or(source.quantity))?;
        let Some(left) = source.quantity.checked_sub(moved) else {
            return Err(CoreError::validation(
                "quantity",
                format!("stack only holds {}", source.quantity),
            ));
        };

        let now = clock::now();
        let stacks: Vec<InventoryEntry> = tx.list(Filter::scope(to.into_inner())).await?;
        let received = if let Some(mut stack) = open_stack(&stacks, &item, moved) {
            stack.quantity = stack.quantity.saturating_add(moved);
            stack.updated_at = now;
            tx.update(&stack).await?;
            stack
        } else {
            let stack = InventoryEntry {
                id: InventoryEntryId::new(),
                tenant_id: ctx.tenant_id,
                character_id: to,
                item_id: item.id,
                quantity: moved,
                slot_id: None,
                is_equipped: false,
                custom_name: source.custom_name.clone(),
                custom_stats: source.custom_stats.clone(),
                created_at: now,
                updated_at: now,
            };
            tx.insert(&stack).await?;
            stack
        };

        if left == 0 {
            tx.delete::<InventoryEntry>(id).await?;
        } else {
            source.quantity = left;
            source.updated_at = now;
            tx.update(&source).await?;
        }
        tx.commit().await?;

        for character in [source.character_id, to] {
            self.deps
                .side
                .audit(ctx, AuditAction::Update, EntityKind::Character, character)
                .await;
        }
        Ok(received)
    }
}

// ---------------------------------------------------------------------------
// Character skills
// ---------------------------------------------------------------------------

/// Edits accepted by [`CharacterSkillService::update`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CharacterSkillChanges {
    /// New rank, at most the skill's cap.
    pub rank: Option<u32>,
    /// New experience total.
    pub xp_in_skill: Option<u64>,
    /// New active flag.
    pub is_active: Option<bool>,
}

fn rank_within(skill: &Skill, rank: u32) -> Result<u32, CoreError> {
    if rank > skill.max_rank {
        Err(CoreError::validation(
            "rank",
            format!("rank must not exceed {}", skill.max_rank),
        ))
    } else {
        Ok(rank)
    }
}

async fn learned(
    tx: &mut Tx,
    character: CharacterId,
    skill: SkillId,
) -> Result<Option<CharacterSkill>, CoreError> {
    let rows: Vec<CharacterSkill> = tx.list(Filter::scope(character.into_inner())).await?;
    Ok(rows.into_iter().find(|r| r.skill_id == skill))
}

/// Character skill use cases.
#[derive(Debug, Clone)]
pub struct CharacterSkillService {
    deps: Deps,
}

impl CharacterSkillService {
    /// Create the service.
    pub const fn new(deps: Deps) -> Self {
        Self { deps }
    }

    /// Teach a skill. Learning a skill twice returns the existing row
    /// unchanged.
    pub async fn learn(
        &self,
        ctx: &TenantContext,
        character: CharacterId,
        skill: SkillId,
        rank: Option<u32>,
    ) -> Result<CharacterSkill, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        tx.fetch::<Character>(character).await?;
        let definition: Skill = tx.fetch(skill).await?;
        if let Some(existing) = learned(&mut tx, character, skill).await? {
            return Ok(existing);
        }
        let rank = rank_within(&definition, rank.unwrap_or(1))?;

        let now = clock::now();
        let row = CharacterSkill {
            id: CharacterSkillId::new(),
            tenant_id: ctx.tenant_id,
            character_id: character,
            skill_id: skill,
            rank,
            xp_in_skill: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        tx.insert(&row).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Update, EntityKind::Character, character)
            .await;
        Ok(row)
    }

    /// Skills a character has learned.
    pub async fn list(
        &self,
        ctx: &TenantContext,
        character: CharacterId,
    ) -> Result<Vec<CharacterSkill>, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        tx.fetch::<Character>(character).await?;
        tx.list(Filter::scope(character.into_inner())).await
    }

    /// Change rank, experience or the active flag.
    pub async fn update(
        &self,
        ctx: &TenantContext,
        character: CharacterId,
        skill: SkillId,
        changes: CharacterSkillChanges,
    ) -> Result<CharacterSkill, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        tx.fetch::<Character>(character).await?;
        let definition: Skill = tx.fetch(skill).await?;
        let mut row = learned(&mut tx, character, skill)
            .await?
            .ok_or_else(|| CoreError::not_found("character skill", skill))?;
        if let Some(rank) = changes.rank {
            row.rank = rank_within(&definition, rank)?;
        }
        if let Some(xp) = changes.xp_in_skill {
            row.xp_in_skill = xp;
        }
        if let Some(active) = changes.is_active {
            row.is_active = active;
        }
        row.updated_at = clock::now();
        tx.update(&row).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Update, EntityKind::Character, character)
            .await;
        Ok(row)
    }

    /// Forget a skill.
    pub async fn forget(
        &self,
        ctx: &TenantContext,
        character: CharacterId,
        skill: SkillId,
    ) -> Result<(), CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        tx.fetch::<Character>(character).await?;
        let row = learned(&mut tx, character, skill)
            .await?
            .ok_or_else(|| CoreError::not_found("character skill", skill))?;
        tx.delete::<CharacterSkill>(row.id).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Update, EntityKind::Character, character)
            .await;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use fabula_types::{SkillCategory, SkillType, WorldId};
    use serde_json::json;

    use super::*;
    use crate::service::character::{CharacterService, NewCharacter};
    use crate::service::rpg::{NewRpgSystem, NewSkill, RpgSystemService, SkillService};
    use crate::service::tenant::{NewTenant, TenantService};
    use crate::service::world::{NewWorld, WorldService};
    use crate::side_channel::SideChannels;
    use crate::store::MemoryStore;

    struct Fixture {
        deps: Deps,
        ctx: TenantContext,
        system: RpgSystemId,
        world: WorldId,
    }

    async fn fixture() -> Fixture {
        let deps = Deps::new(Arc::new(MemoryStore::new()), Arc::new(SideChannels::noop()));
        let tenant = TenantService::new(deps.clone())
            .create(NewTenant { name: "Acme".into() })
            .await
            .unwrap();
        let ctx = TenantContext::new(tenant.id);
        let system = RpgSystemService::new(deps.clone())
            .create(
                &ctx,
                NewRpgSystem {
                    name: "Homebrew".into(),
                    description: None,
                    base_stats_schema: json!({}),
                    derived_stats_schema: None,
                    progression_schema: None,
                },
            )
            .await
            .unwrap();
        let world = WorldService::new(deps.clone())
            .create(
                &ctx,
                NewWorld {
                    name: "Erde".into(),
                    rpg_system_id: Some(system.id),
                    ..NewWorld::default()
                },
            )
            .await
            .unwrap();
        Fixture {
            deps,
            ctx,
            system: system.id,
            world: world.id,
        }
    }

    async fn character(f: &Fixture, name: &str) -> Character {
        CharacterService::new(f.deps.clone())
            .create(
                &f.ctx,
                NewCharacter {
                    world_id: f.world,
                    name: name.into(),
                    description: None,
                    archetype_id: None,
                },
            )
            .await
            .unwrap()
    }

    fn potion(system: RpgSystemId) -> NewItem {
        NewItem {
            rpg_system_id: system,
            name: "Potion".into(),
            category: ItemCategory::Consumable,
            artifact_id: None,
            description: None,
            slots_required: None,
            weight: Some(0.5),
            size: ItemSize::Tiny,
            max_stack: Some(10),
            equip_slots: Vec::new(),
            requirements: None,
            item_stats: None,
            is_template: false,
        }
    }

    #[tokio::test]
    async fn items_stack_until_full() {
        let f = fixture().await;
        let inventory = InventoryService::new(f.deps.clone());
        let item = inventory.create_item(&f.ctx, potion(f.system)).await.unwrap();
        let ada = character(&f, "Ada").await;

        let add = |quantity| AddItem {
            item_id: item.id,
            quantity,
            slot_id: None,
        };
        let first = inventory.add_item(&f.ctx, ada.id, add(6)).await.unwrap();
        let merged = inventory.add_item(&f.ctx, ada.id, add(4)).await.unwrap();
        assert_eq!(merged.id, first.id);
        assert_eq!(merged.quantity, 10);

        let overflow = inventory.add_item(&f.ctx, ada.id, add(1)).await.unwrap();
        assert_ne!(overflow.id, first.id);
        assert_eq!(inventory.list(&f.ctx, ada.id).await.unwrap().len(), 2);

        let err = inventory.add_item(&f.ctx, ada.id, add(0)).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation { field: "quantity", .. }));
    }

    #[tokio::test]
    async fn transfer_moves_part_of_a_stack() {
        let f = fixture().await;
        let inventory = InventoryService::new(f.deps.clone());
        let item = inventory.create_item(&f.ctx, potion(f.system)).await.unwrap();
        let ada = character(&f, "Ada").await;
        let bob = character(&f, "Bob").await;

        let stack = inventory
            .add_item(
                &f.ctx,
                ada.id,
                AddItem {
                    item_id: item.id,
                    quantity: 5,
                    slot_id: None,
                },
            )
            .await
            .unwrap();

        let received = inventory
            .transfer(&f.ctx, stack.id, bob.id, Some(2))
            .await
            .unwrap();
        assert_eq!(received.character_id, bob.id);
        assert_eq!(received.quantity, 2);
        let kept = inventory.list(&f.ctx, ada.id).await.unwrap();
        assert_eq!(kept.first().unwrap().quantity, 3);

        let err = inventory
            .transfer(&f.ctx, stack.id, bob.id, Some(4))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation { field: "quantity", .. }));

        inventory.transfer(&f.ctx, stack.id, bob.id, None).await.unwrap();
        assert!(inventory.list(&f.ctx, ada.id).await.unwrap().is_empty());
        let bobs = inventory.list(&f.ctx, bob.id).await.unwrap();
        assert_eq!(bobs.len(), 1);
        assert_eq!(bobs.first().unwrap().quantity, 5);
    }

    #[tokio::test]
    async fn learning_is_idempotent_and_rank_is_capped() {
        let f = fixture().await;
        let skill = SkillService::new(f.deps.clone())
            .create(
                &f.ctx,
                NewSkill {
                    rpg_system_id: f.system,
                    name: "Swordplay".into(),
                    category: SkillCategory::Combat,
                    skill_type: SkillType::Active,
                    description: None,
                    prerequisites: None,
                    max_rank: Some(3),
                    effects_schema: None,
                },
            )
            .await
            .unwrap();
        let ada = character(&f, "Ada").await;
        let skills = CharacterSkillService::new(f.deps.clone());

        let first = skills.learn(&f.ctx, ada.id, skill.id, None).await.unwrap();
        let again = skills.learn(&f.ctx, ada.id, skill.id, Some(2)).await.unwrap();
        assert_eq!(first.id, again.id);
        assert_eq!(again.rank, 1);

        let err = skills
            .update(
                &f.ctx,
                ada.id,
                skill.id,
                CharacterSkillChanges {
                    rank: Some(4),
                    ..CharacterSkillChanges::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation { field: "rank", .. }));

        skills.forget(&f.ctx, ada.id, skill.id).await.unwrap();
        assert!(skills.list(&f.ctx, ada.id).await.unwrap().is_empty());
    }
}
