//! Character inventory and skill endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use fabula_core::service::progression::{AddItem, CharacterSkillChanges, EntryChanges};
use fabula_types::{
    CharacterId, CharacterSkill, InventoryEntry, InventoryEntryId, InventorySlotId, SkillId,
};
use serde::Deserialize;

use super::{Created, created};
use crate::error::ApiResult;
use crate::extract::{Json, Path};
use crate::state::AppState;
use crate::tenant::Tenant;

/// Body of `POST /api/v1/inventory/{id}/equip`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EquipBody {
    /// Slot to equip into; the current slot when absent.
    pub slot_id: Option<InventorySlotId>,
}

/// Body of `POST /api/v1/inventory/{id}/transfer`.
#[derive(Debug, Deserialize)]
pub struct TransferBody {
    /// Receiving character.
    pub to_character_id: CharacterId,
    /// Units to move; the whole stack when absent.
    #[serde(default)]
    pub quantity: Option<u32>,
}

/// Body of `POST /api/v1/characters/{id}/skills`.
#[derive(Debug, Deserialize)]
pub struct LearnBody {
    /// Skill to learn.
    pub skill_id: SkillId,
    /// Starting rank, 1 when absent.
    #[serde(default)]
    pub rank: Option<u32>,
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

/// `GET /api/v1/characters/{id}/inventory`
pub async fn list_inventory(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<CharacterId>,
) -> ApiResult<Json<Vec<InventoryEntry>>> {
    Ok(Json(state.engine.inventory.list(&ctx, id).await?))
}

/// `POST /api/v1/characters/{id}/inventory`
pub async fn add_item(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<CharacterId>,
    Json(input): Json<AddItem>,
) -> ApiResult<Created<InventoryEntry>> {
    Ok(created(state.engine.inventory.add_item(&ctx, id, input).await?))
}

/// `PUT /api/v1/inventory/{id}`
pub async fn update_entry(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<InventoryEntryId>,
    Json(changes): Json<EntryChanges>,
) -> ApiResult<Json<InventoryEntry>> {
    Ok(Json(
        state.engine.inventory.update_entry(&ctx, id, changes).await?,
    ))
}

/// `POST /api/v1/inventory/{id}/equip`
pub async fn equip(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<InventoryEntryId>,
    Json(body): Json<EquipBody>,
) -> ApiResult<Json<InventoryEntry>> {
    Ok(Json(
        state.engine.inventory.equip(&ctx, id, body.slot_id).await?,
    ))
}

/// `POST /api/v1/inventory/{id}/unequip`
pub async fn unequip(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<InventoryEntryId>,
) -> ApiResult<Json<InventoryEntry>> {
    Ok(Json(state.engine.inventory.unequip(&ctx, id).await?))
}

/// `POST /api/v1/inventory/{id}/transfer`
pub async fn transfer(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<InventoryEntryId>,
    Json(body): Json<TransferBody>,
) -> ApiResult<Json<InventoryEntry>> {
    let entry = state
        .engine
        .inventory
        .transfer(&ctx, id, body.to_character_id, body.quantity)
        .await?;
    Ok(Json(entry))
}

/// `DELETE /api/v1/inventory/{id}`
pub async fn remove_entry(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<InventoryEntryId>,
) -> ApiResult<StatusCode> {
    state.engine.inventory.remove(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Skills
// ---------------------------------------------------------------------------

/// `GET /api/v1/characters/{id}/skills`
pub async fn list_skills(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<CharacterId>,
) -> ApiResult<Json<Vec<CharacterSkill>>> {
    Ok(Json(state.engine.character_skills.list(&ctx, id).await?))
}

/// `POST /api/v1/characters/{id}/skills`
pub async fn learn(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<CharacterId>,
    Json(body): Json<LearnBody>,
) -> ApiResult<Created<CharacterSkill>> {
    let skill = state
        .engine
        .character_skills
        .learn(&ctx, id, body.skill_id, body.rank)
        .await?;
    Ok(created(skill))
}

/// `PUT /api/v1/characters/{id}/skills/{skill_id}`
pub async fn update_skill(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path((id, skill)): Path<(CharacterId, SkillId)>,
    Json(changes): Json<CharacterSkillChanges>,
) -> ApiResult<Json<CharacterSkill>> {
    let skill = state
        .engine
        .character_skills
        .update(&ctx, id, skill, changes)
        .await?;
    Ok(Json(skill))
}

/// `DELETE /api/v1/characters/{id}/skills/{skill_id}`
pub async fn forget(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path((id, skill)): Path<(CharacterId, SkillId)>,
) -> ApiResult<StatusCode> {
    state.engine.character_skills.forget(&ctx, id, skill).await?;
    Ok(StatusCode::NO_CONTENT)
}
