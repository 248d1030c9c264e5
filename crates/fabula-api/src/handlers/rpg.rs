//! RPG overlay endpoints: systems, skills, classes, slots and items.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use fabula_core::service::progression::{ItemChanges, NewItem, NewSlot};
use fabula_core::service::rpg::{
    NewRpgClass, NewRpgSystem, NewSkill, RpgClassChanges, RpgSystemChanges, SkillChanges,
};
use fabula_types::{
    ClassSkill, InventoryItem, InventoryItemId, InventorySlot, InventorySlotId, RpgClass,
    RpgClassId, RpgSystem, RpgSystemId, Skill, SkillId,
};
use serde::Deserialize;

use super::{Created, created};
use crate::error::ApiResult;
use crate::extract::{Json, Path};
use crate::state::AppState;
use crate::tenant::Tenant;

/// Body of `POST /api/v1/rpg-classes/{id}/skills`.
#[derive(Debug, Deserialize)]
pub struct ClassSkillBody {
    /// Skill of the same system.
    pub skill_id: SkillId,
    /// Class level at which the skill unlocks.
    #[serde(default = "first_level")]
    pub unlock_level: u32,
}

const fn first_level() -> u32 {
    1
}

// ---------------------------------------------------------------------------
// Systems
// ---------------------------------------------------------------------------

/// `POST /api/v1/rpg-systems`
pub async fn create_system(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Json(input): Json<NewRpgSystem>,
) -> ApiResult<Created<RpgSystem>> {
    Ok(created(state.engine.rpg_systems.create(&ctx, input).await?))
}

/// `GET /api/v1/rpg-systems`
pub async fn list_systems(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
) -> ApiResult<Json<Vec<RpgSystem>>> {
    Ok(Json(state.engine.rpg_systems.list(&ctx).await?))
}

/// `GET /api/v1/rpg-systems/{id}`
pub async fn get_system(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<RpgSystemId>,
) -> ApiResult<Json<RpgSystem>> {
    Ok(Json(state.engine.rpg_systems.get(&ctx, id).await?))
}

/// `PUT /api/v1/rpg-systems/{id}`
pub async fn update_system(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<RpgSystemId>,
    Json(changes): Json<RpgSystemChanges>,
) -> ApiResult<Json<RpgSystem>> {
    Ok(Json(
        state.engine.rpg_systems.update(&ctx, id, changes).await?,
    ))
}

/// `DELETE /api/v1/rpg-systems/{id}`
pub async fn delete_system(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<RpgSystemId>,
) -> ApiResult<StatusCode> {
    state.engine.rpg_systems.delete(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/v1/rpg-systems/{id}/skills`
pub async fn system_skills(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<RpgSystemId>,
) -> ApiResult<Json<Vec<Skill>>> {
    Ok(Json(state.engine.skills.list_by_system(&ctx, id).await?))
}

/// `GET /api/v1/rpg-systems/{id}/classes`
pub async fn system_classes(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<RpgSystemId>,
) -> ApiResult<Json<Vec<RpgClass>>> {
    Ok(Json(state.engine.classes.list_by_system(&ctx, id).await?))
}

/// `GET /api/v1/rpg-systems/{id}/slots`
pub async fn system_slots(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<RpgSystemId>,
) -> ApiResult<Json<Vec<InventorySlot>>> {
    Ok(Json(state.engine.inventory.list_slots(&ctx, id).await?))
}

/// `GET /api/v1/rpg-systems/{id}/items`
pub async fn system_items(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<RpgSystemId>,
) -> ApiResult<Json<Vec<InventoryItem>>> {
    Ok(Json(state.engine.inventory.list_items(&ctx, id).await?))
}

// ---------------------------------------------------------------------------
// Skills
// ---------------------------------------------------------------------------

/// `POST /api/v1/rpg-skills`
pub async fn create_skill(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Json(input): Json<NewSkill>,
) -> ApiResult<Created<Skill>> {
    Ok(created(state.engine.skills.create(&ctx, input).await?))
}

/// `GET /api/v1/rpg-skills/{id}`
pub async fn get_skill(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<SkillId>,
) -> ApiResult<Json<Skill>> {
    Ok(Json(state.engine.skills.get(&ctx, id).await?))
}

/// `PUT /api/v1/rpg-skills/{id}`
pub async fn update_skill(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<SkillId>,
    Json(changes): Json<SkillChanges>,
) -> ApiResult<Json<Skill>> {
    Ok(Json(state.engine.skills.update(&ctx, id, changes).await?))
}

/// `DELETE /api/v1/rpg-skills/{id}`
pub async fn delete_skill(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<SkillId>,
) -> ApiResult<StatusCode> {
    state.engine.skills.delete(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Classes
// ---------------------------------------------------------------------------

/// `POST /api/v1/rpg-classes`
pub async fn create_class(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Json(input): Json<NewRpgClass>,
) -> ApiResult<Created<RpgClass>> {
    Ok(created(state.engine.classes.create(&ctx, input).await?))
}

/// `GET /api/v1/rpg-classes/{id}`
pub async fn get_class(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<RpgClassId>,
) -> ApiResult<Json<RpgClass>> {
    Ok(Json(state.engine.classes.get(&ctx, id).await?))
}

/// `PUT /api/v1/rpg-classes/{id}`
pub async fn update_class(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<RpgClassId>,
    Json(changes): Json<RpgClassChanges>,
) -> ApiResult<Json<RpgClass>> {
    Ok(Json(state.engine.classes.update(&ctx, id, changes).await?))
}

/// `DELETE /api/v1/rpg-classes/{id}`
pub async fn delete_class(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<RpgClassId>,
) -> ApiResult<StatusCode> {
    state.engine.classes.delete(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/v1/rpg-classes/{id}/skills`
pub async fn class_skills(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<RpgClassId>,
) -> ApiResult<Json<Vec<ClassSkill>>> {
    Ok(Json(state.engine.classes.list_skills(&ctx, id).await?))
}

/// `POST /api/v1/rpg-classes/{id}/skills`
pub async fn add_class_skill(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<RpgClassId>,
    Json(body): Json<ClassSkillBody>,
) -> ApiResult<Created<ClassSkill>> {
    let link = state
        .engine
        .classes
        .add_skill(&ctx, id, body.skill_id, body.unlock_level)
        .await?;
    Ok(created(link))
}

/// `DELETE /api/v1/rpg-classes/{id}/skills/{skill_id}`
pub async fn remove_class_skill(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path((id, skill)): Path<(RpgClassId, SkillId)>,
) -> ApiResult<StatusCode> {
    state.engine.classes.remove_skill(&ctx, id, skill).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Slots and items
// ---------------------------------------------------------------------------

/// `POST /api/v1/inventory-slots`
pub async fn create_slot(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Json(input): Json<NewSlot>,
) -> ApiResult<Created<InventorySlot>> {
    Ok(created(state.engine.inventory.create_slot(&ctx, input).await?))
}

/// `DELETE /api/v1/inventory-slots/{id}`
pub async fn delete_slot(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<InventorySlotId>,
) -> ApiResult<StatusCode> {
    state.engine.inventory.delete_slot(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/v1/inventory-items`
pub async fn create_item(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Json(input): Json<NewItem>,
) -> ApiResult<Created<InventoryItem>> {
    Ok(created(state.engine.inventory.create_item(&ctx, input).await?))
}

/// `GET /api/v1/inventory-items/{id}`
pub async fn get_item(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<InventoryItemId>,
) -> ApiResult<Json<InventoryItem>> {
    Ok(Json(state.engine.inventory.get_item(&ctx, id).await?))
}

/// `PUT /api/v1/inventory-items/{id}`
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<InventoryItemId>,
    Json(changes): Json<ItemChanges>,
) -> ApiResult<Json<InventoryItem>> {
    Ok(Json(
        state.engine.inventory.update_item(&ctx, id, changes).await?,
    ))
}

/// `DELETE /api/v1/inventory-items/{id}`
pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<InventoryItemId>,
) -> ApiResult<StatusCode> {
    state.engine.inventory.delete_item(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
