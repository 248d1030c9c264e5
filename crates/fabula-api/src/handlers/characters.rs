//! Character endpoints, including trait instances and class changes.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use fabula_core::service::character::{CharacterChanges, NewCharacter, TraitValueChanges};
use fabula_types::{Character, CharacterId, CharacterTrait, RpgClassId, TraitId};
use serde::Deserialize;

use super::{Created, created};
use crate::error::ApiResult;
use crate::extract::{Json, Path};
use crate::state::AppState;
use crate::tenant::Tenant;

/// Body of `POST /api/v1/characters/{id}/traits`.
#[derive(Debug, Deserialize)]
pub struct AddTraitBody {
    /// Trait from the catalogue.
    pub trait_id: TraitId,
    /// Value for this character.
    #[serde(default)]
    pub value: String,
    /// Free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Body of `PUT /api/v1/characters/{id}/class`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChangeClassBody {
    /// New class; absent clears it.
    pub class_id: Option<RpgClassId>,
    /// Class level, 1 when absent.
    pub level: Option<u32>,
}

/// `POST /api/v1/characters`
pub async fn create(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Json(input): Json<NewCharacter>,
) -> ApiResult<Created<Character>> {
    Ok(created(state.engine.characters.create(&ctx, input).await?))
}

/// `GET /api/v1/characters/{id}`
pub async fn get(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<CharacterId>,
) -> ApiResult<Json<Character>> {
    Ok(Json(state.engine.characters.get(&ctx, id).await?))
}

/// `PUT /api/v1/characters/{id}`
pub async fn update(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<CharacterId>,
    Json(changes): Json<CharacterChanges>,
) -> ApiResult<Json<Character>> {
    Ok(Json(state.engine.characters.update(&ctx, id, changes).await?))
}

/// `DELETE /api/v1/characters/{id}`
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<CharacterId>,
) -> ApiResult<StatusCode> {
    state.engine.characters.delete(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// `GET /api/v1/characters/{id}/traits`
pub async fn list_traits(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<CharacterId>,
) -> ApiResult<Json<Vec<CharacterTrait>>> {
    Ok(Json(state.engine.characters.list_traits(&ctx, id).await?))
}

/// `POST /api/v1/characters/{id}/traits`
pub async fn add_trait(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<CharacterId>,
    Json(body): Json<AddTraitBody>,
) -> ApiResult<Created<Character>> {
    let character = state
        .engine
        .characters
        .add_trait(&ctx, id, body.trait_id, body.value, body.notes)
        .await?;
    Ok(created(character))
}

/// `PUT /api/v1/characters/{id}/traits/{trait_id}`
pub async fn update_trait(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path((id, trait_id)): Path<(CharacterId, TraitId)>,
    Json(changes): Json<TraitValueChanges>,
) -> ApiResult<Json<Character>> {
    let character = state
        .engine
        .characters
        .update_trait(&ctx, id, trait_id, changes)
        .await?;
    Ok(Json(character))
}

/// `DELETE /api/v1/characters/{id}/traits/{trait_id}`
pub async fn remove_trait(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path((id, trait_id)): Path<(CharacterId, TraitId)>,
) -> ApiResult<Json<Character>> {
    Ok(Json(
        state.engine.characters.remove_trait(&ctx, id, trait_id).await?,
    ))
}

/// `PUT /api/v1/characters/{id}/class`
pub async fn change_class(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<CharacterId>,
    Json(body): Json<ChangeClassBody>,
) -> ApiResult<Json<Character>> {
    let character = state
        .engine
        .characters
        .change_class(&ctx, id, body.class_id, body.level)
        .await?;
    Ok(Json(character))
}
