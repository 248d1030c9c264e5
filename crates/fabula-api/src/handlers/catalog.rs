//! Trait catalogue and archetype endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use fabula_core::service::catalog::{ArchetypeChanges, NewArchetype, NewTrait, TraitChanges};
use fabula_types::{Archetype, ArchetypeId, Trait, TraitId};
use serde::Deserialize;

use super::{Created, created};
use crate::error::ApiResult;
use crate::extract::{Json, Path};
use crate::state::AppState;
use crate::tenant::Tenant;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// `POST /api/v1/traits`
pub async fn create_trait(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Json(input): Json<NewTrait>,
) -> ApiResult<Created<Trait>> {
    Ok(created(state.engine.traits.create(&ctx, input).await?))
}

/// `GET /api/v1/traits`
pub async fn list_traits(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
) -> ApiResult<Json<Vec<Trait>>> {
    Ok(Json(state.engine.traits.list(&ctx).await?))
}

/// `GET /api/v1/traits/{id}`
pub async fn get_trait(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<TraitId>,
) -> ApiResult<Json<Trait>> {
    Ok(Json(state.engine.traits.get(&ctx, id).await?))
}

/// `PUT /api/v1/traits/{id}`
pub async fn update_trait(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<TraitId>,
    Json(changes): Json<TraitChanges>,
) -> ApiResult<Json<Trait>> {
    Ok(Json(state.engine.traits.update(&ctx, id, changes).await?))
}

/// `DELETE /api/v1/traits/{id}`
pub async fn delete_trait(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<TraitId>,
) -> ApiResult<StatusCode> {
    state.engine.traits.delete(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Archetypes
// ---------------------------------------------------------------------------

/// Body of `POST /api/v1/archetypes/{id}/traits`.
#[derive(Debug, Deserialize)]
pub struct ArchetypeTraitBody {
    /// Trait to bundle.
    pub trait_id: TraitId,
    /// Value copied onto characters created from the archetype.
    #[serde(default)]
    pub default_value: String,
}

/// `POST /api/v1/archetypes`
pub async fn create_archetype(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Json(input): Json<NewArchetype>,
) -> ApiResult<Created<Archetype>> {
    Ok(created(state.engine.archetypes.create(&ctx, input).await?))
}

/// `GET /api/v1/archetypes`
pub async fn list_archetypes(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
) -> ApiResult<Json<Vec<Archetype>>> {
    Ok(Json(state.engine.archetypes.list(&ctx).await?))
}

/// `GET /api/v1/archetypes/{id}`
pub async fn get_archetype(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<ArchetypeId>,
) -> ApiResult<Json<Archetype>> {
    Ok(Json(state.engine.archetypes.get(&ctx, id).await?))
}

/// `PUT /api/v1/archetypes/{id}`
pub async fn update_archetype(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<ArchetypeId>,
    Json(changes): Json<ArchetypeChanges>,
) -> ApiResult<Json<Archetype>> {
    Ok(Json(state.engine.archetypes.update(&ctx, id, changes).await?))
}

/// `DELETE /api/v1/archetypes/{id}`
pub async fn delete_archetype(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<ArchetypeId>,
) -> ApiResult<StatusCode> {
    state.engine.archetypes.delete(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/v1/archetypes/{id}/traits`
pub async fn add_archetype_trait(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<ArchetypeId>,
    Json(body): Json<ArchetypeTraitBody>,
) -> ApiResult<Json<Archetype>> {
    let archetype = state
        .engine
        .archetypes
        .add_trait(&ctx, id, body.trait_id, body.default_value)
        .await?;
    Ok(Json(archetype))
}

/// `DELETE /api/v1/archetypes/{id}/traits/{trait_id}`
pub async fn remove_archetype_trait(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path((id, trait_id)): Path<(ArchetypeId, TraitId)>,
) -> ApiResult<Json<Archetype>> {
    Ok(Json(
        state.engine.archetypes.remove_trait(&ctx, id, trait_id).await?,
    ))
}
