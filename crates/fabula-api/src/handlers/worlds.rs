//! World endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use fabula_core::service::world::{NewWorld, WorldChanges};
use fabula_types::{Artifact, Character, World, WorldId};

use super::{Created, created};
use crate::error::ApiResult;
use crate::extract::{Json, Path};
use crate::state::AppState;
use crate::tenant::Tenant;

/// `POST /api/v1/worlds`
pub async fn create(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Json(input): Json<NewWorld>,
) -> ApiResult<Created<World>> {
    Ok(created(state.engine.worlds.create(&ctx, input).await?))
}

/// `GET /api/v1/worlds`
pub async fn list(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
) -> ApiResult<Json<Vec<World>>> {
    Ok(Json(state.engine.worlds.list(&ctx).await?))
}

/// `GET /api/v1/worlds/{id}`
pub async fn get(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<WorldId>,
) -> ApiResult<Json<World>> {
    Ok(Json(state.engine.worlds.get(&ctx, id).await?))
}

/// `PUT /api/v1/worlds/{id}`
pub async fn update(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<WorldId>,
    Json(changes): Json<WorldChanges>,
) -> ApiResult<Json<World>> {
    Ok(Json(state.engine.worlds.update(&ctx, id, changes).await?))
}

/// `DELETE /api/v1/worlds/{id}`
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<WorldId>,
) -> ApiResult<StatusCode> {
    state.engine.worlds.delete(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/v1/worlds/{id}/characters`
pub async fn characters(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<WorldId>,
) -> ApiResult<Json<Vec<Character>>> {
    Ok(Json(state.engine.characters.list_by_world(&ctx, id).await?))
}

/// `GET /api/v1/worlds/{id}/artifacts`
pub async fn artifacts(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<WorldId>,
) -> ApiResult<Json<Vec<Artifact>>> {
    Ok(Json(state.engine.artifacts.list_by_world(&ctx, id).await?))
}
