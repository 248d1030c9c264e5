//! Endpoints shared by the hierarchical kinds.
//!
//! Locations, events, factions and lore expose the same routes. The
//! handlers are generic over [`TreeResource`] and the router instantiates
//! them once per kind.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use fabula_core::Engine;
use fabula_core::service::tree::{TreeKind, TreeService};
use fabula_types::{Event, Faction, Location, Lore, WorldId};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::{Created, created};
use crate::error::ApiResult;
use crate::extract::{Json, Path};
use crate::state::AppState;
use crate::tenant::Tenant;

/// A hierarchical kind with HTTP routes.
pub trait TreeResource:
    TreeKind<Draft: DeserializeOwned + 'static, Changes: DeserializeOwned + Send + 'static>
{
    /// Plural path segment (`locations`).
    const SEGMENT: &'static str;

    /// The engine service serving this kind.
    fn service(engine: &Engine) -> &TreeService<Self>;
}

impl TreeResource for Location {
    const SEGMENT: &'static str = "locations";

    fn service(engine: &Engine) -> &TreeService<Self> {
        &engine.locations
    }
}

impl TreeResource for Event {
    const SEGMENT: &'static str = "events";

    fn service(engine: &Engine) -> &TreeService<Self> {
        &engine.events
    }
}

impl TreeResource for Faction {
    const SEGMENT: &'static str = "factions";

    fn service(engine: &Engine) -> &TreeService<Self> {
        &engine.factions
    }
}

impl TreeResource for Lore {
    const SEGMENT: &'static str = "lore";

    fn service(engine: &Engine) -> &TreeService<Self> {
        &engine.lore
    }
}

/// Body of `PUT /api/v1/{kind}/{id}/move`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MoveBody {
    /// New parent; absent or null makes the node a root.
    pub parent_id: Option<Uuid>,
}

/// `POST /api/v1/{kind}`
pub async fn create<T: TreeResource>(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Json(draft): Json<T::Draft>,
) -> ApiResult<Created<T>> {
    Ok(created(T::service(&state.engine).create(&ctx, draft).await?))
}

/// `GET /api/v1/{kind}/{id}`
pub async fn get<T: TreeResource>(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<T>> {
    Ok(Json(T::service(&state.engine).get(&ctx, id.into()).await?))
}

/// `GET /api/v1/worlds/{world_id}/{kind}`
pub async fn list<T: TreeResource>(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(world): Path<WorldId>,
) -> ApiResult<Json<Vec<T>>> {
    Ok(Json(
        T::service(&state.engine).list_by_world(&ctx, world).await?,
    ))
}

/// `PUT /api/v1/{kind}/{id}`
pub async fn update<T: TreeResource>(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<Uuid>,
    Json(changes): Json<T::Changes>,
) -> ApiResult<Json<T>> {
    let node = T::service(&state.engine)
        .update(&ctx, id.into(), changes)
        .await?;
    Ok(Json(node))
}

/// `DELETE /api/v1/{kind}/{id}`
pub async fn delete<T: TreeResource>(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    T::service(&state.engine).delete(&ctx, id.into()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PUT /api/v1/{kind}/{id}/move`
pub async fn move_to<T: TreeResource>(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<Uuid>,
    Json(body): Json<MoveBody>,
) -> ApiResult<Json<T>> {
    let node = T::service(&state.engine)
        .move_to(&ctx, id.into(), body.parent_id.map(Into::into))
        .await?;
    Ok(Json(node))
}

/// `GET /api/v1/{kind}/{id}/children`
pub async fn children<T: TreeResource>(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<T>>> {
    Ok(Json(
        T::service(&state.engine).children(&ctx, id.into()).await?,
    ))
}

/// `GET /api/v1/{kind}/{id}/ancestors`
pub async fn ancestors<T: TreeResource>(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<T>>> {
    Ok(Json(
        T::service(&state.engine).ancestors(&ctx, id.into()).await?,
    ))
}

/// `GET /api/v1/{kind}/{id}/descendants`
pub async fn descendants<T: TreeResource>(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<T>>> {
    Ok(Json(
        T::service(&state.engine).descendants(&ctx, id.into()).await?,
    ))
}
