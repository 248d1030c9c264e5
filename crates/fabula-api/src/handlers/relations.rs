//! Relation graph endpoints.
//!
//! Listings are cursor-paginated over `(created_at, id)`. Query
//! parameters: `relation_type`, `exclude_mirrors`, `cursor`,
//! `order=asc|desc` and `limit` (default 50, capped at 100).

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use fabula_core::CoreError;
use fabula_core::graph::{CreatedRelation, ListOptions, NewRelation, Page, RelationChanges};
use fabula_core::store::SortDirection;
use fabula_types::{EntityKind, EntityRelation, RelationId, WorldId};
use serde::Deserialize;
use uuid::Uuid;

use super::{Created, created};
use crate::error::{ApiError, ApiResult};
use crate::extract::{Json, Path, Query};
use crate::state::AppState;
use crate::tenant::Tenant;

/// Query of the paginated relation listings.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    /// Only edges with this label.
    pub relation_type: Option<String>,
    /// Hide the mirror half of mirrored pairs.
    pub exclude_mirrors: Option<bool>,
    /// Cursor from the previous page.
    pub cursor: Option<String>,
    /// `asc` (default) or `desc`.
    pub order: Option<String>,
    /// Page size.
    pub limit: Option<u32>,
}

impl TryFrom<ListQuery> for ListOptions {
    type Error = ApiError;

    fn try_from(query: ListQuery) -> Result<Self, Self::Error> {
        let direction = match query.order.as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("asc") => SortDirection::Asc,
            Some("desc") => SortDirection::Desc,
            Some(other) => {
                return Err(CoreError::validation(
                    "order",
                    format!("order must be asc or desc, got {other:?}"),
                )
                .into());
            }
        };
        Ok(Self {
            relation_type: query.relation_type.filter(|t| !t.trim().is_empty()),
            exclude_mirrors: query.exclude_mirrors.unwrap_or(false),
            cursor: query.cursor.filter(|c| !c.is_empty()),
            direction,
            limit: query.limit,
        })
    }
}

/// Parse an entity kind path segment.
pub(crate) fn entity_kind(field: &'static str, segment: &str) -> Result<EntityKind, ApiError> {
    segment
        .parse()
        .map_err(|e| CoreError::validation(field, format!("{e}")).into())
}

/// `POST /api/v1/relations`
pub async fn create(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Json(input): Json<NewRelation>,
) -> ApiResult<Created<CreatedRelation>> {
    Ok(created(state.engine.relations.create(&ctx, input).await?))
}

/// `GET /api/v1/relations/{id}`
pub async fn get(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<RelationId>,
) -> ApiResult<Json<EntityRelation>> {
    Ok(Json(state.engine.relations.get(&ctx, id).await?))
}

/// `PUT /api/v1/relations/{id}`
pub async fn update(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<RelationId>,
    Json(changes): Json<RelationChanges>,
) -> ApiResult<Json<EntityRelation>> {
    Ok(Json(state.engine.relations.update(&ctx, id, changes).await?))
}

/// `DELETE /api/v1/relations/{id}`
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<RelationId>,
) -> ApiResult<StatusCode> {
    state.engine.relations.delete(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/v1/relations/source/{kind}/{id}`
pub async fn list_by_source(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path((kind, id)): Path<(String, Uuid)>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<EntityRelation>>> {
    let kind = entity_kind("source_type", &kind)?;
    let page = state
        .engine
        .relations
        .list_by_source(&ctx, kind, id, query.try_into()?)
        .await?;
    Ok(Json(page))
}

/// `GET /api/v1/relations/target/{kind}/{id}`
pub async fn list_by_target(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path((kind, id)): Path<(String, Uuid)>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<EntityRelation>>> {
    let kind = entity_kind("target_type", &kind)?;
    let page = state
        .engine
        .relations
        .list_by_target(&ctx, kind, id, query.try_into()?)
        .await?;
    Ok(Json(page))
}

/// `GET /api/v1/worlds/{id}/relations`
pub async fn list_by_world(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(world): Path<WorldId>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<EntityRelation>>> {
    let page = state
        .engine
        .relations
        .list_by_world(&ctx, world, query.try_into()?)
        .await?;
    Ok(Json(page))
}

/// `DELETE /api/v1/relations/entity/{kind}/{id}`
///
/// Drops every edge touching the entity and reports how many went.
pub async fn delete_by_entity(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path((kind, id)): Path<(String, Uuid)>,
) -> ApiResult<Json<serde_json::Value>> {
    let kind = entity_kind("entity_type", &kind)?;
    let deleted = state
        .engine
        .relations
        .delete_by_entity(&ctx, kind, id)
        .await?;
    Ok(Json(serde_json::json!({ "deleted": deleted })))
}
