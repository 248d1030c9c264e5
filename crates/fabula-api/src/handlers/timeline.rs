//! Epoch and timeline endpoints.

use std::sync::Arc;

use axum::extract::State;
use fabula_core::service::timeline::TimelineRange;
use fabula_types::{Event, EventId, WorldId};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::extract::{Json, Path, Query};
use crate::state::AppState;
use crate::tenant::Tenant;

/// Query of `GET /api/v1/worlds/{id}/timeline`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TimelineQuery {
    /// Inclusive lower bound on `timeline_position`.
    pub from: Option<f64>,
    /// Exclusive upper bound on `timeline_position`.
    pub to: Option<f64>,
}

/// `GET /api/v1/worlds/{id}/timeline`
///
/// Events ordered by timeline position. With a range, events without a
/// position are left out.
pub async fn timeline(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(world): Path<WorldId>,
    Query(query): Query<TimelineQuery>,
) -> ApiResult<Json<Vec<Event>>> {
    let range = TimelineRange {
        from: query.from,
        to: query.to,
    };
    Ok(Json(state.engine.events.timeline(&ctx, world, range).await?))
}

/// `GET /api/v1/worlds/{id}/epoch`
pub async fn get_epoch(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(world): Path<WorldId>,
) -> ApiResult<Json<Event>> {
    Ok(Json(state.engine.events.get_epoch(&ctx, world).await?))
}

/// `PUT /api/v1/events/{id}/epoch`
pub async fn set_epoch(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<EventId>,
) -> ApiResult<Json<Event>> {
    Ok(Json(state.engine.events.set_epoch(&ctx, id).await?))
}
