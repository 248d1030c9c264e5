//! Versioned stats endpoints for characters and artifacts.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use fabula_core::service::stats::{NewStatsVersion, StatsService, StatsSubject};
use fabula_core::{CoreError, Engine};
use fabula_types::{Artifact, Character, EventId, StatsVersion, StatsVersionId};
use uuid::Uuid;

use super::{Created, created};
use crate::error::ApiResult;
use crate::extract::{Json, Path};
use crate::state::AppState;
use crate::tenant::Tenant;

/// A stats subject with HTTP routes.
pub trait StatsResource: StatsSubject<Id: From<Uuid>> {
    /// Plural path segment of the subject.
    const SEGMENT: &'static str;

    /// The engine service holding this subject's chains.
    fn service(engine: &Engine) -> &StatsService<Self>;
}

impl StatsResource for Character {
    const SEGMENT: &'static str = "characters";

    fn service(engine: &Engine) -> &StatsService<Self> {
        &engine.character_stats
    }
}

impl StatsResource for Artifact {
    const SEGMENT: &'static str = "artifacts";

    fn service(engine: &Engine) -> &StatsService<Self> {
        &engine.artifact_stats
    }
}

/// `GET /api/v1/{subject}/{id}/rpg-stats`
pub async fn active<S: StatsResource>(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<StatsVersion>> {
    Ok(Json(
        S::service(&state.engine).get_active(&ctx, id.into()).await?,
    ))
}

/// `POST /api/v1/{subject}/{id}/rpg-stats`
pub async fn create<S: StatsResource>(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<Uuid>,
    Json(input): Json<NewStatsVersion>,
) -> ApiResult<Created<StatsVersion>> {
    let version = S::service(&state.engine)
        .create_version(&ctx, id.into(), input)
        .await?;
    Ok(created(version))
}

/// `GET /api/v1/{subject}/{id}/rpg-stats/history`
pub async fn history<S: StatsResource>(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<StatsVersion>>> {
    Ok(Json(
        S::service(&state.engine).list_history(&ctx, id.into()).await?,
    ))
}

/// `PUT /api/v1/{subject}/{id}/rpg-stats/{stats_id}/activate`
///
/// The version must belong to the subject named in the path.
pub async fn activate<S: StatsResource>(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path((id, stats_id)): Path<(Uuid, StatsVersionId)>,
) -> ApiResult<Json<StatsVersion>> {
    let service = S::service(&state.engine);
    let history = service.list_history(&ctx, id.into()).await?;
    if !history.iter().any(|v| v.id == stats_id) {
        return Err(CoreError::not_found("stats version", stats_id).into());
    }
    Ok(Json(service.activate_version(&ctx, stats_id).await?))
}

/// `DELETE /api/v1/{subject}/{id}/rpg-stats`
pub async fn delete_all<S: StatsResource>(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    S::service(&state.engine).delete_all(&ctx, id.into()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/v1/events/{id}/stat-changes`
///
/// Character and artifact versions caused by the event, characters first.
pub async fn by_event(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(event): Path<EventId>,
) -> ApiResult<Json<Vec<StatsVersion>>> {
    Ok(Json(
        state
            .engine
            .character_stats
            .list_by_event(&ctx, event)
            .await?,
    ))
}
