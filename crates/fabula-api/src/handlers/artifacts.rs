//! Artifact endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use fabula_core::service::artifact::{ArtifactChanges, NewArtifact};
use fabula_types::{Artifact, ArtifactId};

use super::{Created, created};
use crate::error::ApiResult;
use crate::extract::{Json, Path};
use crate::state::AppState;
use crate::tenant::Tenant;

/// `POST /api/v1/artifacts`
pub async fn create(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Json(input): Json<NewArtifact>,
) -> ApiResult<Created<Artifact>> {
    Ok(created(state.engine.artifacts.create(&ctx, input).await?))
}

/// `GET /api/v1/artifacts/{id}`
pub async fn get(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<ArtifactId>,
) -> ApiResult<Json<Artifact>> {
    Ok(Json(state.engine.artifacts.get(&ctx, id).await?))
}

/// `PUT /api/v1/artifacts/{id}`
pub async fn update(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<ArtifactId>,
    Json(changes): Json<ArtifactChanges>,
) -> ApiResult<Json<Artifact>> {
    Ok(Json(state.engine.artifacts.update(&ctx, id, changes).await?))
}

/// `DELETE /api/v1/artifacts/{id}`
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<ArtifactId>,
) -> ApiResult<StatusCode> {
    state.engine.artifacts.delete(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
