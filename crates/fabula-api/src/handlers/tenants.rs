//! Tenant registry endpoints. These bypass tenant extraction.

use std::sync::Arc;

use axum::extract::State;
use fabula_core::service::tenant::{NewTenant, TenantChanges};
use fabula_types::{Tenant, TenantId};

use super::{Created, created};
use crate::error::ApiResult;
use crate::extract::{Json, Path};
use crate::state::AppState;

/// `POST /api/v1/tenants`
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(input): Json<NewTenant>,
) -> ApiResult<Created<Tenant>> {
    Ok(created(state.engine.tenants.create(input).await?))
}

/// `GET /api/v1/tenants`
pub async fn list(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Tenant>>> {
    Ok(Json(state.engine.tenants.list().await?))
}

/// `GET /api/v1/tenants/{id}`
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TenantId>,
) -> ApiResult<Json<Tenant>> {
    Ok(Json(state.engine.tenants.get(id).await?))
}

/// `PUT /api/v1/tenants/{id}`
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TenantId>,
    Json(changes): Json<TenantChanges>,
) -> ApiResult<Json<Tenant>> {
    Ok(Json(state.engine.tenants.update(id, changes).await?))
}
