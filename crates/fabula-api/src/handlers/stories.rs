//! Story endpoints: CRUD, cloning and the version graph.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use fabula_core::service::story::{CloneStory, NewStory, StoryChanges, VersionGraph};
use fabula_types::{Chapter, Scene, Story, StoryId};

use super::{Created, created};
use crate::error::{ApiError, ApiResult};
use crate::extract::{Json, Path};
use crate::state::AppState;
use crate::tenant::Tenant;

/// `POST /api/v1/stories`
pub async fn create(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Json(input): Json<NewStory>,
) -> ApiResult<Created<Story>> {
    Ok(created(state.engine.stories.create(&ctx, input).await?))
}

/// `GET /api/v1/stories`
pub async fn list(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
) -> ApiResult<Json<Vec<Story>>> {
    Ok(Json(state.engine.stories.list(&ctx).await?))
}

/// `GET /api/v1/stories/{id}`
pub async fn get(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<StoryId>,
) -> ApiResult<Json<Story>> {
    Ok(Json(state.engine.stories.get(&ctx, id).await?))
}

/// `PUT /api/v1/stories/{id}`
pub async fn update(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<StoryId>,
    Json(changes): Json<StoryChanges>,
) -> ApiResult<Json<Story>> {
    Ok(Json(state.engine.stories.update(&ctx, id, changes).await?))
}

/// `DELETE /api/v1/stories/{id}`
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<StoryId>,
) -> ApiResult<StatusCode> {
    state.engine.stories.delete(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/v1/stories/{id}/clone`
///
/// The body is optional; an empty body keeps the source title.
pub async fn clone_story(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<StoryId>,
    body: Bytes,
) -> ApiResult<Created<Story>> {
    let input = if body.iter().all(u8::is_ascii_whitespace) {
        CloneStory::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::Body(e.to_string()))?
    };
    Ok(created(
        state.engine.stories.clone_story(&ctx, id, input).await?,
    ))
}

/// `GET /api/v1/stories/{id}/versions`
///
/// The version graph of the lineage `id` belongs to.
pub async fn versions(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<StoryId>,
) -> ApiResult<Json<VersionGraph>> {
    Ok(Json(state.engine.stories.version_graph(&ctx, id).await?))
}

/// `GET /api/v1/stories/{root_id}/lineage`
///
/// Every version whose root is `root_id`, by version number.
pub async fn lineage(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(root): Path<StoryId>,
) -> ApiResult<Json<Vec<Story>>> {
    Ok(Json(
        state.engine.stories.list_versions_by_root(&ctx, root).await?,
    ))
}

/// `GET /api/v1/stories/{id}/chapters`
pub async fn chapters(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<StoryId>,
) -> ApiResult<Json<Vec<Chapter>>> {
    Ok(Json(state.engine.chapters.list_by_story(&ctx, id).await?))
}

/// `GET /api/v1/stories/{id}/scenes`
pub async fn scenes(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<StoryId>,
) -> ApiResult<Json<Vec<Scene>>> {
    Ok(Json(state.engine.scenes.list_by_story(&ctx, id).await?))
}
