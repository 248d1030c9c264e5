//! Chapter, scene, beat and content block endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use fabula_core::service::content::{
    BeatChanges, ChapterChanges, ContentBlockChanges, NewBeat, NewChapter, NewContentBlock,
    NewScene, SceneChanges,
};
use fabula_types::{
    Beat, BeatId, Chapter, ChapterId, ContentBlock, ContentBlockId, Scene, SceneId,
};
use serde::Deserialize;

use super::{Created, created};
use crate::error::ApiResult;
use crate::extract::{Json, Path};
use crate::state::AppState;
use crate::tenant::Tenant;

/// Body of `PUT /api/v1/scenes/{id}/move`.
#[derive(Debug, Deserialize)]
pub struct MoveSceneBody {
    /// Target chapter of the same story.
    pub chapter_id: ChapterId,
}

/// Body of `PUT /api/v1/beats/{id}/move`.
#[derive(Debug, Deserialize)]
pub struct MoveBeatBody {
    /// Target scene of the same story.
    pub scene_id: SceneId,
}

// ---------------------------------------------------------------------------
// Chapters
// ---------------------------------------------------------------------------

/// `POST /api/v1/chapters`
pub async fn create_chapter(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Json(input): Json<NewChapter>,
) -> ApiResult<Created<Chapter>> {
    Ok(created(state.engine.chapters.create(&ctx, input).await?))
}

/// `GET /api/v1/chapters/{id}`
pub async fn get_chapter(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<ChapterId>,
) -> ApiResult<Json<Chapter>> {
    Ok(Json(state.engine.chapters.get(&ctx, id).await?))
}

/// `PUT /api/v1/chapters/{id}`
pub async fn update_chapter(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<ChapterId>,
    Json(changes): Json<ChapterChanges>,
) -> ApiResult<Json<Chapter>> {
    Ok(Json(state.engine.chapters.update(&ctx, id, changes).await?))
}

/// `DELETE /api/v1/chapters/{id}`
pub async fn delete_chapter(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<ChapterId>,
) -> ApiResult<StatusCode> {
    state.engine.chapters.delete(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/v1/chapters/{id}/scenes`
pub async fn chapter_scenes(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<ChapterId>,
) -> ApiResult<Json<Vec<Scene>>> {
    Ok(Json(state.engine.scenes.list_by_chapter(&ctx, id).await?))
}

/// `GET /api/v1/chapters/{id}/content-blocks`
pub async fn chapter_blocks(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<ChapterId>,
) -> ApiResult<Json<Vec<ContentBlock>>> {
    Ok(Json(
        state.engine.content_blocks.list_by_chapter(&ctx, id).await?,
    ))
}

// ---------------------------------------------------------------------------
// Scenes
// ---------------------------------------------------------------------------

/// `POST /api/v1/scenes`
pub async fn create_scene(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Json(input): Json<NewScene>,
) -> ApiResult<Created<Scene>> {
    Ok(created(state.engine.scenes.create(&ctx, input).await?))
}

/// `GET /api/v1/scenes/{id}`
pub async fn get_scene(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<SceneId>,
) -> ApiResult<Json<Scene>> {
    Ok(Json(state.engine.scenes.get(&ctx, id).await?))
}

/// `PUT /api/v1/scenes/{id}`
pub async fn update_scene(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<SceneId>,
    Json(changes): Json<SceneChanges>,
) -> ApiResult<Json<Scene>> {
    Ok(Json(state.engine.scenes.update(&ctx, id, changes).await?))
}

/// `PUT /api/v1/scenes/{id}/move`
pub async fn move_scene(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<SceneId>,
    Json(body): Json<MoveSceneBody>,
) -> ApiResult<Json<Scene>> {
    Ok(Json(
        state.engine.scenes.move_to(&ctx, id, body.chapter_id).await?,
    ))
}

/// `DELETE /api/v1/scenes/{id}`
pub async fn delete_scene(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<SceneId>,
) -> ApiResult<StatusCode> {
    state.engine.scenes.delete(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/v1/scenes/{id}/beats`
pub async fn scene_beats(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<SceneId>,
) -> ApiResult<Json<Vec<Beat>>> {
    Ok(Json(state.engine.beats.list_by_scene(&ctx, id).await?))
}

// ---------------------------------------------------------------------------
// Beats
// ---------------------------------------------------------------------------

/// `POST /api/v1/beats`
pub async fn create_beat(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Json(input): Json<NewBeat>,
) -> ApiResult<Created<Beat>> {
    Ok(created(state.engine.beats.create(&ctx, input).await?))
}

/// `GET /api/v1/beats/{id}`
pub async fn get_beat(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<BeatId>,
) -> ApiResult<Json<Beat>> {
    Ok(Json(state.engine.beats.get(&ctx, id).await?))
}

/// `PUT /api/v1/beats/{id}`
pub async fn update_beat(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<BeatId>,
    Json(changes): Json<BeatChanges>,
) -> ApiResult<Json<Beat>> {
    Ok(Json(state.engine.beats.update(&ctx, id, changes).await?))
}

/// `PUT /api/v1/beats/{id}/move`
pub async fn move_beat(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<BeatId>,
    Json(body): Json<MoveBeatBody>,
) -> ApiResult<Json<Beat>> {
    Ok(Json(
        state.engine.beats.move_to(&ctx, id, body.scene_id).await?,
    ))
}

/// `DELETE /api/v1/beats/{id}`
pub async fn delete_beat(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<BeatId>,
) -> ApiResult<StatusCode> {
    state.engine.beats.delete(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Content blocks
// ---------------------------------------------------------------------------

/// `POST /api/v1/content-blocks`
pub async fn create_block(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Json(input): Json<NewContentBlock>,
) -> ApiResult<Created<ContentBlock>> {
    Ok(created(
        state.engine.content_blocks.create(&ctx, input).await?,
    ))
}

/// `GET /api/v1/content-blocks/{id}`
pub async fn get_block(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<ContentBlockId>,
) -> ApiResult<Json<ContentBlock>> {
    Ok(Json(state.engine.content_blocks.get(&ctx, id).await?))
}

/// `PUT /api/v1/content-blocks/{id}`
pub async fn update_block(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<ContentBlockId>,
    Json(changes): Json<ContentBlockChanges>,
) -> ApiResult<Json<ContentBlock>> {
    Ok(Json(
        state.engine.content_blocks.update(&ctx, id, changes).await?,
    ))
}

/// `DELETE /api/v1/content-blocks/{id}`
pub async fn delete_block(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<ContentBlockId>,
) -> ApiResult<StatusCode> {
    state.engine.content_blocks.delete(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
