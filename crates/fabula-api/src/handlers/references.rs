//! Reference list endpoints.
//!
//! Artifacts, events, factions, lore, scenes and content blocks keep a
//! reference list backed by the relation graph:
//!
//! | Method | Path |
//! |--------|------|
//! | `GET`/`POST` | `/api/v1/{owner}/{id}/references` |
//! | `DELETE` | `/api/v1/{owner}/{id}/references/{entity_type}/{entity_id}` |
//! | `PUT` | `/api/v1/{owner_kind}-references/{reference_id}` |

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use fabula_core::service::ReferenceAdapter;
use fabula_core::service::reference::{NewReference, Reference, ReferenceChanges};
use fabula_types::{EntityKind, RelationId};
use uuid::Uuid;

use super::relations::entity_kind;
use super::{Created, created};
use crate::error::ApiResult;
use crate::extract::{Json, Path};
use crate::state::AppState;
use crate::tenant::Tenant;

/// An owner kind with reference routes.
pub trait ReferenceOwner: Send + Sync + 'static {
    /// Owner kind.
    const KIND: EntityKind;
    /// Plural path segment of the owner (`content-blocks`).
    const SEGMENT: &'static str;
    /// Path segment of the reference update route (`content-block-references`).
    const REFERENCES_SEGMENT: &'static str;
}

macro_rules! reference_owner {
    ($(#[$meta:meta])* $name:ident, $kind:ident, $segment:literal, $references:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl ReferenceOwner for $name {
            const KIND: EntityKind = EntityKind::$kind;
            const SEGMENT: &'static str = $segment;
            const REFERENCES_SEGMENT: &'static str = $references;
        }
    };
}

reference_owner!(
    /// Artifact reference lists.
    ArtifactOwner, Artifact, "artifacts", "artifact-references"
);
reference_owner!(
    /// Event reference lists.
    EventOwner, Event, "events", "event-references"
);
reference_owner!(
    /// Faction reference lists.
    FactionOwner, Faction, "factions", "faction-references"
);
reference_owner!(
    /// Lore reference lists.
    LoreOwner, Lore, "lore", "lore-references"
);
reference_owner!(
    /// Scene reference lists.
    SceneOwner, Scene, "scenes", "scene-references"
);
reference_owner!(
    /// Content block reference lists.
    ContentBlockOwner, ContentBlock, "content-blocks", "content-block-references"
);

/// `GET /api/v1/{owner}/{id}/references`
pub async fn list<O: ReferenceOwner>(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Reference>>> {
    let references = state
        .engine
        .references
        .list_references(&ctx, O::KIND, id)
        .await?;
    Ok(Json(references))
}

/// `POST /api/v1/{owner}/{id}/references`
pub async fn add<O: ReferenceOwner>(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<Uuid>,
    Json(input): Json<NewReference>,
) -> ApiResult<Created<Reference>> {
    let reference = state
        .engine
        .references
        .add_reference(&ctx, O::KIND, id, input)
        .await?;
    Ok(created(reference))
}

/// `DELETE /api/v1/{owner}/{id}/references/{entity_type}/{entity_id}`
pub async fn remove<O: ReferenceOwner>(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path((id, entity_type, entity_id)): Path<(Uuid, String, Uuid)>,
) -> ApiResult<StatusCode> {
    let entity_type = entity_kind("entity_type", &entity_type)?;
    state
        .engine
        .references
        .remove_reference(&ctx, O::KIND, id, entity_type, entity_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PUT /api/v1/{owner_kind}-references/{id}`
pub async fn update<O: ReferenceOwner>(
    State(state): State<Arc<AppState>>,
    Tenant(ctx): Tenant,
    Path(id): Path<RelationId>,
    Json(changes): Json<ReferenceChanges>,
) -> ApiResult<Json<Reference>> {
    let reference = state
        .engine
        .references
        .update_reference(&ctx, O::KIND, id, changes)
        .await?;
    Ok(Json(reference))
}
