//! Axum router construction.
//!
//! Public routes (`/health` and the tenant registry) skip tenant
//! extraction; every other route runs behind [`resolve_tenant`].
//!
//! Layers, outer to inner: CORS, panic recovery, request tracing, request
//! timeout, tenant extraction (protected routes only).

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use fabula_types::{Artifact, Character, Event, Faction, Location, Lore};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::references::{
    ArtifactOwner, ContentBlockOwner, EventOwner, FactionOwner, LoreOwner, ReferenceOwner,
    SceneOwner,
};
use crate::handlers::stats::StatsResource;
use crate::handlers::tree::TreeResource;
use crate::handlers::{
    self, artifacts, catalog, characters, content, progression, references, relations, rpg,
    stats, stories, tenants, timeline, tree, worlds,
};
use crate::state::AppState;
use crate::tenant::{TenantMode, resolve_tenant};

/// Upper bound on the time spent serving one request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

type Routes = Router<Arc<AppState>>;

/// Build the complete router.
///
/// `mode` selects header-based tenancy or a fixed tenant.
pub fn build_router(state: Arc<AppState>, mode: TenantMode) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    let public = Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/v1/tenants",
            post(tenants::create).get(tenants::list),
        )
        .route(
            "/api/v1/tenants/{id}",
            get(tenants::get).put(tenants::update),
        );

    let protected =
        protected_routes().route_layer(middleware::from_fn_with_state(mode, resolve_tenant));

    public
        .merge(protected)
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors)
        .with_state(state)
}

fn protected_routes() -> Routes {
    let router = Router::new()
        // Worlds
        .route("/api/v1/worlds", post(worlds::create).get(worlds::list))
        .route(
            "/api/v1/worlds/{id}",
            get(worlds::get).put(worlds::update).delete(worlds::delete),
        )
        .route("/api/v1/worlds/{id}/characters", get(worlds::characters))
        .route("/api/v1/worlds/{id}/artifacts", get(worlds::artifacts))
        .route("/api/v1/worlds/{id}/relations", get(relations::list_by_world))
        .route("/api/v1/worlds/{id}/timeline", get(timeline::timeline))
        .route("/api/v1/worlds/{id}/epoch", get(timeline::get_epoch))
        // Traits and archetypes
        .route(
            "/api/v1/traits",
            post(catalog::create_trait).get(catalog::list_traits),
        )
        .route(
            "/api/v1/traits/{id}",
            get(catalog::get_trait)
                .put(catalog::update_trait)
                .delete(catalog::delete_trait),
        )
        .route(
            "/api/v1/archetypes",
            post(catalog::create_archetype).get(catalog::list_archetypes),
        )
        .route(
            "/api/v1/archetypes/{id}",
            get(catalog::get_archetype)
                .put(catalog::update_archetype)
                .delete(catalog::delete_archetype),
        )
        .route(
            "/api/v1/archetypes/{id}/traits",
            post(catalog::add_archetype_trait),
        )
        .route(
            "/api/v1/archetypes/{id}/traits/{trait_id}",
            delete(catalog::remove_archetype_trait),
        )
        // Characters
        .route("/api/v1/characters", post(characters::create))
        .route(
            "/api/v1/characters/{id}",
            get(characters::get)
                .put(characters::update)
                .delete(characters::delete),
        )
        .route(
            "/api/v1/characters/{id}/traits",
            get(characters::list_traits).post(characters::add_trait),
        )
        .route(
            "/api/v1/characters/{id}/traits/{trait_id}",
            put(characters::update_trait).delete(characters::remove_trait),
        )
        .route("/api/v1/characters/{id}/class", put(characters::change_class))
        .route(
            "/api/v1/characters/{id}/inventory",
            get(progression::list_inventory).post(progression::add_item),
        )
        .route(
            "/api/v1/characters/{id}/skills",
            get(progression::list_skills).post(progression::learn),
        )
        .route(
            "/api/v1/characters/{id}/skills/{skill_id}",
            put(progression::update_skill).delete(progression::forget),
        )
        .route(
            "/api/v1/inventory/{id}",
            put(progression::update_entry).delete(progression::remove_entry),
        )
        .route("/api/v1/inventory/{id}/equip", post(progression::equip))
        .route("/api/v1/inventory/{id}/unequip", post(progression::unequip))
        .route("/api/v1/inventory/{id}/transfer", post(progression::transfer))
        // Artifacts
        .route("/api/v1/artifacts", post(artifacts::create))
        .route(
            "/api/v1/artifacts/{id}",
            get(artifacts::get)
                .put(artifacts::update)
                .delete(artifacts::delete),
        )
        // Timeline
        .route("/api/v1/events/{id}/epoch", put(timeline::set_epoch))
        .route("/api/v1/events/{id}/stat-changes", get(stats::by_event))
        // Relations
        .route("/api/v1/relations", post(relations::create))
        .route(
            "/api/v1/relations/{id}",
            get(relations::get)
                .put(relations::update)
                .delete(relations::delete),
        )
        .route(
            "/api/v1/relations/source/{kind}/{id}",
            get(relations::list_by_source),
        )
        .route(
            "/api/v1/relations/target/{kind}/{id}",
            get(relations::list_by_target),
        )
        .route(
            "/api/v1/relations/entity/{kind}/{id}",
            delete(relations::delete_by_entity),
        )
        // Stories
        .route("/api/v1/stories", post(stories::create).get(stories::list))
        .route(
            "/api/v1/stories/{id}",
            get(stories::get).put(stories::update).delete(stories::delete),
        )
        .route("/api/v1/stories/{id}/clone", post(stories::clone_story))
        .route("/api/v1/stories/{id}/versions", get(stories::versions))
        .route("/api/v1/stories/{id}/lineage", get(stories::lineage))
        .route("/api/v1/stories/{id}/chapters", get(stories::chapters))
        .route("/api/v1/stories/{id}/scenes", get(stories::scenes))
        // Chapters, scenes, beats, content blocks
        .route("/api/v1/chapters", post(content::create_chapter))
        .route(
            "/api/v1/chapters/{id}",
            get(content::get_chapter)
                .put(content::update_chapter)
                .delete(content::delete_chapter),
        )
        .route("/api/v1/chapters/{id}/scenes", get(content::chapter_scenes))
        .route(
            "/api/v1/chapters/{id}/content-blocks",
            get(content::chapter_blocks),
        )
        .route("/api/v1/scenes", post(content::create_scene))
        .route(
            "/api/v1/scenes/{id}",
            get(content::get_scene)
                .put(content::update_scene)
                .delete(content::delete_scene),
        )
        .route("/api/v1/scenes/{id}/move", put(content::move_scene))
        .route("/api/v1/scenes/{id}/beats", get(content::scene_beats))
        .route("/api/v1/beats", post(content::create_beat))
        .route(
            "/api/v1/beats/{id}",
            get(content::get_beat)
                .put(content::update_beat)
                .delete(content::delete_beat),
        )
        .route("/api/v1/beats/{id}/move", put(content::move_beat))
        .route("/api/v1/content-blocks", post(content::create_block))
        .route(
            "/api/v1/content-blocks/{id}",
            get(content::get_block)
                .put(content::update_block)
                .delete(content::delete_block),
        )
        // RPG overlay
        .route(
            "/api/v1/rpg-systems",
            post(rpg::create_system).get(rpg::list_systems),
        )
        .route(
            "/api/v1/rpg-systems/{id}",
            get(rpg::get_system)
                .put(rpg::update_system)
                .delete(rpg::delete_system),
        )
        .route("/api/v1/rpg-systems/{id}/skills", get(rpg::system_skills))
        .route("/api/v1/rpg-systems/{id}/classes", get(rpg::system_classes))
        .route("/api/v1/rpg-systems/{id}/slots", get(rpg::system_slots))
        .route("/api/v1/rpg-systems/{id}/items", get(rpg::system_items))
        .route("/api/v1/rpg-skills", post(rpg::create_skill))
        .route(
            "/api/v1/rpg-skills/{id}",
            get(rpg::get_skill)
                .put(rpg::update_skill)
                .delete(rpg::delete_skill),
        )
        .route("/api/v1/rpg-classes", post(rpg::create_class))
        .route(
            "/api/v1/rpg-classes/{id}",
            get(rpg::get_class)
                .put(rpg::update_class)
                .delete(rpg::delete_class),
        )
        .route(
            "/api/v1/rpg-classes/{id}/skills",
            get(rpg::class_skills).post(rpg::add_class_skill),
        )
        .route(
            "/api/v1/rpg-classes/{id}/skills/{skill_id}",
            delete(rpg::remove_class_skill),
        )
        .route("/api/v1/inventory-slots", post(rpg::create_slot))
        .route("/api/v1/inventory-slots/{id}", delete(rpg::delete_slot))
        .route("/api/v1/inventory-items", post(rpg::create_item))
        .route(
            "/api/v1/inventory-items/{id}",
            get(rpg::get_item)
                .put(rpg::update_item)
                .delete(rpg::delete_item),
        );

    let router = tree_routes::<Location>(router);
    let router = tree_routes::<Event>(router);
    let router = tree_routes::<Faction>(router);
    let router = tree_routes::<Lore>(router);

    let router = reference_routes::<ArtifactOwner>(router);
    let router = reference_routes::<EventOwner>(router);
    let router = reference_routes::<FactionOwner>(router);
    let router = reference_routes::<LoreOwner>(router);
    let router = reference_routes::<SceneOwner>(router);
    let router = reference_routes::<ContentBlockOwner>(router);

    let router = stats_routes::<Character>(router);
    stats_routes::<Artifact>(router)
}

fn tree_routes<T: TreeResource>(router: Routes) -> Routes {
    let base = format!("/api/v1/{}", T::SEGMENT);
    router
        .route(&base, post(tree::create::<T>))
        .route(
            &format!("{base}/{{id}}"),
            get(tree::get::<T>)
                .put(tree::update::<T>)
                .delete(tree::delete::<T>),
        )
        .route(&format!("{base}/{{id}}/move"), put(tree::move_to::<T>))
        .route(&format!("{base}/{{id}}/children"), get(tree::children::<T>))
        .route(&format!("{base}/{{id}}/ancestors"), get(tree::ancestors::<T>))
        .route(
            &format!("{base}/{{id}}/descendants"),
            get(tree::descendants::<T>),
        )
        .route(
            &format!("/api/v1/worlds/{{id}}/{}", T::SEGMENT),
            get(tree::list::<T>),
        )
}

fn reference_routes<O: ReferenceOwner>(router: Routes) -> Routes {
    let base = format!("/api/v1/{}/{{id}}/references", O::SEGMENT);
    router
        .route(&base, get(references::list::<O>).post(references::add::<O>))
        .route(
            &format!("{base}/{{entity_type}}/{{entity_id}}"),
            delete(references::remove::<O>),
        )
        .route(
            &format!("/api/v1/{}/{{id}}", O::REFERENCES_SEGMENT),
            put(references::update::<O>),
        )
}

fn stats_routes<S: StatsResource>(router: Routes) -> Routes {
    let base = format!("/api/v1/{}/{{id}}/rpg-stats", S::SEGMENT);
    router
        .route(
            &base,
            get(stats::active::<S>)
                .post(stats::create::<S>)
                .delete(stats::delete_all::<S>),
        )
        .route(&format!("{base}/history"), get(stats::history::<S>))
        .route(
            &format!("{base}/{{stats_id}}/activate"),
            put(stats::activate::<S>),
        )
}

/// Convert a handler panic into the JSON `500` body.
#[allow(clippy::needless_pass_by_value)]
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %detail, "Handler panicked");

    let body = serde_json::json!({
        "error": "internal_error",
        "message": "internal server error",
        "code": StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
        "details": {},
    });
    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
}
