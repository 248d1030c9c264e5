//! REST endpoint handlers.
//!
//! Handlers are thin: extract the tenant, the path and the body, call one
//! engine service, and wrap the result. Creates answer `201`, deletes
//! answer `204`, everything else `200`.
//!
//! # Modules
//!
//! - [`tenants`] -- Tenant registry (public)
//! - [`worlds`] -- Worlds and world-scoped listings
//! - [`catalog`] -- Traits and archetypes
//! - [`characters`] -- Characters, their traits and classes
//! - [`artifacts`] -- Artifacts
//! - [`tree`] -- Locations, events, factions and lore
//! - [`timeline`] -- Epoch and timeline
//! - [`relations`] -- The relation graph
//! - [`references`] -- Per-owner reference lists
//! - [`stories`] -- Stories, clones and version graphs
//! - [`content`] -- Chapters, scenes, beats and content blocks
//! - [`rpg`] -- RPG systems, skills, classes, slots and items
//! - [`progression`] -- Character inventories and skills
//! - [`stats`] -- Versioned stats

pub mod artifacts;
pub mod catalog;
pub mod characters;
pub mod content;
pub mod progression;
pub mod references;
pub mod relations;
pub mod rpg;
pub mod stats;
pub mod stories;
pub mod tenants;
pub mod timeline;
pub mod tree;
pub mod worlds;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;

use crate::extract::Json;
use crate::state::AppState;

/// A `201 Created` response.
pub type Created<T> = (StatusCode, Json<T>);

/// Wrap a freshly created resource.
pub const fn created<T>(value: T) -> Created<T> {
    (StatusCode::CREATED, Json(value))
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Liveness plus store reachability. Always `200`; the `database` field
/// reports whether the store answered.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let database = match state.engine.ping().await {
        Ok(()) => "ok",
        Err(err) => {
            tracing::warn!(error = %err, "Health check could not reach the store");
            "unavailable"
        }
    };
    Json(serde_json::json!({ "status": "ok", "database": database }))
}
