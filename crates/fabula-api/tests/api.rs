//! Integration tests for the HTTP API.
//!
//! Tests drive the Axum `Router` directly via `tower::ServiceExt` over an
//! in-memory store, without starting a TCP server.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use fabula_api::{AppState, TenantMode, build_router};
use fabula_core::{Engine, MemoryStore, SideChannels};
use fabula_types::TenantId;
use serde_json::{Value, json};
use tower::ServiceExt;

fn engine() -> Engine {
    Engine::new(Arc::new(MemoryStore::new()), Arc::new(SideChannels::noop()))
}

fn router(engine: &Engine) -> Router {
    build_router(Arc::new(AppState::new(engine.clone())), TenantMode::Header)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    tenant: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(tenant) = tenant {
        request = request.header("x-tenant-id", tenant);
    }
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Register a tenant and return its id.
async fn tenant(app: &Router, name: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/tenants",
        None,
        Some(json!({ "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_owned()
}

async fn world(app: &Router, tenant: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/worlds",
        Some(tenant),
        Some(json!({ "name": "Eldoria" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_owned()
}

// ---------------------------------------------------------------------------
// Health and tenancy
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_skips_tenant_extraction() {
    let app = router(&engine());
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "ok");
}

#[tokio::test]
async fn missing_tenant_header_is_unauthorized() {
    let app = router(&engine());
    let (status, body) = send(&app, "GET", "/api/v1/worlds", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
    assert_eq!(body["code"], 401);
}

#[tokio::test]
async fn malformed_tenant_header_is_bad_request() {
    let app = router(&engine());
    let (status, body) = send(&app, "GET", "/api/v1/worlds", Some("not-a-uuid"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["details"]["field"], "tenant_id");
}

#[tokio::test]
async fn duplicate_tenant_names_conflict() {
    let app = router(&engine());
    tenant(&app, "Acme").await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/tenants",
        None,
        Some(json!({ "name": "Acme" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "already_exists");
}

#[tokio::test]
async fn worlds_are_invisible_to_other_tenants() {
    let app = router(&engine());
    let a = tenant(&app, "A").await;
    let b = tenant(&app, "B").await;
    let world = world(&app, &a).await;

    let uri = format!("/api/v1/worlds/{world}");
    let (status, _) = send(&app, "GET", &uri, Some(&a), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&app, "GET", &uri, Some(&b), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn fixed_tenant_mode_ignores_the_header() {
    let engine = engine();
    engine
        .tenants
        .ensure(TenantId::OFFLINE_DEFAULT, "Default")
        .await
        .unwrap();
    let app = build_router(
        Arc::new(AppState::new(engine.clone())),
        TenantMode::Fixed(TenantId::OFFLINE_DEFAULT),
    );
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/worlds",
        None,
        Some(json!({ "name": "Solo" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["tenant_id"], TenantId::OFFLINE_DEFAULT.to_string());
}

// ---------------------------------------------------------------------------
// Hierarchies
// ---------------------------------------------------------------------------

#[tokio::test]
async fn moving_under_a_descendant_is_rejected() {
    let app = router(&engine());
    let t = tenant(&app, "Maps").await;
    let w = world(&app, &t).await;

    let mut ids = Vec::new();
    for name in ["Realm", "Province", "City"] {
        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/locations",
            Some(&t),
            Some(json!({ "world_id": w, "parent_id": ids.last(), "name": name })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        ids.push(body["id"].as_str().unwrap().to_owned());
    }
    let (realm, city) = (&ids[0], &ids[2]);

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/v1/locations/{realm}/move"),
        Some(&t),
        Some(json!({ "parent_id": city })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/v1/locations/{city}/ancestors"),
        Some(&t),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/v1/locations/{city}/move"),
        Some(&t),
        Some(json!({ "parent_id": null })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hierarchy_level"], 0);
}

// ---------------------------------------------------------------------------
// Relations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn relation_pages_chain_through_cursors() {
    let app = router(&engine());
    let t = tenant(&app, "Graph").await;
    let w = world(&app, &t).await;

    let mut characters = Vec::new();
    for i in 0..4 {
        let (_, body) = send(
            &app,
            "POST",
            "/api/v1/characters",
            Some(&t),
            Some(json!({ "world_id": w, "name": format!("C{i}") })),
        )
        .await;
        characters.push(body["id"].as_str().unwrap().to_owned());
    }
    for target in &characters[1..] {
        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/relations",
            Some(&t),
            Some(json!({
                "world_id": w,
                "source_type": "character",
                "source_id": characters[0],
                "target_type": "character",
                "target_id": target,
                "relation_type": "ally_of",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let base = format!("/api/v1/relations/source/character/{}", characters[0]);
    let (status, first) = send(&app, "GET", &format!("{base}?limit=2"), Some(&t), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["items"].as_array().unwrap().len(), 2);
    assert_eq!(first["has_more"], true);

    let cursor = first["next_cursor"]
        .as_str()
        .unwrap()
        .replace('+', "%2B")
        .replace('/', "%2F")
        .replace('=', "%3D");
    let (_, second) = send(
        &app,
        "GET",
        &format!("{base}?limit=2&cursor={cursor}"),
        Some(&t),
        None,
    )
    .await;
    assert_eq!(second["items"].as_array().unwrap().len(), 1);
    assert_eq!(second["has_more"], false);

    let (status, body) = send(
        &app,
        "GET",
        &format!("{base}?cursor=%25%25garbage"),
        Some(&t),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn references_round_trip_through_the_graph() {
    let app = router(&engine());
    let t = tenant(&app, "Refs").await;
    let w = world(&app, &t).await;

    let (_, artifact) = send(
        &app,
        "POST",
        "/api/v1/artifacts",
        Some(&t),
        Some(json!({ "world_id": w, "name": "Sunblade" })),
    )
    .await;
    let (_, hero) = send(
        &app,
        "POST",
        "/api/v1/characters",
        Some(&t),
        Some(json!({ "world_id": w, "name": "Aria" })),
    )
    .await;
    let artifact = artifact["id"].as_str().unwrap();
    let hero = hero["id"].as_str().unwrap();

    let refs = format!("/api/v1/artifacts/{artifact}/references");
    let (status, reference) = send(
        &app,
        "POST",
        &refs,
        Some(&t),
        Some(json!({ "entity_type": "character", "entity_id": hero, "role": "wielder" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reference["relationship_type"], "references");
    assert_eq!(reference["role"], "wielder");

    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/api/v1/artifact-references/{}", reference["id"].as_str().unwrap()),
        Some(&t),
        Some(json!({ "relationship_type": "bonded_to", "notes": "since birth" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["relationship_type"], "bonded_to");
    assert_eq!(updated["notes"], "since birth");

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("{refs}/character/{hero}"),
        Some(&t),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, list) = send(&app, "GET", &refs, Some(&t), None).await;
    assert!(list.as_array().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Stories and stats
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cloning_grows_the_version_graph() {
    let app = router(&engine());
    let t = tenant(&app, "Press").await;

    let (status, root) = send(
        &app,
        "POST",
        "/api/v1/stories",
        Some(&t),
        Some(json!({ "title": "The Long Road" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(root["version_number"], 1);
    assert!(root["world_id"].is_string());
    let root_id = root["id"].as_str().unwrap();

    let (status, copy) = send(
        &app,
        "POST",
        &format!("/api/v1/stories/{root_id}/clone"),
        Some(&t),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(copy["version_number"], 2);
    assert_eq!(copy["root_story_id"], root_id);
    assert_eq!(copy["previous_story_id"], root_id);

    let (status, graph) = send(
        &app,
        "GET",
        &format!("/api/v1/stories/{}/versions", copy["id"].as_str().unwrap()),
        Some(&t),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(graph["nodes"].as_array().unwrap().len(), 2);
    assert_eq!(graph["edges"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn stats_versions_activate_one_at_a_time() {
    let app = router(&engine());
    let t = tenant(&app, "Stats").await;
    let w = world(&app, &t).await;
    let (_, hero) = send(
        &app,
        "POST",
        "/api/v1/characters",
        Some(&t),
        Some(json!({ "world_id": w, "name": "Aria" })),
    )
    .await;
    let stats = format!("/api/v1/characters/{}/rpg-stats", hero["id"].as_str().unwrap());

    let (status, v1) = send(
        &app,
        "POST",
        &stats,
        Some(&t),
        Some(json!({ "base_stats": { "hp": 10 } })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, v2) = send(
        &app,
        "POST",
        &stats,
        Some(&t),
        Some(json!({ "base_stats": { "hp": 12 }, "deactivate_previous": true })),
    )
    .await;
    assert_eq!(v2["version"], 2);
    assert_eq!(v2["is_active"], true);

    let (status, active) = send(
        &app,
        "PUT",
        &format!("{stats}/{}/activate", v1["id"].as_str().unwrap()),
        Some(&t),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(active["version"], 1);

    let (_, history) = send(&app, "GET", &format!("{stats}/history"), Some(&t), None).await;
    let flags: Vec<bool> = history
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["is_active"].as_bool().unwrap())
        .collect();
    assert_eq!(flags.iter().filter(|a| **a).count(), 1);
}

#[tokio::test]
async fn malformed_bodies_use_the_error_envelope() {
    let app = router(&engine());
    let t = tenant(&app, "Shapes").await;
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/worlds")
        .header("x-tenant-id", &t)
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["code"], 400);
}
