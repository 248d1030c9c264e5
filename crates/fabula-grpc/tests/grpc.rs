//! Integration tests for the gRPC services.
//!
//! Services are called directly over an in-memory store. Requests pass
//! through the tenant interceptor first, as they do when mounted.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use std::sync::Arc;

use fabula_core::service::character::NewCharacter;
use fabula_core::{Engine, MemoryStore, SideChannels, TenantContext, TenantMode};
use fabula_grpc::pb;
use fabula_grpc::pb::event_service_server::EventService;
use fabula_grpc::pb::location_service_server::LocationService;
use fabula_grpc::pb::relation_service_server::RelationService;
use fabula_grpc::pb::stats_service_server::StatsService;
use fabula_grpc::pb::story_service_server::StoryService;
use fabula_grpc::pb::tenant_service_server::TenantService;
use fabula_grpc::pb::world_service_server::WorldService;
use fabula_grpc::services::{
    EventRpc, LocationRpc, RelationRpc, StatsRpc, StoryRpc, TenantRpc, WorldRpc,
};
use fabula_grpc::{TENANT_KEY, TenantInterceptor};
use fabula_types::{TenantId, WorldId};
use serde_json::{Value, json};
use tonic::service::Interceptor;
use tonic::{Code, Request};
use uuid::Uuid;

fn engine() -> Engine {
    Engine::new(Arc::new(MemoryStore::new()), Arc::new(SideChannels::noop()))
}

/// Build a request for `tenant` the way the mounted interceptor would.
fn scoped<T>(tenant: &str, message: T) -> Request<T> {
    let mut request = Request::new(());
    request
        .metadata_mut()
        .insert(TENANT_KEY, tenant.parse().unwrap());
    let request = TenantInterceptor::new(TenantMode::Header)
        .call(request)
        .unwrap();
    let (metadata, extensions, ()) = request.into_parts();
    Request::from_parts(metadata, extensions, message)
}

async fn tenant(engine: &Engine, name: &str) -> String {
    TenantRpc::new(engine.clone())
        .create_tenant(Request::new(pb::CreateTenantRequest { name: name.into() }))
        .await
        .unwrap()
        .into_inner()
        .id
}

async fn world(engine: &Engine, tenant: &str) -> String {
    WorldRpc::new(engine.clone())
        .create_world(scoped(
            tenant,
            pb::CreateWorldRequest {
                name: "Eldoria".into(),
                ..Default::default()
            },
        ))
        .await
        .unwrap()
        .into_inner()
        .id
}

async fn character(engine: &Engine, tenant: &str, world: &str, name: &str) -> String {
    let ctx = TenantContext::new(TenantId::from(Uuid::parse_str(tenant).unwrap()));
    let draft = NewCharacter {
        world_id: WorldId::from(Uuid::parse_str(world).unwrap()),
        name: name.into(),
        description: None,
        archetype_id: None,
    };
    engine
        .characters
        .create(&ctx, draft)
        .await
        .unwrap()
        .id
        .to_string()
}

// ---------------------------------------------------------------------------
// Tenancy
// ---------------------------------------------------------------------------

#[tokio::test]
async fn duplicate_tenant_name_is_already_exists() {
    let engine = engine();
    tenant(&engine, "Acme").await;
    let err = TenantRpc::new(engine.clone())
        .create_tenant(Request::new(pb::CreateTenantRequest {
            name: "Acme".into(),
        }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::AlreadyExists);
}

#[tokio::test]
async fn worlds_are_invisible_across_tenants() {
    let engine = engine();
    let first = tenant(&engine, "First").await;
    let second = tenant(&engine, "Second").await;
    let world = world(&engine, &first).await;

    let service = WorldRpc::new(engine.clone());
    let err = service
        .get_world(scoped(&second, pb::IdRequest { id: world.clone() }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::NotFound);

    let listed = service
        .list_worlds(scoped(&second, pb::Empty {}))
        .await
        .unwrap()
        .into_inner();
    assert!(listed.worlds.is_empty());
}

#[tokio::test]
async fn requests_without_context_are_unauthenticated() {
    let engine = engine();
    let err = WorldRpc::new(engine)
        .list_worlds(Request::new(pb::Empty {}))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::Unauthenticated);
}

#[tokio::test]
async fn malformed_ids_are_invalid_arguments() {
    let engine = engine();
    let tenant = tenant(&engine, "Acme").await;
    let err = WorldRpc::new(engine)
        .get_world(scoped(&tenant, pb::IdRequest { id: "w-1".into() }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
}

// ---------------------------------------------------------------------------
// Hierarchy and timeline
// ---------------------------------------------------------------------------

#[tokio::test]
async fn location_moves_keep_the_tree_acyclic() {
    let engine = engine();
    let tenant = tenant(&engine, "Acme").await;
    let world = world(&engine, &tenant).await;
    let service = LocationRpc::new(engine.clone());

    let create = |name: &str, parent: Option<String>| pb::CreateLocationRequest {
        world_id: world.clone(),
        parent_id: parent,
        name: name.into(),
        ..Default::default()
    };
    let realm = service
        .create_location(scoped(&tenant, create("Realm", None)))
        .await
        .unwrap()
        .into_inner();
    let city = service
        .create_location(scoped(&tenant, create("City", Some(realm.id.clone()))))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(city.hierarchy_level, 1);

    let err = service
        .move_location(scoped(
            &tenant,
            pb::MoveRequest {
                id: realm.id.clone(),
                parent_id: Some(city.id.clone()),
            },
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);

    let ancestors = service
        .list_ancestors(scoped(&tenant, pb::IdRequest { id: city.id.clone() }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(ancestors.locations.len(), 1);
    assert_eq!(ancestors.locations[0].id, realm.id);

    let moved = service
        .move_location(scoped(
            &tenant,
            pb::MoveRequest {
                id: city.id,
                parent_id: None,
            },
        ))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(moved.hierarchy_level, 0);
    assert_eq!(moved.parent_id, None);
}

#[tokio::test]
async fn epoch_anchors_the_timeline() {
    let engine = engine();
    let tenant = tenant(&engine, "Acme").await;
    let world = world(&engine, &tenant).await;
    let service = EventRpc::new(engine.clone());

    let create = |name: &str, position: Option<f64>| pb::CreateEventRequest {
        world_id: world.clone(),
        name: name.into(),
        timeline_position: position,
        ..Default::default()
    };
    let founding = service
        .create_event(scoped(&tenant, create("Founding", None)))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(founding.importance, 5);
    service
        .create_event(scoped(&tenant, create("War", Some(12.0))))
        .await
        .unwrap();
    service
        .create_event(scoped(&tenant, create("Prophecy", Some(-3.0))))
        .await
        .unwrap();

    let epoch = service
        .set_epoch(scoped(&tenant, pb::IdRequest { id: founding.id.clone() }))
        .await
        .unwrap()
        .into_inner();
    assert!(epoch.is_epoch);
    assert_eq!(epoch.timeline_position, Some(0.0));

    let fetched = service
        .get_epoch(scoped(&tenant, pb::WorldRequest { world_id: world.clone() }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(fetched.id, founding.id);

    let window = service
        .get_timeline(scoped(
            &tenant,
            pb::TimelineRequest {
                world_id: world.clone(),
                from: Some(0.0),
                to: None,
            },
        ))
        .await
        .unwrap()
        .into_inner();
    let names: Vec<_> = window.events.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["Founding", "War"]);
}

#[tokio::test]
async fn importance_out_of_range_is_rejected() {
    let engine = engine();
    let tenant = tenant(&engine, "Acme").await;
    let world = world(&engine, &tenant).await;
    let err = EventRpc::new(engine)
        .create_event(scoped(
            &tenant,
            pb::CreateEventRequest {
                world_id: world,
                name: "Cataclysm".into(),
                importance: Some(11),
                ..Default::default()
            },
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
}

// ---------------------------------------------------------------------------
// Relations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn mirrored_relations_page_by_cursor() {
    let engine = engine();
    let tenant = tenant(&engine, "Acme").await;
    let world = world(&engine, &tenant).await;
    let hero = character(&engine, &tenant, &world, "Aria").await;
    let service = RelationRpc::new(engine.clone());

    let mut targets = Vec::new();
    for name in ["Bran", "Cora", "Dain"] {
        let target = character(&engine, &tenant, &world, name).await;
        let created = service
            .create_relation(scoped(
                &tenant,
                pb::CreateRelationRequest {
                    world_id: world.clone(),
                    source_type: "character".into(),
                    source_id: hero.clone(),
                    target_type: "character".into(),
                    target_id: target.clone(),
                    relation_type: "mentor_of".into(),
                    attributes_json: r#"{"since":"childhood"}"#.into(),
                    create_mirror: true,
                    ..Default::default()
                },
            ))
            .await
            .unwrap()
            .into_inner();
        let relation = created.relation.unwrap();
        let mirror = created.mirror.unwrap();
        assert_eq!(relation.summary, "character mentor_of character");
        assert_eq!(mirror.relation_type, "mentored_by");
        assert_eq!(mirror.mirror_id.as_deref(), Some(relation.id.as_str()));
        let attributes: Value = serde_json::from_str(&mirror.attributes_json).unwrap();
        assert_eq!(attributes, json!({ "since": "childhood" }));
        targets.push(target);
    }

    let page = |cursor: Option<String>| {
        scoped(
            &tenant,
            pb::ListByEntityRequest {
                entity_type: "character".into(),
                entity_id: hero.clone(),
                options: Some(pb::ListOptions {
                    cursor,
                    limit: Some(2),
                    ..Default::default()
                }),
            },
        )
    };
    let first = service.list_by_source(page(None)).await.unwrap().into_inner();
    assert_eq!(first.items.len(), 2);
    assert!(first.has_more);
    let second = service
        .list_by_source(page(first.next_cursor.clone()))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(second.items.len(), 1);
    assert!(!second.has_more);
    assert_eq!(second.next_cursor, None);
    assert_eq!(second.items[0].target_id, targets[2]);

    let err = service
        .list_by_source(page(Some("%%%".into())))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);

    let deleted = service
        .delete_by_entity(scoped(
            &tenant,
            pb::EntityRequest {
                entity_type: "character".into(),
                entity_id: hero.clone(),
            },
        ))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(deleted.deleted, 6);
}

#[tokio::test]
async fn unknown_sort_order_is_rejected() {
    let engine = engine();
    let tenant = tenant(&engine, "Acme").await;
    let world = world(&engine, &tenant).await;
    let err = RelationRpc::new(engine)
        .list_by_world(scoped(
            &tenant,
            pb::ListByWorldRequest {
                world_id: world,
                options: Some(pb::ListOptions {
                    order: "sideways".into(),
                    ..Default::default()
                }),
            },
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
}

// ---------------------------------------------------------------------------
// Stories
// ---------------------------------------------------------------------------

#[tokio::test]
async fn clones_join_the_version_graph() {
    let engine = engine();
    let tenant = tenant(&engine, "Acme").await;
    let service = StoryRpc::new(engine.clone());

    let root = service
        .create_story(scoped(
            &tenant,
            pb::CreateStoryRequest {
                title: "The Long Winter".into(),
                ..Default::default()
            },
        ))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(root.version_number, 1);
    assert_eq!(root.root_story_id, root.id);
    assert!(root.world_id.is_some());

    let copy = service
        .clone_story(scoped(
            &tenant,
            pb::CloneStoryRequest {
                id: root.id.clone(),
                title: Some("The Long Winter (rewrite)".into()),
                description: None,
            },
        ))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(copy.version_number, 2);
    assert_eq!(copy.status, "draft");
    assert_eq!(copy.previous_story_id.as_deref(), Some(root.id.as_str()));

    let graph = service
        .get_version_graph(scoped(&tenant, pb::IdRequest { id: copy.id.clone() }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(graph.root_story_id, root.id);
    assert_eq!(graph.nodes.len(), 2);
    assert_eq!(graph.edges.len(), 1);
    assert_eq!(graph.edges[0].from, root.id);
    assert_eq!(graph.edges[0].to, copy.id);
}

#[tokio::test]
async fn unknown_story_status_is_rejected() {
    let engine = engine();
    let tenant = tenant(&engine, "Acme").await;
    let err = StoryRpc::new(engine)
        .create_story(scoped(
            &tenant,
            pb::CreateStoryRequest {
                title: "Draft".into(),
                status: Some("lost".into()),
                ..Default::default()
            },
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stats_versions_activate_within_their_subject() {
    let engine = engine();
    let tenant = tenant(&engine, "Acme").await;
    let world = world(&engine, &tenant).await;
    let hero = character(&engine, &tenant, &world, "Aria").await;
    let rival = character(&engine, &tenant, &world, "Bran").await;
    let service = StatsRpc::new(engine.clone());

    let create = |subject: &str, strength: u32| pb::CreateStatsVersionRequest {
        subject_type: "character".into(),
        subject_id: subject.to_owned(),
        base_stats_json: json!({ "strength": strength }).to_string(),
        deactivate_previous: true,
        ..Default::default()
    };
    let v1 = service
        .create_version(scoped(&tenant, create(&hero, 10)))
        .await
        .unwrap()
        .into_inner();
    let v2 = service
        .create_version(scoped(&tenant, create(&hero, 12)))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(v2.version, 2);
    assert!(v2.is_active);

    let subject = |id: &str| pb::SubjectRequest {
        subject_type: "character".into(),
        subject_id: id.to_owned(),
    };
    let active = service
        .get_active(scoped(&tenant, subject(&hero)))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(active.id, v2.id);

    let err = service
        .activate_version(scoped(
            &tenant,
            pb::ActivateStatsVersionRequest {
                subject_type: "character".into(),
                subject_id: rival,
                id: v1.id.clone(),
            },
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::NotFound);

    let restored = service
        .activate_version(scoped(
            &tenant,
            pb::ActivateStatsVersionRequest {
                subject_type: "character".into(),
                subject_id: hero.clone(),
                id: v1.id.clone(),
            },
        ))
        .await
        .unwrap()
        .into_inner();
    assert!(restored.is_active);

    let history = service
        .list_history(scoped(&tenant, subject(&hero)))
        .await
        .unwrap()
        .into_inner();
    let active: Vec<_> = history.versions.iter().filter(|v| v.is_active).collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, v1.id);
}

#[tokio::test]
async fn stats_subjects_are_characters_or_artifacts() {
    let engine = engine();
    let tenant = tenant(&engine, "Acme").await;
    let world = world(&engine, &tenant).await;
    let err = StatsRpc::new(engine)
        .get_active(scoped(
            &tenant,
            pb::SubjectRequest {
                subject_type: "world".into(),
                subject_id: world,
            },
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
}
