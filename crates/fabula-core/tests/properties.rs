//! Property tests for the structural invariants of the engine: tree
//! levels, stats chains and story version lineage.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use std::collections::HashMap;
use std::sync::Arc;

use fabula_core::service::character::NewCharacter;
use fabula_core::service::stats::NewStatsVersion;
use fabula_core::service::story::{CloneStory, NewStory};
use fabula_core::service::tenant::NewTenant;
use fabula_core::service::tree::NewLocation;
use fabula_core::service::world::NewWorld;
use fabula_core::{Engine, MemoryStore, SideChannels, TenantContext};
use fabula_types::{Location, LocationId, Story, StoryId, WorldId};
use proptest::prelude::*;
use serde_json::json;

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

async fn engine() -> (Engine, TenantContext, WorldId) {
    let engine = Engine::new(Arc::new(MemoryStore::new()), Arc::new(SideChannels::noop()));
    let tenant = engine
        .tenants
        .create(NewTenant {
            name: "Props".into(),
        })
        .await
        .unwrap();
    let ctx = TenantContext::new(tenant.id);
    let world = engine
        .worlds
        .create(
            &ctx,
            NewWorld {
                name: "Lattice".into(),
                ..NewWorld::default()
            },
        )
        .await
        .unwrap();
    (engine, ctx, world.id)
}

const NODES: usize = 6;

/// Apply random moves (rejected ones included) and return the final tree.
async fn shuffle_tree(moves: Vec<(usize, Option<usize>)>) -> Vec<Location> {
    let (engine, ctx, world) = engine().await;
    let mut ids: Vec<LocationId> = Vec::with_capacity(NODES);
    for n in 0..NODES {
        let node = engine
            .locations
            .create(
                &ctx,
                NewLocation {
                    world_id: world,
                    parent_id: ids.last().copied().filter(|_| n % 2 == 1),
                    name: format!("node {n}"),
                    kind: None,
                    description: None,
                },
            )
            .await
            .unwrap();
        ids.push(node.id);
    }
    for (node, parent) in moves {
        // Cycles and self-parenting are rejected; the tree must stay sound.
        let _ = engine
            .locations
            .move_to(&ctx, ids[node], parent.map(|p| ids[p]))
            .await;
    }
    engine.locations.list_by_world(&ctx, world).await.unwrap()
}

#[derive(Debug, Clone)]
enum StatsOp {
    Create { deactivate_previous: bool },
    Activate(usize),
}

fn stats_op() -> impl Strategy<Value = StatsOp> {
    prop_oneof![
        any::<bool>().prop_map(|deactivate_previous| StatsOp::Create { deactivate_previous }),
        (0usize..16).prop_map(StatsOp::Activate),
    ]
}

/// Run stats operations on one character and return `(version, active)`
/// pairs of its chain.
async fn run_stats(ops: Vec<StatsOp>) -> Vec<(u32, bool)> {
    let (engine, ctx, world) = engine().await;
    let hero = engine
        .characters
        .create(
            &ctx,
            NewCharacter {
                world_id: world,
                name: "Hero".into(),
                description: None,
                archetype_id: None,
            },
        )
        .await
        .unwrap();
    let stats = &engine.character_stats;
    let mut created = Vec::new();
    for op in ops {
        match op {
            StatsOp::Create {
                deactivate_previous,
            } => {
                let row = stats
                    .create_version(
                        &ctx,
                        hero.id,
                        NewStatsVersion {
                            base_stats: json!({ "hp": created.len() }),
                            deactivate_previous,
                            ..NewStatsVersion::default()
                        },
                    )
                    .await
                    .unwrap();
                created.push(row.id);
            }
            StatsOp::Activate(pick) => {
                if let Some(id) = created.get(pick % created.len().max(1)) {
                    stats.activate_version(&ctx, *id).await.unwrap();
                }
            }
        }
    }
    stats
        .list_history(&ctx, hero.id)
        .await
        .unwrap()
        .into_iter()
        .map(|v| (v.version, v.is_active))
        .collect()
}

/// Clone random earlier versions of one story and return every version.
async fn branch_versions(picks: Vec<usize>) -> Vec<Story> {
    let (engine, ctx, world) = engine().await;
    let root = engine
        .stories
        .create(
            &ctx,
            NewStory {
                title: "Root".into(),
                world_id: Some(world),
                ..NewStory::default()
            },
        )
        .await
        .unwrap();
    let mut versions: Vec<StoryId> = vec![root.id];
    for pick in picks {
        let source = versions[pick % versions.len()];
        let copy = engine
            .stories
            .clone_story(&ctx, source, CloneStory::default())
            .await
            .unwrap();
        versions.push(copy.id);
    }
    engine
        .stories
        .list_versions_by_root(&ctx, root.id)
        .await
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn levels_follow_parents_after_any_moves(
        moves in prop::collection::vec((0..NODES, prop::option::of(0..NODES)), 0..12)
    ) {
        let nodes = block_on(shuffle_tree(moves));
        let by_id: HashMap<_, _> = nodes.iter().map(|n| (n.id, n)).collect();
        for node in &nodes {
            match node.parent_id {
                None => prop_assert_eq!(node.hierarchy_level, 0),
                Some(parent) => {
                    let parent = by_id[&parent];
                    prop_assert_eq!(node.hierarchy_level, parent.hierarchy_level + 1);
                }
            }
            let mut cursor = node.parent_id;
            let mut steps = 0;
            while let Some(id) = cursor {
                prop_assert!(id != node.id, "node reachable from itself");
                prop_assert!(steps <= NODES);
                cursor = by_id[&id].parent_id;
                steps += 1;
            }
        }
    }

    #[test]
    fn stats_chain_is_dense_with_one_active(
        ops in prop::collection::vec(stats_op(), 0..12)
    ) {
        let chain = block_on(run_stats(ops));
        let mut versions: Vec<u32> = chain.iter().map(|(v, _)| *v).collect();
        versions.sort_unstable();
        let expected: Vec<u32> = (1..=u32::try_from(chain.len()).unwrap()).collect();
        prop_assert_eq!(versions, expected);
        let active = chain.iter().filter(|(_, a)| *a).count();
        prop_assert_eq!(active, usize::from(!chain.is_empty()));
    }

    #[test]
    fn every_version_leads_back_to_its_root(
        picks in prop::collection::vec(0usize..8, 0..6)
    ) {
        let stories = block_on(branch_versions(picks.clone()));
        prop_assert_eq!(stories.len(), picks.len() + 1);
        let by_id: HashMap<_, _> = stories.iter().map(|s| (s.id, s)).collect();
        for story in &stories {
            let mut current: &Story = story;
            let mut steps = 0;
            while let Some(previous) = current.previous_story_id {
                current = by_id[&previous];
                steps += 1;
                prop_assert!(steps <= stories.len());
            }
            prop_assert_eq!(current.id, story.root_story_id);
        }
    }
}
