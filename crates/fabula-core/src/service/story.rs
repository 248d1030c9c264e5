//! Stories, the clone engine and the version graph.
//!
//! A story is one node of a version graph. The founding version is its own
//! root; every later version is a deep copy of an earlier one and points
//! back at it through `previous_story_id`. Cloning copies chapters, scenes,
//! beats, content blocks and the edges leaving them inside one serializable
//! transaction, so a failed clone leaves nothing behind.

use std::collections::{BTreeMap, HashMap, HashSet};

use fabula_types::{
    AuditAction, Beat, BeatId, Chapter, ChapterId, ContentBlock, ContentBlockId, EntityKind,
    EntityRelation, RelationId, Scene, SceneId, Story, StoryId, StoryStatus, World, WorldId,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::world::{NewWorld, insert_world};
use super::{Deps, optional, require_tenant, required};
use crate::cascade;
use crate::clock;
use crate::error::CoreError;
use crate::graph;
use crate::store::{Filter, Isolation, RelationEndpoint, RelationQuery, Tx};
use crate::tenant::TenantContext;

/// Input of [`StoryService::create`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewStory {
    /// Title.
    pub title: String,
    /// Description.
    pub description: Option<String>,
    /// World the story is set in. An implicit world is created when absent.
    pub world_id: Option<WorldId>,
    /// Initial status, `draft` when absent.
    pub status: Option<StoryStatus>,
}

/// Edits accepted by [`StoryService::update`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoryChanges {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New status.
    pub status: Option<StoryStatus>,
}

/// Input of [`StoryService::clone_story`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CloneStory {
    /// Title of the new version; the source title when absent.
    pub title: Option<String>,
    /// Description of the new version; the source description when absent.
    pub description: Option<String>,
}

/// A `previous_story_id -> id` link of the version graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VersionEdge {
    /// Earlier version.
    pub from: StoryId,
    /// Version cloned from it.
    pub to: StoryId,
}

/// Every version sharing one root, ready to draw as a DAG.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionGraph {
    /// Founding version.
    pub root_story_id: StoryId,
    /// Versions ordered by version number.
    pub nodes: Vec<Story>,
    /// Clone links.
    pub edges: Vec<VersionEdge>,
}

/// Story use cases.
#[derive(Debug, Clone)]
pub struct StoryService {
    deps: Deps,
}

impl StoryService {
    /// Create the service.
    pub const fn new(deps: Deps) -> Self {
        Self { deps }
    }

    /// Create a root story. Without a world, an implicit world named after
    /// the story is created in the same transaction.
    pub async fn create(&self, ctx: &TenantContext, input: NewStory) -> Result<Story, CoreError> {
        let title = required("title", &input.title)?;
        let mut tx = self.deps.open(ctx).await?;
        require_tenant(&mut tx).await?;

        let world_id = match input.world_id {
            Some(world) => tx.fetch::<World>(world).await?.id,
            None => {
                let implicit = NewWorld {
                    name: format!("World of {title}"),
                    ..NewWorld::default()
                };
                insert_world(&mut tx, implicit, true).await?.id
            }
        };

        let now = clock::now();
        let id = StoryId::new();
        let story = Story {
            id,
            tenant_id: ctx.tenant_id,
            world_id: Some(world_id),
            title,
            description: optional(input.description),
            status: input.status.unwrap_or_default(),
            version_number: 1,
            root_story_id: id,
            previous_story_id: None,
            created_by_user_id: ctx.actor,
            created_at: now,
            updated_at: now,
        };
        tx.insert(&story).await?;
        tx.commit().await?;

        info!(
            tenant_id = %ctx.tenant_id,
            story_id = %story.id,
            world_id = %world_id,
            "Story created"
        );
        self.deps
            .side
            .audit(ctx, AuditAction::Create, EntityKind::Story, story.id)
            .await;
        self.deps.side.ingest(ctx, "story", story.id).await;
        Ok(story)
    }

    /// Load a story.
    pub async fn get(&self, ctx: &TenantContext, id: StoryId) -> Result<Story, CoreError> {
        self.deps.open(ctx).await?.fetch(id).await
    }

    /// Every story of the tenant.
    pub async fn list(&self, ctx: &TenantContext) -> Result<Vec<Story>, CoreError> {
        self.deps.open(ctx).await?.list(Filter::all()).await
    }

    /// Update title, description or status.
    pub async fn update(
        &self,
        ctx: &TenantContext,
        id: StoryId,
        changes: StoryChanges,
    ) -> Result<Story, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        let mut story: Story = tx.fetch(id).await?;
        if let Some(title) = changes.title {
            story.title = required("title", &title)?;
        }
        if let Some(description) = changes.description {
            story.description = optional(Some(description));
        }
        if let Some(status) = changes.status {
            story.status = status;
        }
        story.updated_at = clock::now();
        tx.update(&story).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Update, EntityKind::Story, id)
            .await;
        self.deps.side.ingest(ctx, "story", id).await;
        Ok(story)
    }

    /// Delete a version with its chapters, scenes, beats, content blocks and
    /// their relations.
    pub async fn delete(&self, ctx: &TenantContext, id: StoryId) -> Result<(), CoreError> {
        let mut tx = self.deps.begin(ctx, Isolation::Serializable).await?;
        let story: Story = tx.fetch(id).await?;
        cascade::story(&mut tx, &story).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Delete, EntityKind::Story, id)
            .await;
        Ok(())
    }

    /// Fork `source` into a new version of the same root.
    pub async fn clone_story(
        &self,
        ctx: &TenantContext,
        source: StoryId,
        input: CloneStory,
    ) -> Result<Story, CoreError> {
        let mut tx = self.deps.begin(ctx, Isolation::Serializable).await?;
        let source: Story = tx.fetch(source).await?;
        let copy = deep_clone(&mut tx, &source, input, ctx).await?;
        tx.commit().await?;

        info!(
            tenant_id = %ctx.tenant_id,
            source_story_id = %source.id,
            story_id = %copy.story.id,
            version = copy.story.version_number,
            rows = copy.rows,
            "Story cloned"
        );
        let metadata = BTreeMap::from([
            (
                "source_story_id".to_owned(),
                serde_json::Value::String(source.id.to_string()),
            ),
            (
                "version_number".to_owned(),
                serde_json::Value::from(copy.story.version_number),
            ),
        ]);
        self.deps
            .side
            .audit_with(ctx, AuditAction::Clone, EntityKind::Story, copy.story.id, metadata)
            .await;
        self.deps.side.ingest(ctx, "story", copy.story.id).await;
        Ok(copy.story)
    }

    /// Every version sharing `root`, ordered by version number.
    pub async fn list_versions_by_root(
        &self,
        ctx: &TenantContext,
        root: StoryId,
    ) -> Result<Vec<Story>, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        tx.fetch::<Story>(root).await?;
        tx.list(Filter::referencing(root.into_inner())).await
    }

    /// The version graph `id` belongs to.
    pub async fn version_graph(
        &self,
        ctx: &TenantContext,
        id: StoryId,
    ) -> Result<VersionGraph, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        let story: Story = tx.fetch(id).await?;
        let root = story.root_story_id;
        let nodes: Vec<Story> = tx.list(Filter::referencing(root.into_inner())).await?;
        let edges = nodes
            .iter()
            .filter_map(|s| {
                s.previous_story_id
                    .map(|from| VersionEdge { from, to: s.id })
            })
            .collect();
        Ok(VersionGraph {
            root_story_id: root,
            nodes,
            edges,
        })
    }
}

// ---------------------------------------------------------------------------
// Clone engine
// ---------------------------------------------------------------------------

struct ClonedStory {
    story: Story,
    rows: usize,
}

/// Old id to new id of every row copied so far, with its kind.
#[derive(Default)]
struct IdMap {
    ids: HashMap<Uuid, (EntityKind, Uuid)>,
}

impl IdMap {
    fn insert(&mut self, kind: EntityKind, old: Uuid, new: Uuid) {
        self.ids.insert(old, (kind, new));
    }

    fn get(&self, old: Uuid) -> Option<Uuid> {
        self.ids.get(&old).map(|(_, new)| *new)
    }

    fn remap(&self, id: Uuid) -> Uuid {
        self.get(id).unwrap_or(id)
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}

async fn deep_clone(
    tx: &mut Tx,
    source: &Story,
    input: CloneStory,
    ctx: &TenantContext,
) -> Result<ClonedStory, CoreError> {
    let root = if source.is_root() {
        source.id
    } else {
        source.root_story_id
    };
    let versions = tx
        .list::<Story>(Filter::referencing(root.into_inner()))
        .await?
        .len();
    let version_number = u32::try_from(versions)
        .unwrap_or(u32::MAX)
        .saturating_add(1);

    let now = clock::now();
    let title = match input.title {
        Some(title) => required("title", &title)?,
        None => source.title.clone(),
    };
    let story = Story {
        id: StoryId::new(),
        tenant_id: source.tenant_id,
        world_id: source.world_id,
        title,
        description: input
            .description
            .map_or_else(|| source.description.clone(), |d| optional(Some(d))),
        status: StoryStatus::Draft,
        version_number,
        root_story_id: root,
        previous_story_id: Some(source.id),
        created_by_user_id: ctx.actor,
        created_at: now,
        updated_at: now,
    };
    tx.insert(&story).await?;

    let mut map = IdMap::default();
    map.insert(EntityKind::Story, source.id.into_inner(), story.id.into_inner());

    let chapters: Vec<Chapter> = tx.list(Filter::scope(source.id.into_inner())).await?;
    for chapter in &chapters {
        let copy = Chapter {
            id: ChapterId::new(),
            story_id: story.id,
            created_at: now,
            updated_at: now,
            ..chapter.clone()
        };
        tx.insert(&copy).await?;
        map.insert(EntityKind::Chapter, chapter.id.into_inner(), copy.id.into_inner());
    }

    // Every scene of the story, filed under a chapter or not.
    let scenes: Vec<Scene> = tx.list(Filter::referencing(source.id.into_inner())).await?;
    for scene in &scenes {
        let copy = Scene {
            id: SceneId::new(),
            story_id: story.id,
            chapter_id: scene
                .chapter_id
                .map(|c| ChapterId::from(map.remap(c.into_inner()))),
            created_at: now,
            updated_at: now,
            ..scene.clone()
        };
        tx.insert(&copy).await?;
        map.insert(EntityKind::Scene, scene.id.into_inner(), copy.id.into_inner());
    }

    for scene in &scenes {
        let new_scene = SceneId::from(map.remap(scene.id.into_inner()));
        let beats: Vec<Beat> = tx.list(Filter::scope(scene.id.into_inner())).await?;
        for beat in beats {
            let copy = Beat {
                id: BeatId::new(),
                scene_id: new_scene,
                created_at: now,
                updated_at: now,
                ..beat.clone()
            };
            tx.insert(&copy).await?;
            map.insert(EntityKind::Beat, beat.id.into_inner(), copy.id.into_inner());
        }
    }

    for chapter in &chapters {
        let new_chapter = ChapterId::from(map.remap(chapter.id.into_inner()));
        let blocks: Vec<ContentBlock> = tx.list(Filter::scope(chapter.id.into_inner())).await?;
        for block in blocks {
            let copy = ContentBlock {
                id: ContentBlockId::new(),
                chapter_id: new_chapter,
                created_at: now,
                updated_at: now,
                ..block.clone()
            };
            tx.insert(&copy).await?;
            map.insert(
                EntityKind::ContentBlock,
                block.id.into_inner(),
                copy.id.into_inner(),
            );
        }
    }

    let edges = clone_edges(tx, &map, now).await?;
    Ok(ClonedStory {
        story,
        rows: map.len().saturating_add(edges),
    })
}

/// Copy every edge leaving a cloned row. Sources are rewritten through the
/// map; targets only when they were cloned too. Mirrored pairs are copied
/// as pairs and keep their canonical direction.
async fn clone_edges(
    tx: &mut Tx,
    map: &IdMap,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<usize, CoreError> {
    let mut done: HashSet<RelationId> = HashSet::new();
    let mut copied = 0usize;
    let sources: Vec<(Uuid, EntityKind)> = map
        .ids
        .iter()
        .map(|(old, (kind, _))| (*old, *kind))
        .collect();

    for (old, kind) in sources {
        let edges = tx
            .list_relations(&RelationQuery::all(RelationEndpoint::Source(kind, old)))
            .await?;
        for edge in edges {
            if !done.insert(edge.id) {
                continue;
            }
            let mirror = match edge.mirror_id {
                Some(mirror_id) => {
                    done.insert(mirror_id);
                    tx.find_relation(mirror_id).await?
                }
                None => None,
            };
            let Some(mirror) = mirror else {
                tx.insert_relation(&remapped(&edge, map, now)).await?;
                copied = copied.saturating_add(1);
                continue;
            };

            let (canonical, inverse) = if edge.id < mirror.id {
                (&edge, &mirror)
            } else {
                (&mirror, &edge)
            };
            let (low, high) = graph::ordered_ids();
            let mut canonical_copy = remapped(canonical, map, now);
            let mut inverse_copy = remapped(inverse, map, now);
            canonical_copy.id = low;
            inverse_copy.id = high;
            canonical_copy.mirror_id = Some(high);
            inverse_copy.mirror_id = Some(low);
            tx.insert_relation(&canonical_copy).await?;
            tx.insert_relation(&inverse_copy).await?;
            copied = copied.saturating_add(2);
        }
    }
    Ok(copied)
}

fn remapped(
    edge: &EntityRelation,
    map: &IdMap,
    now: chrono::DateTime<chrono::Utc>,
) -> EntityRelation {
    EntityRelation {
        id: RelationId::new(),
        source_id: map.remap(edge.source_id),
        target_id: map.remap(edge.target_id),
        mirror_id: None,
        created_at: now,
        updated_at: now,
        ..edge.clone()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::service::tenant::{NewTenant, TenantService};
    use crate::side_channel::{MemoryAuditSink, SideChannels};
    use crate::store::MemoryStore;

    async fn setup() -> (StoryService, TenantContext, Arc<MemoryAuditSink>) {
        let audit = Arc::new(MemoryAuditSink::new());
        let deps = Deps::new(
            Arc::new(MemoryStore::new()),
            Arc::new(SideChannels::new(audit.clone())),
        );
        let tenant = TenantService::new(deps.clone())
            .create(NewTenant { name: "Acme".into() })
            .await
            .unwrap();
        (StoryService::new(deps), TenantContext::new(tenant.id), audit)
    }

    #[tokio::test]
    async fn create_without_world_materialises_one() {
        let (stories, ctx, _) = setup().await;
        let story = stories
            .create(
                &ctx,
                NewStory {
                    title: "Dune".into(),
                    ..NewStory::default()
                },
            )
            .await
            .unwrap();
        assert!(story.is_root());
        assert_eq!(story.version_number, 1);

        let mut tx = stories.deps.open(&ctx).await.unwrap();
        let world: World = tx.fetch(story.world_id.unwrap()).await.unwrap();
        assert!(world.is_implicit);
        assert_eq!(world.name, "World of Dune");
    }

    #[tokio::test]
    async fn version_graph_branches() {
        let (stories, ctx, audit) = setup().await;
        let root = stories
            .create(
                &ctx,
                NewStory {
                    title: "Saga".into(),
                    ..NewStory::default()
                },
            )
            .await
            .unwrap();
        let v2 = stories
            .clone_story(&ctx, root.id, CloneStory::default())
            .await
            .unwrap();
        let v3 = stories
            .clone_story(&ctx, root.id, CloneStory::default())
            .await
            .unwrap();
        let v4 = stories
            .clone_story(&ctx, v2.id, CloneStory::default())
            .await
            .unwrap();

        assert_eq!(v4.root_story_id, root.id);
        assert_eq!(v4.previous_story_id, Some(v2.id));
        assert_eq!(v4.version_number, 4);

        let graph = stories.version_graph(&ctx, v3.id).await.unwrap();
        assert_eq!(graph.root_story_id, root.id);
        assert_eq!(graph.nodes.len(), 4);
        assert!(graph.edges.contains(&VersionEdge {
            from: root.id,
            to: v3.id
        }));
        assert!(graph.edges.contains(&VersionEdge { from: v2.id, to: v4.id }));

        let clones = audit
            .entries()
            .await
            .into_iter()
            .filter(|e| e.action == AuditAction::Clone)
            .count();
        assert_eq!(clones, 3);
    }

    #[tokio::test]
    async fn source_with_versions_cannot_be_deleted() {
        let (stories, ctx, _) = setup().await;
        let root = stories
            .create(
                &ctx,
                NewStory {
                    title: "Saga".into(),
                    ..NewStory::default()
                },
            )
            .await
            .unwrap();
        let v2 = stories
            .clone_story(&ctx, root.id, CloneStory::default())
            .await
            .unwrap();

        let err = stories.delete(&ctx, root.id).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation { field: "story_id", .. }));

        stories.delete(&ctx, v2.id).await.unwrap();
        stories.delete(&ctx, root.id).await.unwrap();
    }
}
