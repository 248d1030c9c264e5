//! Chapters, scenes, beats and content blocks.

use fabula_types::{
    AuditAction, Beat, BeatId, BeatType, Chapter, ChapterId, Character, CharacterId, ContentBlock,
    ContentBlockId, ContentKind, EntityKind, Location, LocationId, Scene, SceneId, Story, StoryId,
    StoryStatus,
};
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{Deps, json_object, optional, required};
use crate::cascade;
use crate::clock;
use crate::error::CoreError;
use crate::store::{Filter, Tx};
use crate::tenant::TenantContext;

/// Metadata key holding the word count of text blocks.
pub const WORD_COUNT: &str = "word_count";

fn positive(field: &'static str, value: u32) -> Result<u32, CoreError> {
    if value == 0 {
        Err(CoreError::validation(
            field,
            format!("{field} must be at least 1"),
        ))
    } else {
        Ok(value)
    }
}

// ---------------------------------------------------------------------------
// Chapters
// ---------------------------------------------------------------------------

/// Input of [`ChapterService::create`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewChapter {
    /// Owning story.
    pub story_id: StoryId,
    /// Position in the story, from 1.
    pub number: u32,
    /// Title.
    pub title: String,
    /// Status, `draft` when absent.
    #[serde(default)]
    pub status: Option<StoryStatus>,
}

/// Edits accepted by [`ChapterService::update`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChapterChanges {
    /// New number.
    pub number: Option<u32>,
    /// New title.
    pub title: Option<String>,
    /// New status.
    pub status: Option<StoryStatus>,
}

/// Chapter use cases.
#[derive(Debug, Clone)]
pub struct ChapterService {
    deps: Deps,
}

impl ChapterService {
    /// Create the service.
    pub const fn new(deps: Deps) -> Self {
        Self { deps }
    }

    /// Add a chapter to a story.
    pub async fn create(
        &self,
        ctx: &TenantContext,
        input: NewChapter,
    ) -> Result<Chapter, CoreError> {
        let title = required("title", &input.title)?;
        let number = positive("number", input.number)?;
        let mut tx = self.deps.open(ctx).await?;
        tx.fetch::<Story>(input.story_id).await?;

        let now = clock::now();
        let chapter = Chapter {
            id: ChapterId::new(),
            tenant_id: ctx.tenant_id,
            story_id: input.story_id,
            number,
            title,
            status: input.status.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        tx.insert(&chapter).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Create, EntityKind::Chapter, chapter.id)
            .await;
        self.deps.side.ingest(ctx, "chapter", chapter.id).await;
        Ok(chapter)
    }

    /// Load a chapter.
    pub async fn get(&self, ctx: &TenantContext, id: ChapterId) -> Result<Chapter, CoreError> {
        self.deps.open(ctx).await?.fetch(id).await
    }

    /// Chapters of a story by number.
    pub async fn list_by_story(
        &self,
        ctx: &TenantContext,
        story: StoryId,
    ) -> Result<Vec<Chapter>, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        tx.fetch::<Story>(story).await?;
        tx.list(Filter::scope(story.into_inner())).await
    }

    /// Update a chapter.
    pub async fn update(
        &self,
        ctx: &TenantContext,
        id: ChapterId,
        changes: ChapterChanges,
    ) -> Result<Chapter, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        let mut chapter: Chapter = tx.fetch(id).await?;
        if let Some(number) = changes.number {
            chapter.number = positive("number", number)?;
        }
        if let Some(title) = changes.title {
            chapter.title = required("title", &title)?;
        }
        if let Some(status) = changes.status {
            chapter.status = status;
        }
        chapter.updated_at = clock::now();
        tx.update(&chapter).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Update, EntityKind::Chapter, id)
            .await;
        self.deps.side.ingest(ctx, "chapter", id).await;
        Ok(chapter)
    }

    /// Delete a chapter with its scenes, beats, content blocks and edges.
    pub async fn delete(&self, ctx: &TenantContext, id: ChapterId) -> Result<(), CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        let chapter: Chapter = tx.fetch(id).await?;
        cascade::chapter(&mut tx, &chapter).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Delete, EntityKind::Chapter, id)
            .await;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Scenes
// ---------------------------------------------------------------------------

/// Input of [`SceneService::create`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewScene {
    /// Owning story.
    pub story_id: StoryId,
    /// Chapter the scene is filed under.
    #[serde(default)]
    pub chapter_id: Option<ChapterId>,
    /// Position within the chapter.
    #[serde(default)]
    pub order_num: u32,
    /// Scene goal.
    #[serde(default)]
    pub goal: Option<String>,
    /// Free-form time reference.
    #[serde(default)]
    pub time_ref: Option<String>,
    /// Point-of-view character.
    #[serde(default)]
    pub pov_character_id: Option<CharacterId>,
    /// Where the scene takes place.
    #[serde(default)]
    pub location_id: Option<LocationId>,
}

/// Edits accepted by [`SceneService::update`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SceneChanges {
    /// New position.
    pub order_num: Option<u32>,
    /// New goal.
    pub goal: Option<String>,
    /// New time reference.
    pub time_ref: Option<String>,
    /// New point-of-view character.
    pub pov_character_id: Option<CharacterId>,
    /// New location.
    pub location_id: Option<LocationId>,
}

async fn chapter_of_story(
    tx: &mut Tx,
    chapter: ChapterId,
    story: StoryId,
) -> Result<Chapter, CoreError> {
    let chapter: Chapter = tx.fetch(chapter).await?;
    if chapter.story_id == story {
        Ok(chapter)
    } else {
        Err(CoreError::validation(
            "chapter_id",
            "chapter must belong to the same story",
        ))
    }
}

/// Scene use cases.
#[derive(Debug, Clone)]
pub struct SceneService {
    deps: Deps,
}

impl SceneService {
    /// Create the service.
    pub const fn new(deps: Deps) -> Self {
        Self { deps }
    }

    /// Add a scene to a story, optionally under one of its chapters.
    pub async fn create(&self, ctx: &TenantContext, input: NewScene) -> Result<Scene, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        tx.fetch::<Story>(input.story_id).await?;
        if let Some(chapter) = input.chapter_id {
            chapter_of_story(&mut tx, chapter, input.story_id).await?;
        }
        if let Some(character) = input.pov_character_id {
            tx.fetch::<Character>(character).await?;
        }
        if let Some(location) = input.location_id {
            tx.fetch::<Location>(location).await?;
        }

        let now = clock::now();
        let scene = Scene {
            id: SceneId::new(),
            tenant_id: ctx.tenant_id,
            story_id: input.story_id,
            chapter_id: input.chapter_id,
            order_num: input.order_num,
            pov_character_id: input.pov_character_id,
            location_id: input.location_id,
            time_ref: optional(input.time_ref),
            goal: optional(input.goal),
            created_at: now,
            updated_at: now,
        };
        tx.insert(&scene).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Create, EntityKind::Scene, scene.id)
            .await;
        self.deps.side.ingest(ctx, "scene", scene.id).await;
        Ok(scene)
    }

    /// Load a scene.
    pub async fn get(&self, ctx: &TenantContext, id: SceneId) -> Result<Scene, CoreError> {
        self.deps.open(ctx).await?.fetch(id).await
    }

    /// Scenes of a chapter by order.
    pub async fn list_by_chapter(
        &self,
        ctx: &TenantContext,
        chapter: ChapterId,
    ) -> Result<Vec<Scene>, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        tx.fetch::<Chapter>(chapter).await?;
        tx.list(Filter::scope(chapter.into_inner())).await
    }

    /// Every scene of a story.
    pub async fn list_by_story(
        &self,
        ctx: &TenantContext,
        story: StoryId,
    ) -> Result<Vec<Scene>, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        tx.fetch::<Story>(story).await?;
        tx.list(Filter::referencing(story.into_inner())).await
    }

    /// Update a scene. Use [`Self::move_to`] to change its chapter.
    pub async fn update(
        &self,
        ctx: &TenantContext,
        id: SceneId,
        changes: SceneChanges,
    ) -> Result<Scene, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        let mut scene: Scene = tx.fetch(id).await?;
        if let Some(order) = changes.order_num {
            scene.order_num = order;
        }
        if let Some(goal) = changes.goal {
            scene.goal = optional(Some(goal));
        }
        if let Some(time_ref) = changes.time_ref {
            scene.time_ref = optional(Some(time_ref));
        }
        if let Some(character) = changes.pov_character_id {
            tx.fetch::<Character>(character).await?;
            scene.pov_character_id = Some(character);
        }
        if let Some(location) = changes.location_id {
            tx.fetch::<Location>(location).await?;
            scene.location_id = Some(location);
        }
        scene.updated_at = clock::now();
        tx.update(&scene).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Update, EntityKind::Scene, id)
            .await;
        self.deps.side.ingest(ctx, "scene", id).await;
        Ok(scene)
    }

    /// File a scene under another chapter of the same story.
    pub async fn move_to(
        &self,
        ctx: &TenantContext,
        id: SceneId,
        chapter: ChapterId,
    ) -> Result<Scene, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        let mut scene: Scene = tx.fetch(id).await?;
        chapter_of_story(&mut tx, chapter, scene.story_id).await?;
        scene.chapter_id = Some(chapter);
        scene.updated_at = clock::now();
        tx.update(&scene).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Move, EntityKind::Scene, id)
            .await;
        Ok(scene)
    }

    /// Delete a scene with its beats and edges.
    pub async fn delete(&self, ctx: &TenantContext, id: SceneId) -> Result<(), CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        let scene: Scene = tx.fetch(id).await?;
        cascade::scene(&mut tx, &scene).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Delete, EntityKind::Scene, id)
            .await;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Beats
// ---------------------------------------------------------------------------

/// Input of [`BeatService::create`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewBeat {
    /// Owning scene.
    pub scene_id: SceneId,
    /// Position within the scene.
    #[serde(default)]
    pub order_num: u32,
    /// Narrative function.
    #[serde(default, rename = "type")]
    pub beat_type: BeatType,
    /// What the beat sets out to do.
    #[serde(default)]
    pub intent: Option<String>,
    /// What actually happens.
    #[serde(default)]
    pub outcome: Option<String>,
}

/// Edits accepted by [`BeatService::update`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BeatChanges {
    /// New position.
    pub order_num: Option<u32>,
    /// New narrative function.
    #[serde(rename = "type")]
    pub beat_type: Option<BeatType>,
    /// New intent.
    pub intent: Option<String>,
    /// New outcome.
    pub outcome: Option<String>,
}

/// Beat use cases.
#[derive(Debug, Clone)]
pub struct BeatService {
    deps: Deps,
}

impl BeatService {
    /// Create the service.
    pub const fn new(deps: Deps) -> Self {
        Self { deps }
    }

    /// Add a beat to a scene.
    pub async fn create(&self, ctx: &TenantContext, input: NewBeat) -> Result<Beat, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        tx.fetch::<Scene>(input.scene_id).await?;

        let now = clock::now();
        let beat = Beat {
            id: BeatId::new(),
            tenant_id: ctx.tenant_id,
            scene_id: input.scene_id,
            order_num: input.order_num,
            beat_type: input.beat_type,
            intent: optional(input.intent),
            outcome: optional(input.outcome),
            created_at: now,
            updated_at: now,
        };
        tx.insert(&beat).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Create, EntityKind::Beat, beat.id)
            .await;
        self.deps.side.ingest(ctx, "beat", beat.id).await;
        Ok(beat)
    }

    /// Load a beat.
    pub async fn get(&self, ctx: &TenantContext, id: BeatId) -> Result<Beat, CoreError> {
        self.deps.open(ctx).await?.fetch(id).await
    }

    /// Beats of a scene by order.
    pub async fn list_by_scene(
        &self,
        ctx: &TenantContext,
        scene: SceneId,
    ) -> Result<Vec<Beat>, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        tx.fetch::<Scene>(scene).await?;
        tx.list(Filter::scope(scene.into_inner())).await
    }

    /// Update a beat.
    pub async fn update(
        &self,
        ctx: &TenantContext,
        id: BeatId,
        changes: BeatChanges,
    ) -> Result<Beat, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        let mut beat: Beat = tx.fetch(id).await?;
        if let Some(order) = changes.order_num {
            beat.order_num = order;
        }
        if let Some(beat_type) = changes.beat_type {
            beat.beat_type = beat_type;
        }
        if let Some(intent) = changes.intent {
            beat.intent = optional(Some(intent));
        }
        if let Some(outcome) = changes.outcome {
            beat.outcome = optional(Some(outcome));
        }
        beat.updated_at = clock::now();
        tx.update(&beat).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Update, EntityKind::Beat, id)
            .await;
        self.deps.side.ingest(ctx, "beat", id).await;
        Ok(beat)
    }

    /// Move a beat to another scene of the same story.
    pub async fn move_to(
        &self,
        ctx: &TenantContext,
        id: BeatId,
        scene: SceneId,
    ) -> Result<Beat, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        let mut beat: Beat = tx.fetch(id).await?;
        let current: Scene = tx.fetch(beat.scene_id).await?;
        let target: Scene = tx.fetch(scene).await?;
        if current.story_id != target.story_id {
            return Err(CoreError::validation(
                "scene_id",
                "scene must belong to the same story",
            ));
        }
        beat.scene_id = scene;
        beat.updated_at = clock::now();
        tx.update(&beat).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Move, EntityKind::Beat, id)
            .await;
        Ok(beat)
    }

    /// Delete a beat and its edges.
    pub async fn delete(&self, ctx: &TenantContext, id: BeatId) -> Result<(), CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        let beat: Beat = tx.fetch(id).await?;
        cascade::beat(&mut tx, &beat).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Delete, EntityKind::Beat, id)
            .await;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Content blocks
// ---------------------------------------------------------------------------

/// Input of [`ContentBlockService::create`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewContentBlock {
    /// Owning chapter.
    pub chapter_id: ChapterId,
    /// Block kind.
    pub kind: ContentKind,
    /// Body text or media reference.
    #[serde(default)]
    pub content: String,
    /// Position in the chapter; after the last block when absent.
    #[serde(default)]
    pub order_num: Option<u32>,
    /// Free-form metadata object.
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// Edits accepted by [`ContentBlockService::update`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContentBlockChanges {
    /// New body.
    pub content: Option<String>,
    /// New position.
    pub order_num: Option<u32>,
    /// Replacement metadata object.
    pub metadata: Option<Value>,
}

/// Copy `metadata` and stamp the word count of text blocks.
fn stamped(kind: ContentKind, content: &str, metadata: Option<Value>) -> Result<Value, CoreError> {
    let mut map = match metadata {
        Some(value) => {
            json_object("metadata", &value)?;
            match value {
                Value::Object(map) => map,
                _ => Map::new(),
            }
        }
        None => Map::new(),
    };
    if kind.is_text() {
        let words = content.split_whitespace().count();
        map.insert(WORD_COUNT.to_owned(), Value::from(words));
    }
    Ok(Value::Object(map))
}

/// Content block use cases.
#[derive(Debug, Clone)]
pub struct ContentBlockService {
    deps: Deps,
}

impl ContentBlockService {
    /// Create the service.
    pub const fn new(deps: Deps) -> Self {
        Self { deps }
    }

    /// Add a block to a chapter.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` when the chapter already holds a block of a
    /// singleton kind (synopsis, outline).
    pub async fn create(
        &self,
        ctx: &TenantContext,
        input: NewContentBlock,
    ) -> Result<ContentBlock, CoreError> {
        let metadata = stamped(input.kind, &input.content, input.metadata)?;
        let mut tx = self.deps.open(ctx).await?;
        tx.fetch::<Chapter>(input.chapter_id).await?;

        let existing: Vec<ContentBlock> = tx
            .list(Filter::scope(input.chapter_id.into_inner()))
            .await?;
        if input.kind.is_singleton() && existing.iter().any(|b| b.kind == input.kind) {
            return Err(CoreError::already_exists("content_block", "kind", input.kind));
        }
        let order_num = input.order_num.unwrap_or_else(|| {
            existing
                .iter()
                .map(|b| b.order_num)
                .max()
                .map_or(1, |last| last.saturating_add(1))
        });

        let now = clock::now();
        let block = ContentBlock {
            id: ContentBlockId::new(),
            tenant_id: ctx.tenant_id,
            chapter_id: input.chapter_id,
            order_num,
            kind: input.kind,
            content: input.content,
            metadata,
            created_at: now,
            updated_at: now,
        };
        tx.insert(&block).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Create, EntityKind::ContentBlock, block.id)
            .await;
        self.deps.side.ingest(ctx, "content_block", block.id).await;
        Ok(block)
    }

    /// Load a block.
    pub async fn get(
        &self,
        ctx: &TenantContext,
        id: ContentBlockId,
    ) -> Result<ContentBlock, CoreError> {
        self.deps.open(ctx).await?.fetch(id).await
    }

    /// Blocks of a chapter by order.
    pub async fn list_by_chapter(
        &self,
        ctx: &TenantContext,
        chapter: ChapterId,
    ) -> Result<Vec<ContentBlock>, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        tx.fetch::<Chapter>(chapter).await?;
        tx.list(Filter::scope(chapter.into_inner())).await
    }

    /// Update a block. The word count follows the new content.
    pub async fn update(
        &self,
        ctx: &TenantContext,
        id: ContentBlockId,
        changes: ContentBlockChanges,
    ) -> Result<ContentBlock, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        let mut block: ContentBlock = tx.fetch(id).await?;
        if let Some(content) = changes.content {
            block.content = content;
        }
        if let Some(order) = changes.order_num {
            block.order_num = order;
        }
        let metadata = changes.metadata.unwrap_or_else(|| block.metadata.clone());
        block.metadata = stamped(block.kind, &block.content, Some(metadata))?;
        block.updated_at = clock::now();
        tx.update(&block).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Update, EntityKind::ContentBlock, id)
            .await;
        self.deps.side.ingest(ctx, "content_block", id).await;
        Ok(block)
    }

    /// Delete a block and its edges.
    pub async fn delete(&self, ctx: &TenantContext, id: ContentBlockId) -> Result<(), CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        let block: ContentBlock = tx.fetch(id).await?;
        cascade::content_block(&mut tx, &block).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Delete, EntityKind::ContentBlock, id)
            .await;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::service::story::{NewStory, StoryService};
    use crate::service::tenant::{NewTenant, TenantService};
    use crate::side_channel::SideChannels;
    use crate::store::MemoryStore;

    struct Fixture {
        deps: Deps,
        ctx: TenantContext,
        story: StoryId,
    }

    async fn fixture() -> Fixture {
        let deps = Deps::new(Arc::new(MemoryStore::new()), Arc::new(SideChannels::noop()));
        let tenant = TenantService::new(deps.clone())
            .create(NewTenant { name: "Acme".into() })
            .await
            .unwrap();
        let ctx = TenantContext::new(tenant.id);
        let story = StoryService::new(deps.clone())
            .create(
                &ctx,
                NewStory {
                    title: "Dune".into(),
                    ..NewStory::default()
                },
            )
            .await
            .unwrap();
        Fixture {
            deps,
            ctx,
            story: story.id,
        }
    }

    async fn chapter(f: &Fixture, story: StoryId, number: u32) -> Chapter {
        ChapterService::new(f.deps.clone())
            .create(
                &f.ctx,
                NewChapter {
                    story_id: story,
                    number,
                    title: format!("Chapter {number}"),
                    status: None,
                },
            )
            .await
            .unwrap()
    }

    fn block(chapter: ChapterId, kind: ContentKind, content: &str) -> NewContentBlock {
        NewContentBlock {
            chapter_id: chapter,
            kind,
            content: content.into(),
            order_num: None,
            metadata: None,
        }
    }

    #[tokio::test]
    async fn synopsis_is_a_singleton() {
        let f = fixture().await;
        let one = chapter(&f, f.story, 1).await;
        let blocks = ContentBlockService::new(f.deps.clone());
        let first = blocks
            .create(&f.ctx, block(one.id, ContentKind::Synopsis, "A desert planet"))
            .await
            .unwrap();
        assert_eq!(first.metadata[WORD_COUNT], 3);

        let err = blocks
            .create(&f.ctx, block(one.id, ContentKind::Synopsis, "Again"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::AlreadyExists { field: "kind", .. }));

        let prose = blocks
            .create(&f.ctx, block(one.id, ContentKind::Prose, "It began"))
            .await
            .unwrap();
        assert_eq!(prose.order_num, 2);
    }

    #[tokio::test]
    async fn scene_cannot_move_to_another_story() {
        let f = fixture().await;
        let other = StoryService::new(f.deps.clone())
            .create(
                &f.ctx,
                NewStory {
                    title: "Emma".into(),
                    ..NewStory::default()
                },
            )
            .await
            .unwrap();
        let home = chapter(&f, f.story, 1).await;
        let away = chapter(&f, other.id, 1).await;

        let scenes = SceneService::new(f.deps.clone());
        let scene = scenes
            .create(
                &f.ctx,
                NewScene {
                    story_id: f.story,
                    chapter_id: Some(home.id),
                    order_num: 1,
                    goal: None,
                    time_ref: None,
                    pov_character_id: None,
                    location_id: None,
                },
            )
            .await
            .unwrap();

        let err = scenes.move_to(&f.ctx, scene.id, away.id).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation { field: "chapter_id", .. }));

        let second = chapter(&f, f.story, 2).await;
        let moved = scenes.move_to(&f.ctx, scene.id, second.id).await.unwrap();
        assert_eq!(moved.chapter_id, Some(second.id));
    }
}
