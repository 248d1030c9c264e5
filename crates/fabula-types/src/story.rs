//! Story entities: versions and the chapter > scene > beat tree beneath them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{BeatType, ContentKind, StoryStatus};
use crate::ids::{
    BeatId, ChapterId, CharacterId, ContentBlockId, LocationId, SceneId, StoryId, TenantId,
    UserId, WorldId,
};

/// A narrative version node.
///
/// A root story points at itself through `root_story_id`. Every clone
/// keeps the root of its source and records the source in
/// `previous_story_id`, so all versions of a story form a DAG hanging off
/// the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Story {
    /// Unique identifier.
    pub id: StoryId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// World the story is set in.
    pub world_id: Option<WorldId>,
    /// Title shown to the author.
    pub title: String,
    /// Optional description of this version.
    pub description: Option<String>,
    /// Publication state.
    pub status: StoryStatus,
    /// 1 for the root, `n + 1` for the n-th clone of a root.
    pub version_number: u32,
    /// Founding version of the version graph.
    pub root_story_id: StoryId,
    /// Version this one was cloned from.
    pub previous_story_id: Option<StoryId>,
    /// Author who created the version.
    pub created_by_user_id: Option<UserId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Story {
    /// Whether this story founded its version graph.
    pub fn is_root(&self) -> bool {
        self.root_story_id == self.id
    }
}

/// A chapter, ordered within its story by `number`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Chapter {
    /// Unique identifier.
    pub id: ChapterId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Owning story.
    pub story_id: StoryId,
    /// Sequence number within the story.
    pub number: u32,
    /// Chapter title.
    pub title: String,
    /// Publication state.
    pub status: StoryStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A scene, ordered within its chapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Scene {
    /// Unique identifier.
    pub id: SceneId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Story the scene belongs to.
    pub story_id: StoryId,
    /// Chapter the scene is filed under, if any.
    pub chapter_id: Option<ChapterId>,
    /// Position within the chapter.
    pub order_num: u32,
    /// Point-of-view character.
    pub pov_character_id: Option<CharacterId>,
    /// Where the scene takes place.
    pub location_id: Option<LocationId>,
    /// Free-form time reference ("dawn, day 3").
    pub time_ref: Option<String>,
    /// What the scene must accomplish.
    pub goal: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A beat, ordered within its scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Beat {
    /// Unique identifier.
    pub id: BeatId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Owning scene.
    pub scene_id: SceneId,
    /// Position within the scene.
    pub order_num: u32,
    /// Narrative function.
    #[serde(rename = "type")]
    pub beat_type: BeatType,
    /// What the beat is meant to do.
    pub intent: Option<String>,
    /// What actually happens.
    pub outcome: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A typed block of chapter content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ContentBlock {
    /// Unique identifier.
    pub id: ContentBlockId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Owning chapter.
    pub chapter_id: ChapterId,
    /// Position within the chapter, starting at 1.
    pub order_num: u32,
    /// Block kind.
    pub kind: ContentKind,
    /// Text body or media URL.
    pub content: String,
    /// Free-form metadata (`word_count` for text kinds).
    pub metadata: serde_json::Value,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}
