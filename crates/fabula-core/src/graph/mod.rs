//! The entity-relation graph.
//!
//! Edges are directed and labelled. A conceptually bidirectional link is
//! two rows pointing at each other through `mirror_id`; creating and
//! deleting such a pair always happens inside one transaction. Every
//! function here takes the caller's [`Tx`] so use cases can compose graph
//! writes with their own (for example an entity delete cascading into its
//! edges).
//!
//! - [`cursor`] -- Opaque pagination cursors
//! - [`inverse`] -- Inverse labels for mirror edges

pub mod cursor;
pub mod inverse;

use std::collections::BTreeMap;

use fabula_types::{EntityKind, EntityRelation, RelationId, UserId, WorldId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock;
use crate::error::CoreError;
use crate::store::{
    CursorPosition, Document, RelationEndpoint, RelationQuery, SortDirection, Table, Tx,
};

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 50;
/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Input of [`create`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewRelation {
    /// World the edge lives in.
    pub world_id: WorldId,
    /// Kind of the source entity.
    pub source_type: EntityKind,
    /// Source entity id.
    pub source_id: Uuid,
    /// Kind of the target entity.
    pub target_type: EntityKind,
    /// Target entity id.
    pub target_id: Uuid,
    /// Edge label.
    pub relation_type: String,
    /// Optional context kind.
    #[serde(default)]
    pub context_type: Option<String>,
    /// Optional context id.
    #[serde(default)]
    pub context_id: Option<Uuid>,
    /// Free-form attributes.
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
    /// Summary; generated from the endpoints and label when absent or empty.
    #[serde(default)]
    pub summary: Option<String>,
    /// Also insert the inverse edge.
    #[serde(default)]
    pub create_mirror: bool,
}

/// Edits accepted by [`update`]. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RelationChanges {
    /// New label.
    pub relation_type: Option<String>,
    /// Replacement attribute map.
    pub attributes: Option<BTreeMap<String, serde_json::Value>>,
    /// New summary.
    pub summary: Option<String>,
}

/// Result of [`create`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedRelation {
    /// The requested edge.
    pub relation: EntityRelation,
    /// Its inverse, when a mirror was requested.
    pub mirror: Option<EntityRelation>,
}

/// Filters and window of a paginated listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Only edges with this label.
    pub relation_type: Option<String>,
    /// Return only the canonical row of mirrored pairs.
    pub exclude_mirrors: bool,
    /// Cursor returned by the previous page.
    pub cursor: Option<String>,
    /// Sort direction over `(created_at, id)`.
    pub direction: SortDirection,
    /// Page size; defaults to 50, capped at 100.
    pub limit: Option<u32>,
}

/// One page of a cursor-paginated listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    /// Rows of this page.
    pub items: Vec<T>,
    /// Cursor for the next page, present only when `has_more`.
    pub next_cursor: Option<String>,
    /// Whether more rows follow.
    pub has_more: bool,
}

const DUPLICATE_EDGE: &str =
    "a relation with the same source, target, type, and context already exists";
const DUPLICATE_MIRROR: &str =
    "the inverse relation already exists; create it without a mirror or delete the inverse first";

/// Default summary: `"{source_kind} {relation_type} {target_kind}"`.
pub fn default_summary(source: EntityKind, relation_type: &str, target: EntityKind) -> String {
    format!("{source} {relation_type} {target}")
}

// ---------------------------------------------------------------------------
// Endpoint resolution
// ---------------------------------------------------------------------------

async fn document(tx: &mut Tx, kind: EntityKind, id: Uuid) -> Result<Document, CoreError> {
    let table = Table::for_kind(kind).ok_or_else(|| {
        CoreError::validation("entity_type", format!("{kind} cannot be a relation endpoint"))
    })?;
    tx.find_document(table, id)
        .await?
        .ok_or_else(|| CoreError::not_found(kind.as_str(), id))
}

async fn story_world(tx: &mut Tx, story: Option<Uuid>) -> Result<Option<WorldId>, CoreError> {
    let Some(story) = story else {
        return Ok(None);
    };
    let doc = document(tx, EntityKind::Story, story).await?;
    Ok(doc.scope_id.map(WorldId::from))
}

/// Verify `(kind, id)` exists for the transaction's tenant and return the
/// world it belongs to, if it belongs to one.
///
/// # Errors
///
/// `Validation` when `kind` cannot take part in relations, `NotFound` when
/// the entity is missing.
pub async fn endpoint_world(
    tx: &mut Tx,
    kind: EntityKind,
    id: Uuid,
) -> Result<Option<WorldId>, CoreError> {
    if !kind.is_relatable() {
        return Err(CoreError::validation(
            "entity_type",
            format!("{kind} cannot be a relation endpoint"),
        ));
    }
    let doc = document(tx, kind, id).await?;
    match kind {
        EntityKind::World => Ok(Some(WorldId::from(doc.id))),
        k if k.is_world_scoped() => Ok(doc.scope_id.map(WorldId::from)),
        EntityKind::Story => Ok(doc.scope_id.map(WorldId::from)),
        EntityKind::Chapter => story_world(tx, doc.scope_id).await,
        EntityKind::Scene => story_world(tx, doc.ref_id).await,
        EntityKind::Beat => {
            let scene = match doc.scope_id {
                Some(scene) => document(tx, EntityKind::Scene, scene).await?,
                None => return Ok(None),
            };
            story_world(tx, scene.ref_id).await
        }
        EntityKind::ContentBlock => {
            let chapter = match doc.scope_id {
                Some(chapter) => document(tx, EntityKind::Chapter, chapter).await?,
                None => return Ok(None),
            };
            story_world(tx, chapter.scope_id).await
        }
        _ => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Key columns of the unique edge index.
struct EdgeKey<'a> {
    source: (EntityKind, Uuid),
    target: (EntityKind, Uuid),
    relation_type: &'a str,
    context_type: Option<&'a str>,
    context_id: Option<Uuid>,
}

/// Fail when another row already carries `key`. `except` is the row being
/// relabelled, if any.
async fn ensure_unique(
    tx: &mut Tx,
    key: &EdgeKey<'_>,
    except: Option<RelationId>,
    message: &str,
) -> Result<(), CoreError> {
    let rows = tx
        .list_relations(&RelationQuery {
            counterpart: Some(key.target),
            relation_type: Some(key.relation_type.to_owned()),
            ..RelationQuery::all(RelationEndpoint::Source(key.source.0, key.source.1))
        })
        .await?;
    let taken = rows.iter().any(|r| {
        Some(r.id) != except
            && r.context_type.as_deref() == key.context_type
            && r.context_id == key.context_id
    });
    if taken {
        return Err(CoreError::validation("relation", message));
    }
    Ok(())
}

/// Validate and insert an edge, plus its mirror when requested.
///
/// # Errors
///
/// `Validation` when the label is empty, the endpoints coincide, an
/// endpoint lives in another world, or an identical edge already exists;
/// `NotFound` when an endpoint or the world is missing.
pub async fn create(
    tx: &mut Tx,
    input: NewRelation,
    created_by: Option<UserId>,
) -> Result<CreatedRelation, CoreError> {
    let relation_type = input.relation_type.trim().to_owned();
    if relation_type.is_empty() {
        return Err(CoreError::validation(
            "relation_type",
            "relation type is required",
        ));
    }
    if input.source_id.is_nil() {
        return Err(CoreError::validation("source_id", "source_id is required"));
    }
    if input.target_id.is_nil() {
        return Err(CoreError::validation("target_id", "target_id is required"));
    }
    if input.source_type == input.target_type && input.source_id == input.target_id {
        return Err(CoreError::validation(
            "target_id",
            "source and target must be different",
        ));
    }

    // The world must exist for this tenant.
    document(tx, EntityKind::World, input.world_id.into_inner()).await?;

    let source_world = endpoint_world(tx, input.source_type, input.source_id).await?;
    let target_world = endpoint_world(tx, input.target_type, input.target_id).await?;
    for world in [source_world, target_world].into_iter().flatten() {
        if world != input.world_id {
            return Err(CoreError::validation(
                "world_id",
                "source and target must belong to the same world",
            ));
        }
    }

    let key = EdgeKey {
        source: (input.source_type, input.source_id),
        target: (input.target_type, input.target_id),
        relation_type: &relation_type,
        context_type: input.context_type.as_deref(),
        context_id: input.context_id,
    };
    ensure_unique(tx, &key, None, DUPLICATE_EDGE).await?;
    if input.create_mirror {
        let inverse = EdgeKey {
            source: key.target,
            target: key.source,
            relation_type: inverse::inverse_of(&relation_type),
            ..key
        };
        ensure_unique(tx, &inverse, None, DUPLICATE_MIRROR).await?;
    }

    let summary = input
        .summary
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default_summary(input.source_type, &relation_type, input.target_type));

    let now = clock::now();
    let mut relation = EntityRelation {
        id: RelationId::new(),
        tenant_id: tx.tenant(),
        world_id: input.world_id,
        source_type: input.source_type,
        source_id: input.source_id,
        target_type: input.target_type,
        target_id: input.target_id,
        relation_type,
        context_type: input.context_type,
        context_id: input.context_id,
        attributes: input.attributes,
        summary,
        mirror_id: None,
        created_by_user_id: created_by,
        created_at: now,
        updated_at: now,
    };

    let mirror = if input.create_mirror {
        let mirror = mirror_of(&mut relation);
        tx.insert_relation(&relation).await?;
        tx.insert_relation(&mirror).await?;
        Some(mirror)
    } else {
        tx.insert_relation(&relation).await?;
        None
    };

    Ok(CreatedRelation { relation, mirror })
}

/// Two fresh ids, the smaller first. The smaller id marks the canonical
/// row of a mirrored pair.
pub fn ordered_ids() -> (RelationId, RelationId) {
    let (a, b) = (RelationId::new(), RelationId::new());
    if a < b { (a, b) } else { (b, a) }
}

/// Build the inverse of `relation` and link the two rows. `relation` keeps
/// the canonical (smaller) id.
fn mirror_of(relation: &mut EntityRelation) -> EntityRelation {
    let (canonical, inverse_id) = ordered_ids();
    relation.id = canonical;
    let mirror = EntityRelation {
        id: inverse_id,
        tenant_id: relation.tenant_id,
        world_id: relation.world_id,
        source_type: relation.target_type,
        source_id: relation.target_id,
        target_type: relation.source_type,
        target_id: relation.source_id,
        relation_type: inverse::inverse_of(&relation.relation_type).to_owned(),
        context_type: relation.context_type.clone(),
        context_id: relation.context_id,
        attributes: relation.attributes.clone(),
        summary: relation.summary.clone(),
        mirror_id: Some(relation.id),
        created_by_user_id: relation.created_by_user_id,
        created_at: relation.created_at,
        updated_at: relation.updated_at,
    };
    relation.mirror_id = Some(mirror.id);
    mirror
}

/// Apply `changes` to one row. The mirror is left untouched.
///
/// # Errors
///
/// `Validation` when the new label is empty or another row already links
/// the same endpoints under it.
pub async fn update(
    tx: &mut Tx,
    id: RelationId,
    changes: RelationChanges,
) -> Result<EntityRelation, CoreError> {
    let mut relation = tx.fetch_relation(id).await?;
    let relabelled = changes.relation_type.is_some();
    if let Some(relation_type) = changes.relation_type {
        let relation_type = relation_type.trim().to_owned();
        if relation_type.is_empty() {
            return Err(CoreError::validation(
                "relation_type",
                "relation type is required",
            ));
        }
        if relation_type != relation.relation_type {
            let key = EdgeKey {
                source: (relation.source_type, relation.source_id),
                target: (relation.target_type, relation.target_id),
                relation_type: &relation_type,
                context_type: relation.context_type.as_deref(),
                context_id: relation.context_id,
            };
            ensure_unique(tx, &key, Some(relation.id), DUPLICATE_EDGE).await?;
        }
        relation.relation_type = relation_type;
    }
    if let Some(attributes) = changes.attributes {
        relation.attributes = attributes;
    }
    match changes.summary {
        Some(summary) => relation.summary = summary,
        None if relabelled => {
            relation.summary = default_summary(
                relation.source_type,
                &relation.relation_type,
                relation.target_type,
            );
        }
        None => {}
    }
    relation.updated_at = clock::now();
    tx.update_relation(&relation).await?;
    Ok(relation)
}

/// Delete one edge and its mirror. Returns the deleted row.
pub async fn delete(tx: &mut Tx, id: RelationId) -> Result<EntityRelation, CoreError> {
    let relation = tx.fetch_relation(id).await?;
    tx.delete_relation(id).await?;
    if let Some(mirror) = relation.mirror_id {
        tx.delete_relation(mirror).await?;
    }
    Ok(relation)
}

/// Delete every edge with `(kind, id)` as source or target.
///
/// Mirrors are removed with their partner because both rows touch the
/// entity.
pub async fn delete_by_entity(tx: &mut Tx, kind: EntityKind, id: Uuid) -> Result<u64, CoreError> {
    tx.delete_relations_touching(kind, id).await
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Clamp a requested page size into `1..=100`, defaulting to 50.
pub fn page_size(limit: Option<u32>) -> u32 {
    match limit {
        None | Some(0) => DEFAULT_PAGE_SIZE,
        Some(n) => n.min(MAX_PAGE_SIZE),
    }
}

/// One page of edges anchored at `endpoint`.
///
/// # Errors
///
/// `Validation` on `cursor` when the cursor cannot be decoded.
pub async fn list(
    tx: &mut Tx,
    endpoint: RelationEndpoint,
    options: ListOptions,
) -> Result<Page<EntityRelation>, CoreError> {
    let limit = page_size(options.limit);
    let after = options.cursor.as_deref().map(cursor::decode).transpose()?;
    let query = RelationQuery {
        endpoint,
        counterpart: None,
        relation_type: options.relation_type,
        exclude_mirrors: options.exclude_mirrors,
        after,
        direction: options.direction,
        limit: Some(limit.saturating_add(1)),
    };
    let mut items = tx.list_relations(&query).await?;

    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    let has_more = items.len() > limit;
    items.truncate(limit);

    let next_cursor = match items.last() {
        Some(last) if has_more => Some(cursor::encode(&CursorPosition {
            id: last.id,
            created_at: last.created_at,
        })?),
        _ => None,
    };

    Ok(Page {
        items,
        next_cursor,
        has_more,
    })
}

/// Every edge from `(source_kind, source_id)` to `(target_kind, target_id)`.
pub async fn between(
    tx: &mut Tx,
    source: (EntityKind, Uuid),
    target: (EntityKind, Uuid),
) -> Result<Vec<EntityRelation>, CoreError> {
    tx.list_relations(&RelationQuery {
        counterpart: Some(target),
        ..RelationQuery::all(RelationEndpoint::Source(source.0, source.1))
    })
    .await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use fabula_types::TenantId;

    use super::*;

    #[test]
    fn page_size_is_clamped() {
        assert_eq!(page_size(None), 50);
        assert_eq!(page_size(Some(0)), 50);
        assert_eq!(page_size(Some(20)), 20);
        assert_eq!(page_size(Some(500)), 100);
    }

    #[test]
    fn summary_names_both_kinds() {
        assert_eq!(
            default_summary(EntityKind::Artifact, "mentions", EntityKind::Character),
            "artifact mentions character"
        );
    }

    #[test]
    fn mirror_swaps_endpoints_and_links_ids() {
        let now = clock::now();
        let mut relation = EntityRelation {
            id: RelationId::new(),
            tenant_id: TenantId::new(),
            world_id: WorldId::new(),
            source_type: EntityKind::Character,
            source_id: Uuid::now_v7(),
            target_type: EntityKind::Faction,
            target_id: Uuid::now_v7(),
            relation_type: "leader_of".into(),
            context_type: None,
            context_id: None,
            attributes: BTreeMap::from([("since".to_owned(), serde_json::json!("year 3"))]),
            summary: "character leader_of faction".into(),
            mirror_id: None,
            created_by_user_id: None,
            created_at: now,
            updated_at: now,
        };

        let mirror = mirror_of(&mut relation);
        assert_eq!(relation.mirror_id, Some(mirror.id));
        assert_eq!(mirror.mirror_id, Some(relation.id));
        assert_eq!(mirror.source_id, relation.target_id);
        assert_eq!(mirror.target_type, EntityKind::Character);
        assert_eq!(mirror.relation_type, "led_by");
        assert_eq!(mirror.attributes, relation.attributes);
        assert!(relation.id < mirror.id);
    }

    #[test]
    fn ordered_ids_put_the_smaller_first() {
        for _ in 0..64 {
            let (a, b) = ordered_ids();
            assert!(a < b);
        }
    }
}
