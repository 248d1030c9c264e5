//! Per-owner reference lists projected from the relation graph.
//!
//! Older clients manage "references" of an artifact, event, faction, lore
//! entry, scene or content block as flat lists. Each reference is an edge
//! whose source is the owner; `role` and `notes` travel in the edge's
//! attributes. Callers depend on [`ReferenceAdapter`] so this surface can
//! be retired without touching the graph.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fabula_types::{AuditAction, EntityKind, EntityRelation, RelationId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Deps, optional};
use crate::error::CoreError;
use crate::graph::{self, NewRelation, RelationChanges};
use crate::store::{RelationEndpoint, RelationQuery};
use crate::tenant::TenantContext;

/// Label used when a reference is added without one.
pub const DEFAULT_RELATIONSHIP: &str = "references";

/// Kinds that own reference lists.
pub const OWNER_KINDS: [EntityKind; 6] = [
    EntityKind::Artifact,
    EntityKind::Event,
    EntityKind::Faction,
    EntityKind::Lore,
    EntityKind::Scene,
    EntityKind::ContentBlock,
];

const NOTES: &str = "notes";
const ROLE: &str = "role";

/// One entry of an owner's reference list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    /// Id of the backing relation.
    pub id: RelationId,
    /// Owner kind.
    pub owner_type: EntityKind,
    /// Owner id.
    pub owner_id: Uuid,
    /// Referenced kind.
    pub entity_type: EntityKind,
    /// Referenced id.
    pub entity_id: Uuid,
    /// Relation label.
    pub relationship_type: String,
    /// Role of the referenced entity.
    pub role: Option<String>,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

fn text_attribute(attributes: &BTreeMap<String, serde_json::Value>, key: &str) -> Option<String> {
    attributes
        .get(key)
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned)
}

impl From<EntityRelation> for Reference {
    fn from(relation: EntityRelation) -> Self {
        Self {
            id: relation.id,
            owner_type: relation.source_type,
            owner_id: relation.source_id,
            entity_type: relation.target_type,
            entity_id: relation.target_id,
            role: text_attribute(&relation.attributes, ROLE),
            notes: text_attribute(&relation.attributes, NOTES),
            relationship_type: relation.relation_type,
            created_at: relation.created_at,
            updated_at: relation.updated_at,
        }
    }
}

/// Input of [`ReferenceAdapter::add_reference`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewReference {
    /// Referenced kind.
    pub entity_type: EntityKind,
    /// Referenced id.
    pub entity_id: Uuid,
    /// Relation label, `references` when absent.
    #[serde(default)]
    pub relationship_type: Option<String>,
    /// Role of the referenced entity.
    #[serde(default)]
    pub role: Option<String>,
    /// Free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Edits accepted by [`ReferenceAdapter::update_reference`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReferenceChanges {
    /// New label.
    pub relationship_type: Option<String>,
    /// New notes; an empty string clears them.
    pub notes: Option<String>,
}

/// Reference list operations of one owner kind.
#[async_trait]
pub trait ReferenceAdapter: Send + Sync {
    /// Reference `input.entity_*` from the owner.
    async fn add_reference(
        &self,
        ctx: &TenantContext,
        owner: EntityKind,
        owner_id: Uuid,
        input: NewReference,
    ) -> Result<Reference, CoreError>;

    /// Every reference of the owner, oldest first.
    async fn list_references(
        &self,
        ctx: &TenantContext,
        owner: EntityKind,
        owner_id: Uuid,
    ) -> Result<Vec<Reference>, CoreError>;

    /// Drop every reference from the owner to the entity.
    async fn remove_reference(
        &self,
        ctx: &TenantContext,
        owner: EntityKind,
        owner_id: Uuid,
        entity_type: EntityKind,
        entity_id: Uuid,
    ) -> Result<(), CoreError>;

    /// Relabel a reference or change its notes.
    async fn update_reference(
        &self,
        ctx: &TenantContext,
        owner: EntityKind,
        id: RelationId,
        changes: ReferenceChanges,
    ) -> Result<Reference, CoreError>;
}

fn owner_kind(owner: EntityKind) -> Result<EntityKind, CoreError> {
    if OWNER_KINDS.contains(&owner) {
        Ok(owner)
    } else {
        Err(CoreError::validation(
            "owner_type",
            format!("{owner} does not keep references"),
        ))
    }
}

/// [`ReferenceAdapter`] backed by the relation graph.
#[derive(Debug, Clone)]
pub struct GraphReferences {
    deps: Deps,
}

impl GraphReferences {
    /// Create the adapter.
    pub const fn new(deps: Deps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl ReferenceAdapter for GraphReferences {
    async fn add_reference(
        &self,
        ctx: &TenantContext,
        owner: EntityKind,
        owner_id: Uuid,
        input: NewReference,
    ) -> Result<Reference, CoreError> {
        let owner = owner_kind(owner)?;
        let mut tx = self.deps.open(ctx).await?;

        let owner_world = graph::endpoint_world(&mut tx, owner, owner_id).await?;
        let entity_world =
            graph::endpoint_world(&mut tx, input.entity_type, input.entity_id).await?;
        let world_id = owner_world.or(entity_world).ok_or_else(|| {
            CoreError::validation(
                "world_id",
                "a reference needs an endpoint that belongs to a world",
            )
        })?;

        let mut attributes = BTreeMap::new();
        if let Some(role) = optional(input.role) {
            attributes.insert(ROLE.to_owned(), serde_json::Value::String(role));
        }
        if let Some(notes) = optional(input.notes) {
            attributes.insert(NOTES.to_owned(), serde_json::Value::String(notes));
        }
        let relation_type =
            optional(input.relationship_type).unwrap_or_else(|| DEFAULT_RELATIONSHIP.to_owned());

        let created = graph::create(
            &mut tx,
            NewRelation {
                world_id,
                source_type: owner,
                source_id: owner_id,
                target_type: input.entity_type,
                target_id: input.entity_id,
                relation_type,
                context_type: None,
                context_id: None,
                attributes,
                summary: None,
                create_mirror: false,
            },
            ctx.actor,
        )
        .await?;
        tx.commit().await?;

        let id = created.relation.id;
        self.deps
            .side
            .audit(ctx, AuditAction::Create, EntityKind::Relation, id)
            .await;
        self.deps.side.ingest(ctx, "relation", id).await;
        Ok(created.relation.into())
    }

    async fn list_references(
        &self,
        ctx: &TenantContext,
        owner: EntityKind,
        owner_id: Uuid,
    ) -> Result<Vec<Reference>, CoreError> {
        let owner = owner_kind(owner)?;
        let mut tx = self.deps.open(ctx).await?;
        graph::endpoint_world(&mut tx, owner, owner_id).await?;
        let edges = tx
            .list_relations(&RelationQuery::all(RelationEndpoint::Source(owner, owner_id)))
            .await?;
        Ok(edges.into_iter().map(Reference::from).collect())
    }

    async fn remove_reference(
        &self,
        ctx: &TenantContext,
        owner: EntityKind,
        owner_id: Uuid,
        entity_type: EntityKind,
        entity_id: Uuid,
    ) -> Result<(), CoreError> {
        let owner = owner_kind(owner)?;
        let mut tx = self.deps.open(ctx).await?;
        let edges = graph::between(&mut tx, (owner, owner_id), (entity_type, entity_id)).await?;
        if edges.is_empty() {
            return Err(CoreError::not_found("reference", entity_id));
        }
        let mut removed = Vec::with_capacity(edges.len());
        for edge in edges {
            // A mirrored pair may already be gone with its partner.
            if tx.find_relation(edge.id).await?.is_some() {
                graph::delete(&mut tx, edge.id).await?;
                removed.push(edge.id);
            }
        }
        tx.commit().await?;

        for id in removed {
            self.deps
                .side
                .audit(ctx, AuditAction::Delete, EntityKind::Relation, id)
                .await;
        }
        Ok(())
    }

    async fn update_reference(
        &self,
        ctx: &TenantContext,
        owner: EntityKind,
        id: RelationId,
        changes: ReferenceChanges,
    ) -> Result<Reference, CoreError> {
        let owner = owner_kind(owner)?;
        let mut tx = self.deps.open(ctx).await?;
        let current = tx.fetch_relation(id).await?;
        if current.source_type != owner {
            return Err(CoreError::not_found("reference", id));
        }

        let attributes = changes.notes.map(|notes| {
            let mut attributes = current.attributes.clone();
            match optional(Some(notes)) {
                Some(notes) => {
                    attributes.insert(NOTES.to_owned(), serde_json::Value::String(notes));
                }
                None => {
                    attributes.remove(NOTES);
                }
            }
            attributes
        });
        let updated = graph::update(
            &mut tx,
            id,
            RelationChanges {
                relation_type: changes.relationship_type,
                attributes,
                summary: None,
            },
        )
        .await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Update, EntityKind::Relation, id)
            .await;
        self.deps.side.ingest(ctx, "relation", id).await;
        Ok(updated.into())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn reference_lifts_role_and_notes_out_of_attributes() {
        let now = crate::clock::now();
        let relation = EntityRelation {
            id: RelationId::new(),
            tenant_id: fabula_types::TenantId::new(),
            world_id: fabula_types::WorldId::new(),
            source_type: EntityKind::Scene,
            source_id: Uuid::now_v7(),
            target_type: EntityKind::Character,
            target_id: Uuid::now_v7(),
            relation_type: DEFAULT_RELATIONSHIP.into(),
            context_type: None,
            context_id: None,
            attributes: BTreeMap::from([
                (ROLE.to_owned(), serde_json::json!("narrator")),
                (NOTES.to_owned(), serde_json::json!("first appearance")),
            ]),
            summary: "scene references character".into(),
            mirror_id: None,
            created_by_user_id: None,
            created_at: now,
            updated_at: now,
        };
        let reference = Reference::from(relation);
        assert_eq!(reference.owner_type, EntityKind::Scene);
        assert_eq!(reference.role.as_deref(), Some("narrator"));
        assert_eq!(reference.notes.as_deref(), Some("first appearance"));
    }

    #[test]
    fn only_known_owners_keep_references() {
        assert!(owner_kind(EntityKind::Lore).is_ok());
        assert!(owner_kind(EntityKind::World).is_err());
    }
}
