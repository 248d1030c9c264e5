//! Entity-relation edges and audit entries.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::enums::{AuditAction, EntityKind};
use crate::ids::{AuditEntryId, RelationId, TenantId, UserId, WorldId};

/// A directed labelled edge `(source_type, source_id) -> (target_type, target_id)`.
///
/// A bidirectional conceptual link is stored as two rows whose
/// `mirror_id` fields point at each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EntityRelation {
    /// Unique identifier.
    pub id: RelationId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// World both endpoints live in.
    pub world_id: WorldId,
    /// Kind of the source entity.
    pub source_type: EntityKind,
    /// Source entity id.
    pub source_id: Uuid,
    /// Kind of the target entity.
    pub target_type: EntityKind,
    /// Target entity id.
    pub target_id: Uuid,
    /// Label ("ally_of", "located_in", "mentions").
    pub relation_type: String,
    /// Optional kind of the context the relation holds in (e.g. a scene).
    pub context_type: Option<String>,
    /// Optional id of that context.
    pub context_id: Option<Uuid>,
    /// Free-form attributes (`notes`, `role`, `weight`, ...).
    pub attributes: BTreeMap<String, serde_json::Value>,
    /// Human-readable summary of the edge.
    pub summary: String,
    /// The paired inverse row, if any.
    pub mirror_id: Option<RelationId>,
    /// Author who created the edge.
    pub created_by_user_id: Option<UserId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl EntityRelation {
    /// Whether this row is the canonical direction of its pair.
    ///
    /// Unpaired rows are always canonical; of a mirrored pair, the row
    /// with the smaller id is.
    pub fn is_canonical(&self) -> bool {
        self.mirror_id.is_none_or(|mirror| self.id < mirror)
    }

    /// Whether `(kind, id)` is either endpoint of this edge.
    pub fn touches(&self, kind: EntityKind, id: Uuid) -> bool {
        (self.source_type == kind && self.source_id == id)
            || (self.target_type == kind && self.target_id == id)
    }
}

/// One row of the append-only audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AuditEntry {
    /// Unique identifier.
    pub id: AuditEntryId,
    /// Tenant the action happened in.
    pub tenant_id: TenantId,
    /// Acting user, when known.
    pub actor_user_id: Option<UserId>,
    /// What happened.
    pub action: AuditAction,
    /// Kind of the affected entity.
    pub entity_type: EntityKind,
    /// Id of the affected entity.
    pub entity_id: Uuid,
    /// Action-specific details.
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// When the action happened.
    pub created_at: DateTime<Utc>,
}
