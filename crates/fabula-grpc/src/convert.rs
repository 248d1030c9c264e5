//! Conversions between domain records and wire messages.
//!
//! Wire messages carry ids as UUID strings, enums by their wire names,
//! timestamps as RFC 3339 text and free-form payloads as JSON text. The
//! `parse_*` helpers turn request fields back into typed values and report
//! failures as `INVALID_ARGUMENT` naming the field.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use fabula_core::CoreError;
use fabula_core::service::story::{VersionEdge, VersionGraph};
use fabula_types::{
    EntityRelation, Event, Location, ParseEnumError, StatsVersion, Story, Tenant, World,
};
use serde_json::Value;
use tonic::Status;
use uuid::Uuid;

use crate::error::status;
use crate::pb;

// ---------------------------------------------------------------------------
// Request parsing
// ---------------------------------------------------------------------------

fn invalid(field: &'static str, message: impl Into<String>) -> Status {
    status(CoreError::validation(field, message))
}

/// Parse a required typed id.
pub fn parse_id<I: From<Uuid>>(field: &'static str, raw: &str) -> Result<I, Status> {
    Uuid::parse_str(raw.trim())
        .map(I::from)
        .map_err(|e| invalid(field, format!("invalid UUID {raw:?}: {e}")))
}

/// Parse an optional typed id.
pub fn parse_opt_id<I: From<Uuid>>(
    field: &'static str,
    raw: Option<&str>,
) -> Result<Option<I>, Status> {
    raw.map(|raw| parse_id(field, raw)).transpose()
}

/// Parse an enum from its wire name.
pub fn parse_enum<E>(field: &'static str, raw: &str) -> Result<E, Status>
where
    E: FromStr<Err = ParseEnumError>,
{
    raw.parse().map_err(|e: ParseEnumError| invalid(field, e.to_string()))
}

/// Parse an optional enum.
pub fn parse_opt_enum<E>(field: &'static str, raw: Option<&str>) -> Result<Option<E>, Status>
where
    E: FromStr<Err = ParseEnumError>,
{
    raw.map(|raw| parse_enum(field, raw)).transpose()
}

/// Parse a JSON document.
pub fn parse_json(field: &'static str, raw: &str) -> Result<Value, Status> {
    serde_json::from_str(raw).map_err(|e| invalid(field, format!("invalid JSON: {e}")))
}

/// Parse a JSON object into an attribute map. Blank text is the empty map.
pub fn parse_object(
    field: &'static str,
    raw: &str,
) -> Result<BTreeMap<String, Value>, Status> {
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    match parse_json(field, raw)? {
        Value::Object(map) => Ok(map.into_iter().collect()),
        _ => Err(invalid(field, "must be a JSON object")),
    }
}

/// Narrow a wire integer to the domain's `u8`.
pub fn parse_u8(field: &'static str, raw: u32) -> Result<u8, Status> {
    u8::try_from(raw).map_err(|e| invalid(field, format!("{raw} is out of range: {e}")))
}

// ---------------------------------------------------------------------------
// Domain -> wire
// ---------------------------------------------------------------------------

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn opt_string<T: ToString>(value: Option<T>) -> Option<String> {
    value.as_ref().map(ToString::to_string)
}

fn object_text(map: BTreeMap<String, Value>) -> String {
    Value::Object(map.into_iter().collect()).to_string()
}

impl From<Tenant> for pb::Tenant {
    fn from(t: Tenant) -> Self {
        Self {
            id: t.id.to_string(),
            name: t.name,
            status: t.status.as_str().to_owned(),
            created_at: timestamp(t.created_at),
            updated_at: timestamp(t.updated_at),
        }
    }
}

impl From<World> for pb::World {
    fn from(w: World) -> Self {
        Self {
            id: w.id.to_string(),
            tenant_id: w.tenant_id.to_string(),
            name: w.name,
            description: w.description,
            genre: w.genre,
            is_implicit: w.is_implicit,
            rpg_system_id: opt_string(w.rpg_system_id),
            created_at: timestamp(w.created_at),
            updated_at: timestamp(w.updated_at),
        }
    }
}

impl From<Location> for pb::Location {
    fn from(l: Location) -> Self {
        Self {
            id: l.id.to_string(),
            tenant_id: l.tenant_id.to_string(),
            world_id: l.world_id.to_string(),
            parent_id: opt_string(l.parent_id),
            name: l.name,
            r#type: l.kind,
            description: l.description,
            hierarchy_level: l.hierarchy_level,
            created_at: timestamp(l.created_at),
            updated_at: timestamp(l.updated_at),
        }
    }
}

impl From<Event> for pb::Event {
    fn from(e: Event) -> Self {
        Self {
            id: e.id.to_string(),
            tenant_id: e.tenant_id.to_string(),
            world_id: e.world_id.to_string(),
            parent_id: opt_string(e.parent_id),
            name: e.name,
            r#type: e.kind,
            description: e.description,
            timeline: e.timeline,
            importance: u32::from(e.importance),
            hierarchy_level: e.hierarchy_level,
            timeline_position: e.timeline_position,
            is_epoch: e.is_epoch,
            created_at: timestamp(e.created_at),
            updated_at: timestamp(e.updated_at),
        }
    }
}

impl From<EntityRelation> for pb::Relation {
    fn from(r: EntityRelation) -> Self {
        Self {
            id: r.id.to_string(),
            tenant_id: r.tenant_id.to_string(),
            world_id: r.world_id.to_string(),
            source_type: r.source_type.as_str().to_owned(),
            source_id: r.source_id.to_string(),
            target_type: r.target_type.as_str().to_owned(),
            target_id: r.target_id.to_string(),
            relation_type: r.relation_type,
            context_type: r.context_type,
            context_id: opt_string(r.context_id),
            attributes_json: object_text(r.attributes),
            summary: r.summary,
            mirror_id: opt_string(r.mirror_id),
            created_by_user_id: opt_string(r.created_by_user_id),
            created_at: timestamp(r.created_at),
            updated_at: timestamp(r.updated_at),
        }
    }
}

impl From<Story> for pb::Story {
    fn from(s: Story) -> Self {
        Self {
            id: s.id.to_string(),
            tenant_id: s.tenant_id.to_string(),
            world_id: opt_string(s.world_id),
            title: s.title,
            description: s.description,
            status: s.status.as_str().to_owned(),
            version_number: s.version_number,
            root_story_id: s.root_story_id.to_string(),
            previous_story_id: opt_string(s.previous_story_id),
            created_by_user_id: opt_string(s.created_by_user_id),
            created_at: timestamp(s.created_at),
            updated_at: timestamp(s.updated_at),
        }
    }
}

impl From<VersionEdge> for pb::VersionEdge {
    fn from(e: VersionEdge) -> Self {
        Self {
            from: e.from.to_string(),
            to: e.to.to_string(),
        }
    }
}

impl From<VersionGraph> for pb::VersionGraph {
    fn from(g: VersionGraph) -> Self {
        Self {
            root_story_id: g.root_story_id.to_string(),
            nodes: g.nodes.into_iter().map(Into::into).collect(),
            edges: g.edges.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<StatsVersion> for pb::StatsVersion {
    fn from(v: StatsVersion) -> Self {
        Self {
            id: v.id.to_string(),
            tenant_id: v.tenant_id.to_string(),
            subject_type: v.subject_type.as_str().to_owned(),
            subject_id: v.subject_id.to_string(),
            event_id: opt_string(v.event_id),
            base_stats_json: v.base_stats.to_string(),
            derived_stats_json: opt_string(v.derived_stats),
            progression_json: opt_string(v.progression),
            is_active: v.is_active,
            version: v.version,
            reason: v.reason,
            timeline: v.timeline,
            created_at: timestamp(v.created_at),
            updated_at: timestamp(v.updated_at),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use fabula_types::{EntityKind, WorldId};
    use serde_json::json;
    use tonic::Code;

    use super::*;

    #[test]
    fn ids_parse_or_name_the_field() {
        let id = Uuid::now_v7();
        let world: WorldId = parse_id("world_id", &id.to_string()).unwrap();
        assert_eq!(world.into_inner(), id);

        let err = parse_id::<WorldId>("world_id", "nope").unwrap_err();
        assert_eq!(err.code(), Code::InvalidArgument);
        assert!(err.message().starts_with("world_id"));
    }

    #[test]
    fn optional_ids_pass_absence_through() {
        assert_eq!(parse_opt_id::<WorldId>("world_id", None).unwrap(), None);
    }

    #[test]
    fn enums_use_wire_names() {
        let kind: EntityKind = parse_enum("source_type", "content_block").unwrap();
        assert_eq!(kind, EntityKind::ContentBlock);
        assert_eq!(
            parse_enum::<EntityKind>("source_type", "dragon")
                .unwrap_err()
                .code(),
            Code::InvalidArgument
        );
    }

    #[test]
    fn attribute_text_must_be_an_object() {
        assert!(parse_object("attributes_json", "  ").unwrap().is_empty());
        let map = parse_object("attributes_json", r#"{"role":"mentor"}"#).unwrap();
        assert_eq!(map.get("role"), Some(&json!("mentor")));
        assert!(parse_object("attributes_json", "[1,2]").is_err());
        assert!(parse_object("attributes_json", "{").is_err());
    }

    #[test]
    fn importance_must_fit_a_byte() {
        assert_eq!(parse_u8("importance", 7).unwrap(), 7);
        assert!(parse_u8("importance", 300).is_err());
    }
}
