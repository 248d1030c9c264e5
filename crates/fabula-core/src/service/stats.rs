//! Versioned RPG stats.
//!
//! Each character and artifact owns an append-only chain of stats
//! versions numbered `1..=n`, with exactly one active version once the
//! chain is non-empty. Every write that touches the active flag runs at
//! serializable isolation over the subject's chain, so two writers can
//! never allocate the same version number or leave two versions active.
//!
//! The payload is checked against the RPG system of the subject's world.
//! Checking is structural: `base_stats` must be an object, and when the
//! system's `base_stats_schema` lists `attributes`, only those keys are
//! accepted.

use core::fmt::{Debug, Display};
use core::marker::PhantomData;
use core::time::Duration;

use fabula_types::{
    Artifact, ArtifactId, AuditAction, Character, CharacterId, EntityKind, Event, EventId,
    RpgSystem, StatsVersion, StatsVersionId, WorldId,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use super::world::world_system;
use super::{Deps, json_object, optional};
use crate::clock;
use crate::error::CoreError;
use crate::store::{Filter, Isolation, Record, Table, Tx};
use crate::tenant::TenantContext;

/// Extra attempts `create_version` makes after a transient conflict.
pub const CREATE_RETRIES: u32 = 3;

/// Pause before the first retry; later retries wait proportionally longer.
const RETRY_BACKOFF: Duration = Duration::from_millis(20);

/// An entity that owns a stats chain.
pub trait StatsSubject: Record + Debug {
    /// Typed identifier of the subject.
    type Id: Copy + Into<Uuid> + Display + Send + Sync;

    /// Kind recorded on each version.
    const KIND: EntityKind;
    /// Table holding the chains of this kind.
    const STATS_TABLE: Table;
    /// Kind used for audit entries about the chain.
    const STATS_KIND: EntityKind;

    /// World whose RPG system validates the payload.
    fn world_id(&self) -> WorldId;
}

impl StatsSubject for Character {
    type Id = CharacterId;

    const KIND: EntityKind = EntityKind::Character;
    const STATS_TABLE: Table = Table::CharacterStats;
    const STATS_KIND: EntityKind = EntityKind::CharacterStats;

    fn world_id(&self) -> WorldId {
        self.world_id
    }
}

impl StatsSubject for Artifact {
    type Id = ArtifactId;

    const KIND: EntityKind = EntityKind::Artifact;
    const STATS_TABLE: Table = Table::ArtifactStats;
    const STATS_KIND: EntityKind = EntityKind::ArtifactStats;

    fn world_id(&self) -> WorldId {
        self.world_id
    }
}

/// Input of [`StatsService::create_version`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewStatsVersion {
    /// Base stats object.
    pub base_stats: Value,
    /// Derived stats object.
    pub derived_stats: Option<Value>,
    /// Progression object.
    pub progression: Option<Value>,
    /// Event that caused the change.
    pub event_id: Option<EventId>,
    /// Why the stats changed.
    pub reason: Option<String>,
    /// Free-form timeline tag.
    pub timeline: Option<String>,
    /// Make the new version the only active one. Otherwise it is active
    /// only when the chain has no active version yet.
    pub deactivate_previous: bool,
}

/// Keys a schema recognises, when it lists them under `attributes`.
///
/// Entries may be plain strings or objects carrying a `name`.
fn schema_attributes(schema: &Value) -> Option<Vec<&str>> {
    let list = schema.get("attributes")?.as_array()?;
    Some(
        list.iter()
            .filter_map(|entry| {
                entry
                    .as_str()
                    .or_else(|| entry.get("name").and_then(Value::as_str))
            })
            .collect(),
    )
}

fn check_payload(input: &NewStatsVersion, system: Option<&RpgSystem>) -> Result<(), CoreError> {
    json_object("base_stats", &input.base_stats)?;
    if let Some(derived) = &input.derived_stats {
        json_object("derived_stats", derived)?;
    }
    if let Some(progression) = &input.progression {
        json_object("progression", progression)?;
    }

    let Some(known) = system.and_then(|s| schema_attributes(&s.base_stats_schema)) else {
        return Ok(());
    };
    let unknown = input
        .base_stats
        .as_object()
        .and_then(|map| map.keys().find(|k| !known.contains(&k.as_str())));
    match unknown {
        Some(key) => Err(CoreError::validation(
            "base_stats",
            format!("unknown attribute {key:?}"),
        )),
        None => Ok(()),
    }
}

/// Stats chains of one subject kind.
#[derive(Debug, Clone)]
pub struct StatsService<S> {
    deps: Deps,
    subject: PhantomData<fn() -> S>,
}

/// Character stats chains.
pub type CharacterStatsService = StatsService<Character>;
/// Artifact stats chains.
pub type ArtifactStatsService = StatsService<Artifact>;

async fn chain<S: StatsSubject>(
    tx: &mut Tx,
    subject: Uuid,
) -> Result<Vec<StatsVersion>, CoreError> {
    let tenant = tx.tenant();
    tx.list_in(S::STATS_TABLE, tenant, Filter::scope(subject))
        .await
}

impl<S: StatsSubject> StatsService<S> {
    /// Create the service.
    pub const fn new(deps: Deps) -> Self {
        Self {
            deps,
            subject: PhantomData,
        }
    }

    /// Append a version to the subject's chain.
    ///
    /// Serialization conflicts are retried [`CREATE_RETRIES`] times.
    ///
    /// # Errors
    ///
    /// `Transient` when every attempt conflicted, `Validation` when the
    /// payload does not fit the world's RPG system.
    pub async fn create_version(
        &self,
        ctx: &TenantContext,
        subject: S::Id,
        input: NewStatsVersion,
    ) -> Result<StatsVersion, CoreError> {
        let mut attempt: u32 = 0;
        loop {
            match self.try_create(ctx, subject, &input).await {
                Err(err) if err.is_transient() && attempt < CREATE_RETRIES => {
                    attempt = attempt.saturating_add(1);
                    warn!(
                        tenant_id = %ctx.tenant_id,
                        subject_id = %subject,
                        attempt,
                        error = %err,
                        "Stats version conflict, retrying"
                    );
                    tokio::time::sleep(RETRY_BACKOFF.saturating_mul(attempt)).await;
                }
                other => return other,
            }
        }
    }

    async fn try_create(
        &self,
        ctx: &TenantContext,
        subject: S::Id,
        input: &NewStatsVersion,
    ) -> Result<StatsVersion, CoreError> {
        let mut tx = self.deps.begin(ctx, Isolation::Serializable).await?;
        let owner: S = tx.fetch(subject).await?;
        if let Some(event) = input.event_id {
            tx.fetch::<Event>(event).await?;
        }
        let system = world_system(&mut tx, owner.world_id()).await?;
        check_payload(input, system.as_ref())?;

        let subject_id: Uuid = subject.into();
        let versions = chain::<S>(&mut tx, subject_id).await?;
        let version = versions
            .iter()
            .map(|v| v.version)
            .max()
            .unwrap_or(0)
            .checked_add(1)
            .ok_or_else(|| CoreError::Internal("stats version overflow".into()))?;

        let now = clock::now();
        let is_active = if input.deactivate_previous {
            for mut previous in versions.into_iter().filter(|v| v.is_active) {
                previous.is_active = false;
                previous.updated_at = now;
                tx.update_in(S::STATS_TABLE, &previous).await?;
            }
            true
        } else {
            !versions.iter().any(|v| v.is_active)
        };

        let row = StatsVersion {
            id: StatsVersionId::new(),
            tenant_id: ctx.tenant_id,
            subject_type: S::KIND,
            subject_id,
            event_id: input.event_id,
            base_stats: input.base_stats.clone(),
            derived_stats: input.derived_stats.clone(),
            progression: input.progression.clone(),
            is_active,
            version,
            reason: optional(input.reason.clone()),
            timeline: optional(input.timeline.clone()),
            created_at: now,
            updated_at: now,
        };
        tx.insert_in(S::STATS_TABLE, &row).await?;
        tx.commit().await?;

        info!(
            tenant_id = %ctx.tenant_id,
            subject_type = %S::KIND,
            subject_id = %subject_id,
            version,
            is_active,
            "Stats version created"
        );
        self.deps
            .side
            .audit(ctx, AuditAction::Create, S::STATS_KIND, row.id)
            .await;
        self.deps.side.ingest(ctx, S::STATS_KIND.as_str(), row.id).await;
        Ok(row)
    }

    /// The active version of the subject.
    ///
    /// # Errors
    ///
    /// `NotFound` when the chain is empty.
    pub async fn get_active(
        &self,
        ctx: &TenantContext,
        subject: S::Id,
    ) -> Result<StatsVersion, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        tx.fetch::<S>(subject).await?;
        chain::<S>(&mut tx, subject.into())
            .await?
            .into_iter()
            .find(|v| v.is_active)
            .ok_or_else(|| CoreError::not_found("rpg stats", subject))
    }

    /// Every version of the subject, newest first.
    pub async fn list_history(
        &self,
        ctx: &TenantContext,
        subject: S::Id,
    ) -> Result<Vec<StatsVersion>, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        tx.fetch::<S>(subject).await?;
        let mut versions = chain::<S>(&mut tx, subject.into()).await?;
        versions.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(versions)
    }

    /// Make `id` the active version of its chain. Used for rollback.
    pub async fn activate_version(
        &self,
        ctx: &TenantContext,
        id: StatsVersionId,
    ) -> Result<StatsVersion, CoreError> {
        let mut tx = self.deps.begin(ctx, Isolation::Serializable).await?;
        let tenant = tx.tenant();
        let mut target: StatsVersion = tx
            .find_in(S::STATS_TABLE, tenant, id.into_inner())
            .await?
            .ok_or_else(|| CoreError::not_found("rpg stats", id))?;

        let now = clock::now();
        for mut other in chain::<S>(&mut tx, target.subject_id).await? {
            if other.is_active && other.id != id {
                other.is_active = false;
                other.updated_at = now;
                tx.update_in(S::STATS_TABLE, &other).await?;
            }
        }
        target.is_active = true;
        target.updated_at = now;
        tx.update_in(S::STATS_TABLE, &target).await?;
        tx.commit().await?;

        info!(
            tenant_id = %ctx.tenant_id,
            subject_id = %target.subject_id,
            version = target.version,
            "Stats version activated"
        );
        self.deps
            .side
            .audit(ctx, AuditAction::Activate, S::STATS_KIND, id)
            .await;
        Ok(target)
    }

    /// Drop the subject's whole chain. Returns how many versions went.
    pub async fn delete_all(&self, ctx: &TenantContext, subject: S::Id) -> Result<u64, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        tx.fetch::<S>(subject).await?;
        let removed = tx
            .delete_where(S::STATS_TABLE, Filter::scope(subject.into()))
            .await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Delete, S::STATS_KIND, subject)
            .await;
        Ok(removed)
    }

    /// Stats rows of every subject, characters first, attributed to `event`.
    pub async fn list_by_event(
        &self,
        ctx: &TenantContext,
        event: EventId,
    ) -> Result<Vec<StatsVersion>, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        tx.fetch::<Event>(event).await?;
        let tenant = tx.tenant();
        let mut rows = Vec::new();
        for table in [Table::CharacterStats, Table::ArtifactStats] {
            let caused: Vec<StatsVersion> = tx
                .list_in(table, tenant, Filter::referencing(event.into_inner()))
                .await?;
            rows.extend(caused);
        }
        Ok(rows)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::service::artifact::{ArtifactService, NewArtifact};
    use crate::service::character::{CharacterService, NewCharacter};
    use crate::service::rpg::{NewRpgSystem, RpgSystemService};
    use crate::service::tenant::{NewTenant, TenantService};
    use crate::service::tree::{EventService, NewEvent};
    use crate::service::world::{NewWorld, WorldService};
    use crate::side_channel::SideChannels;
    use crate::store::MemoryStore;

    struct Fixture {
        deps: Deps,
        ctx: TenantContext,
        world: WorldId,
        hero: CharacterId,
    }

    async fn fixture(schema: Value) -> Fixture {
        let deps = Deps::new(Arc::new(MemoryStore::new()), Arc::new(SideChannels::noop()));
        let tenant = TenantService::new(deps.clone())
            .create(NewTenant { name: "Acme".into() })
            .await
            .unwrap();
        let ctx = TenantContext::new(tenant.id);
        let system = RpgSystemService::new(deps.clone())
            .create(
                &ctx,
                NewRpgSystem {
                    name: "Homebrew".into(),
                    description: None,
                    base_stats_schema: schema,
                    derived_stats_schema: None,
                    progression_schema: None,
                },
            )
            .await
            .unwrap();
        let world = WorldService::new(deps.clone())
            .create(
                &ctx,
                NewWorld {
                    name: "Erde".into(),
                    rpg_system_id: Some(system.id),
                    ..NewWorld::default()
                },
            )
            .await
            .unwrap();
        let hero = CharacterService::new(deps.clone())
            .create(
                &ctx,
                NewCharacter {
                    world_id: world.id,
                    name: "Ada".into(),
                    description: None,
                    archetype_id: None,
                },
            )
            .await
            .unwrap();
        Fixture {
            deps,
            ctx,
            world: world.id,
            hero: hero.id,
        }
    }

    fn payload(stats: Value, deactivate_previous: bool) -> NewStatsVersion {
        NewStatsVersion {
            base_stats: stats,
            deactivate_previous,
            ..NewStatsVersion::default()
        }
    }

    #[test]
    fn attributes_accept_strings_and_named_objects() {
        let schema = json!({ "attributes": ["hp", { "name": "mp", "type": "int" }] });
        assert_eq!(schema_attributes(&schema).unwrap(), vec!["hp", "mp"]);
        assert!(schema_attributes(&json!({ "type": "object" })).is_none());
    }

    #[tokio::test]
    async fn second_version_stays_inactive_unless_asked() {
        let f = fixture(json!({})).await;
        let stats = CharacterStatsService::new(f.deps.clone());
        let v1 = stats
            .create_version(&f.ctx, f.hero, payload(json!({ "hp": 10 }), false))
            .await
            .unwrap();
        assert!(v1.is_active);
        let v2 = stats
            .create_version(&f.ctx, f.hero, payload(json!({ "hp": 9 }), false))
            .await
            .unwrap();
        assert_eq!(v2.version, 2);
        assert!(!v2.is_active);
        assert_eq!(stats.get_active(&f.ctx, f.hero).await.unwrap().id, v1.id);
    }

    #[tokio::test]
    async fn unknown_attributes_are_rejected() {
        let f = fixture(json!({ "attributes": ["hp"] })).await;
        let stats = CharacterStatsService::new(f.deps.clone());
        let err = stats
            .create_version(&f.ctx, f.hero, payload(json!({ "charisma": 3 }), true))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation { field: "base_stats", .. }));

        let err = stats
            .create_version(&f.ctx, f.hero, payload(json!([1, 2]), true))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation { field: "base_stats", .. }));
    }

    #[tokio::test]
    async fn list_by_event_spans_characters_and_artifacts() {
        let f = fixture(json!({})).await;
        let sword = ArtifactService::new(f.deps.clone())
            .create(
                &f.ctx,
                NewArtifact {
                    world_id: f.world,
                    name: "Sword".into(),
                    description: None,
                    rarity: None,
                },
            )
            .await
            .unwrap();
        let battle = EventService::new(f.deps.clone())
            .create(
                &f.ctx,
                NewEvent {
                    world_id: f.world,
                    parent_id: None,
                    name: "Battle".into(),
                    kind: None,
                    description: None,
                    timeline: None,
                    importance: None,
                    timeline_position: Some(1.0),
                    is_epoch: false,
                },
            )
            .await
            .unwrap();

        let caused = |stats: Value| NewStatsVersion {
            base_stats: stats,
            event_id: Some(battle.id),
            reason: Some("battle damage".into()),
            deactivate_previous: true,
            ..NewStatsVersion::default()
        };
        CharacterStatsService::new(f.deps.clone())
            .create_version(&f.ctx, f.hero, caused(json!({ "hp": 4 })))
            .await
            .unwrap();
        let artifacts = ArtifactStatsService::new(f.deps.clone());
        let chipped = artifacts
            .create_version(&f.ctx, sword.id, caused(json!({ "durability": 70 })))
            .await
            .unwrap();
        assert_eq!(chipped.subject_type, EntityKind::Artifact);

        let rows = artifacts.list_by_event(&f.ctx, battle.id).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows.first().unwrap().subject_type, EntityKind::Character);
    }
}
