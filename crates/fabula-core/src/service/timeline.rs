//! Event epoch and timeline queries.
//!
//! The epoch is the time-zero event of a world. At most one event per world
//! carries `is_epoch`; switching the epoch clears the previous one in the
//! same serializable transaction.

use chrono::{DateTime, Utc};
use fabula_types::{AuditAction, EntityKind, Event, EventId, World, WorldId};
use tracing::info;

use super::tree::EventService;
use crate::clock;
use crate::error::CoreError;
use crate::store::{Filter, Isolation, Tx};
use crate::tenant::TenantContext;

/// Timeline position given to the epoch.
pub const EPOCH_POSITION: f64 = 0.0;

/// Half-open `[from, to)` window over timeline positions.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimelineRange {
    /// Inclusive lower bound.
    pub from: Option<f64>,
    /// Exclusive upper bound.
    pub to: Option<f64>,
}

impl TimelineRange {
    const fn is_bounded(&self) -> bool {
        self.from.is_some() || self.to.is_some()
    }

    fn contains(&self, position: Option<f64>) -> bool {
        if !self.is_bounded() {
            return true;
        }
        let Some(position) = position else {
            return false;
        };
        self.from.is_none_or(|from| position >= from) && self.to.is_none_or(|to| position < to)
    }
}

/// Clear `is_epoch` on every event of `world` except `keep`.
pub(super) async fn clear_epoch(
    tx: &mut Tx,
    world: WorldId,
    keep: EventId,
    now: DateTime<Utc>,
) -> Result<(), CoreError> {
    let world_events: Vec<Event> = tx.list(Filter::scope(world.into_inner())).await?;
    for mut previous in world_events {
        if previous.is_epoch && previous.id != keep {
            previous.is_epoch = false;
            previous.updated_at = now;
            tx.update(&previous).await?;
        }
    }
    Ok(())
}

impl EventService {
    /// Make `id` the epoch of its world, clearing any previous epoch.
    pub async fn set_epoch(&self, ctx: &TenantContext, id: EventId) -> Result<Event, CoreError> {
        let mut tx = self.deps.begin(ctx, Isolation::Serializable).await?;
        let mut event: Event = tx.fetch(id).await?;
        let now = clock::now();

        clear_epoch(&mut tx, event.world_id, id, now).await?;
        event.is_epoch = true;
        event.timeline_position = Some(EPOCH_POSITION);
        event.updated_at = now;
        tx.update(&event).await?;
        tx.commit().await?;

        info!(tenant_id = %ctx.tenant_id, world_id = %event.world_id, event_id = %id, "Epoch set");
        self.deps
            .side
            .audit(ctx, AuditAction::Update, EntityKind::Event, id)
            .await;
        self.deps.side.ingest(ctx, "event", id).await;
        Ok(event)
    }

    /// The epoch event of `world`.
    ///
    /// # Errors
    ///
    /// `NotFound` with resource `epoch` when the world has none.
    pub async fn get_epoch(&self, ctx: &TenantContext, world: WorldId) -> Result<Event, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        tx.fetch::<World>(world).await?;
        tx.list::<Event>(Filter::scope(world.into_inner()))
            .await?
            .into_iter()
            .find(|e| e.is_epoch)
            .ok_or_else(|| CoreError::not_found("epoch", world))
    }

    /// Events of `world` ordered by timeline position.
    ///
    /// Without bounds, events with no position follow the positioned ones
    /// in creation order. With any bound, they are left out.
    pub async fn timeline(
        &self,
        ctx: &TenantContext,
        world: WorldId,
        range: TimelineRange,
    ) -> Result<Vec<Event>, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        tx.fetch::<World>(world).await?;
        let events: Vec<Event> = tx.list(Filter::scope(world.into_inner())).await?;
        Ok(events
            .into_iter()
            .filter(|e| range.contains(e.timeline_position))
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::service::Deps;
    use crate::service::tenant::{NewTenant, TenantService};
    use crate::service::tree::NewEvent;
    use crate::service::world::{NewWorld, WorldService};
    use crate::side_channel::SideChannels;
    use crate::store::MemoryStore;

    fn draft(world: WorldId, name: &str, position: Option<f64>) -> NewEvent {
        NewEvent {
            world_id: world,
            parent_id: None,
            name: name.into(),
            kind: None,
            description: None,
            timeline: None,
            importance: None,
            timeline_position: position,
            is_epoch: false,
        }
    }

    async fn setup() -> (EventService, TenantContext, WorldId) {
        let deps = Deps::new(Arc::new(MemoryStore::new()), Arc::new(SideChannels::noop()));
        let tenant = TenantService::new(deps.clone())
            .create(NewTenant { name: "Acme".into() })
            .await
            .unwrap();
        let ctx = TenantContext::new(tenant.id);
        let world = WorldService::new(deps.clone())
            .create(
                &ctx,
                NewWorld {
                    name: "Erde".into(),
                    ..NewWorld::default()
                },
            )
            .await
            .unwrap();
        (EventService::new(deps), ctx, world.id)
    }

    #[test]
    fn unbounded_range_keeps_unpositioned_events() {
        let all = TimelineRange::default();
        assert!(all.contains(None));
        let bounded = TimelineRange {
            from: Some(1.0),
            to: Some(2.0),
        };
        assert!(!bounded.contains(None));
        assert!(bounded.contains(Some(1.0)));
        assert!(!bounded.contains(Some(2.0)));
    }

    #[tokio::test]
    async fn timeline_orders_by_position_with_nulls_last() {
        let (events, ctx, world) = setup().await;
        let later = events.create(&ctx, draft(world, "Later", Some(20.0))).await.unwrap();
        let unplaced = events.create(&ctx, draft(world, "Someday", None)).await.unwrap();
        let early = events.create(&ctx, draft(world, "Early", Some(-5.0))).await.unwrap();

        let names: Vec<_> = events
            .timeline(&ctx, world, TimelineRange::default())
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(names, vec![early.id, later.id, unplaced.id]);

        let window = events
            .timeline(
                &ctx,
                world,
                TimelineRange {
                    from: Some(0.0),
                    to: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(window.len(), 1);
    }

    #[tokio::test]
    async fn creating_an_epoch_replaces_the_previous_one() {
        let (events, ctx, world) = setup().await;
        let first = events.create(&ctx, draft(world, "Founding", Some(3.0))).await.unwrap();
        events.set_epoch(&ctx, first.id).await.unwrap();

        let second = events
            .create(
                &ctx,
                NewEvent {
                    is_epoch: true,
                    ..draft(world, "Cataclysm", Some(42.0))
                },
            )
            .await
            .unwrap();
        assert!(second.is_epoch);
        assert_eq!(second.timeline_position, Some(EPOCH_POSITION));

        assert_eq!(events.get_epoch(&ctx, world).await.unwrap().id, second.id);
        assert!(!events.get(&ctx, first.id).await.unwrap().is_epoch);
    }

    #[tokio::test]
    async fn epoch_without_events_is_not_found() {
        let (events, ctx, world) = setup().await;
        let err = events.get_epoch(&ctx, world).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound { resource: "epoch", .. }));
    }
}
