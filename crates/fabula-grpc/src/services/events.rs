use fabula_core::Engine;
use fabula_core::service::timeline::TimelineRange;
use fabula_core::service::tree::{EventChanges, NewEvent};
use fabula_types::{Event, EventId, WorldId};
use tonic::{Request, Response};

use super::{RpcResult, reply};
use crate::convert::{parse_id, parse_opt_id, parse_u8};
use crate::error::status;
use crate::pb::{self, event_service_server::EventService};
use crate::tenant::context;

#[allow(clippy::unnecessary_wraps)]
fn list(events: Vec<Event>) -> RpcResult<pb::EventList> {
    Ok(Response::new(pb::EventList {
        events: events.into_iter().map(Into::into).collect(),
    }))
}

/// Event causality tree, epoch and timeline.
#[derive(Debug, Clone)]
pub struct EventRpc {
    engine: Engine,
}

impl EventRpc {
    /// Service over `engine`.
    pub const fn new(engine: Engine) -> Self {
        Self { engine }
    }
}

#[tonic::async_trait]
impl EventService for EventRpc {
    async fn create_event(&self, request: Request<pb::CreateEventRequest>) -> RpcResult<pb::Event> {
        let ctx = context(&request)?;
        let input = request.into_inner();
        let draft = NewEvent {
            world_id: parse_id("world_id", &input.world_id)?,
            parent_id: parse_opt_id("parent_id", input.parent_id.as_deref())?,
            name: input.name,
            kind: input.r#type,
            description: input.description,
            timeline: input.timeline,
            importance: input
                .importance
                .map(|raw| parse_u8("importance", raw))
                .transpose()?,
            timeline_position: input.timeline_position,
            is_epoch: input.is_epoch,
        };
        reply(self.engine.events.create(&ctx, draft).await.map_err(status)?)
    }

    async fn get_event(&self, request: Request<pb::IdRequest>) -> RpcResult<pb::Event> {
        let ctx = context(&request)?;
        let id: EventId = parse_id("id", &request.get_ref().id)?;
        reply(self.engine.events.get(&ctx, id).await.map_err(status)?)
    }

    async fn list_events(&self, request: Request<pb::WorldRequest>) -> RpcResult<pb::EventList> {
        let ctx = context(&request)?;
        let world: WorldId = parse_id("world_id", &request.get_ref().world_id)?;
        list(
            self.engine
                .events
                .list_by_world(&ctx, world)
                .await
                .map_err(status)?,
        )
    }

    async fn update_event(&self, request: Request<pb::UpdateEventRequest>) -> RpcResult<pb::Event> {
        let ctx = context(&request)?;
        let input = request.into_inner();
        let id: EventId = parse_id("id", &input.id)?;
        let changes = EventChanges {
            name: input.name,
            kind: input.r#type,
            description: input.description,
            timeline: input.timeline,
            importance: input
                .importance
                .map(|raw| parse_u8("importance", raw))
                .transpose()?,
            timeline_position: input.timeline_position,
        };
        reply(self.engine.events.update(&ctx, id, changes).await.map_err(status)?)
    }

    async fn move_event(&self, request: Request<pb::MoveRequest>) -> RpcResult<pb::Event> {
        let ctx = context(&request)?;
        let input = request.into_inner();
        let id: EventId = parse_id("id", &input.id)?;
        let parent = parse_opt_id("parent_id", input.parent_id.as_deref())?;
        reply(self.engine.events.move_to(&ctx, id, parent).await.map_err(status)?)
    }

    async fn delete_event(&self, request: Request<pb::IdRequest>) -> RpcResult<pb::Empty> {
        let ctx = context(&request)?;
        let id: EventId = parse_id("id", &request.get_ref().id)?;
        self.engine.events.delete(&ctx, id).await.map_err(status)?;
        Ok(Response::new(pb::Empty {}))
    }

    async fn list_children(&self, request: Request<pb::IdRequest>) -> RpcResult<pb::EventList> {
        let ctx = context(&request)?;
        let id: EventId = parse_id("id", &request.get_ref().id)?;
        list(self.engine.events.children(&ctx, id).await.map_err(status)?)
    }

    async fn list_ancestors(&self, request: Request<pb::IdRequest>) -> RpcResult<pb::EventList> {
        let ctx = context(&request)?;
        let id: EventId = parse_id("id", &request.get_ref().id)?;
        list(self.engine.events.ancestors(&ctx, id).await.map_err(status)?)
    }

    async fn list_descendants(&self, request: Request<pb::IdRequest>) -> RpcResult<pb::EventList> {
        let ctx = context(&request)?;
        let id: EventId = parse_id("id", &request.get_ref().id)?;
        list(self.engine.events.descendants(&ctx, id).await.map_err(status)?)
    }

    async fn set_epoch(&self, request: Request<pb::IdRequest>) -> RpcResult<pb::Event> {
        let ctx = context(&request)?;
        let id: EventId = parse_id("id", &request.get_ref().id)?;
        reply(self.engine.events.set_epoch(&ctx, id).await.map_err(status)?)
    }

    async fn get_epoch(&self, request: Request<pb::WorldRequest>) -> RpcResult<pb::Event> {
        let ctx = context(&request)?;
        let world: WorldId = parse_id("world_id", &request.get_ref().world_id)?;
        reply(self.engine.events.get_epoch(&ctx, world).await.map_err(status)?)
    }

    async fn get_timeline(
        &self,
        request: Request<pb::TimelineRequest>,
    ) -> RpcResult<pb::EventList> {
        let ctx = context(&request)?;
        let input = request.into_inner();
        let world: WorldId = parse_id("world_id", &input.world_id)?;
        let range = TimelineRange {
            from: input.from,
            to: input.to,
        };
        list(
            self.engine
                .events
                .timeline(&ctx, world, range)
                .await
                .map_err(status)?,
        )
    }
}
