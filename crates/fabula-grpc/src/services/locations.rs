use fabula_core::Engine;
use fabula_core::service::tree::{LocationChanges, NewLocation};
use fabula_types::{Location, LocationId, WorldId};
use tonic::{Request, Response};

use super::{RpcResult, reply};
use crate::convert::{parse_id, parse_opt_id};
use crate::error::status;
use crate::pb::{self, location_service_server::LocationService};
use crate::tenant::context;

#[allow(clippy::unnecessary_wraps)]
fn list(locations: Vec<Location>) -> RpcResult<pb::LocationList> {
    Ok(Response::new(pb::LocationList {
        locations: locations.into_iter().map(Into::into).collect(),
    }))
}

/// Location hierarchy.
#[derive(Debug, Clone)]
pub struct LocationRpc {
    engine: Engine,
}

impl LocationRpc {
    /// Service over `engine`.
    pub const fn new(engine: Engine) -> Self {
        Self { engine }
    }
}

#[tonic::async_trait]
impl LocationService for LocationRpc {
    async fn create_location(
        &self,
        request: Request<pb::CreateLocationRequest>,
    ) -> RpcResult<pb::Location> {
        let ctx = context(&request)?;
        let input = request.into_inner();
        let draft = NewLocation {
            world_id: parse_id("world_id", &input.world_id)?,
            parent_id: parse_opt_id("parent_id", input.parent_id.as_deref())?,
            name: input.name,
            kind: input.r#type,
            description: input.description,
        };
        reply(self.engine.locations.create(&ctx, draft).await.map_err(status)?)
    }

    async fn get_location(&self, request: Request<pb::IdRequest>) -> RpcResult<pb::Location> {
        let ctx = context(&request)?;
        let id: LocationId = parse_id("id", &request.get_ref().id)?;
        reply(self.engine.locations.get(&ctx, id).await.map_err(status)?)
    }

    async fn list_locations(
        &self,
        request: Request<pb::WorldRequest>,
    ) -> RpcResult<pb::LocationList> {
        let ctx = context(&request)?;
        let world: WorldId = parse_id("world_id", &request.get_ref().world_id)?;
        list(
            self.engine
                .locations
                .list_by_world(&ctx, world)
                .await
                .map_err(status)?,
        )
    }

    async fn update_location(
        &self,
        request: Request<pb::UpdateLocationRequest>,
    ) -> RpcResult<pb::Location> {
        let ctx = context(&request)?;
        let input = request.into_inner();
        let id: LocationId = parse_id("id", &input.id)?;
        let changes = LocationChanges {
            name: input.name,
            kind: input.r#type,
            description: input.description,
        };
        reply(
            self.engine
                .locations
                .update(&ctx, id, changes)
                .await
                .map_err(status)?,
        )
    }

    async fn move_location(&self, request: Request<pb::MoveRequest>) -> RpcResult<pb::Location> {
        let ctx = context(&request)?;
        let input = request.into_inner();
        let id: LocationId = parse_id("id", &input.id)?;
        let parent = parse_opt_id("parent_id", input.parent_id.as_deref())?;
        reply(
            self.engine
                .locations
                .move_to(&ctx, id, parent)
                .await
                .map_err(status)?,
        )
    }

    async fn delete_location(&self, request: Request<pb::IdRequest>) -> RpcResult<pb::Empty> {
        let ctx = context(&request)?;
        let id: LocationId = parse_id("id", &request.get_ref().id)?;
        self.engine.locations.delete(&ctx, id).await.map_err(status)?;
        Ok(Response::new(pb::Empty {}))
    }

    async fn list_children(&self, request: Request<pb::IdRequest>) -> RpcResult<pb::LocationList> {
        let ctx = context(&request)?;
        let id: LocationId = parse_id("id", &request.get_ref().id)?;
        list(self.engine.locations.children(&ctx, id).await.map_err(status)?)
    }

    async fn list_ancestors(
        &self,
        request: Request<pb::IdRequest>,
    ) -> RpcResult<pb::LocationList> {
        let ctx = context(&request)?;
        let id: LocationId = parse_id("id", &request.get_ref().id)?;
        list(self.engine.locations.ancestors(&ctx, id).await.map_err(status)?)
    }

    async fn list_descendants(
        &self,
        request: Request<pb::IdRequest>,
    ) -> RpcResult<pb::LocationList> {
        let ctx = context(&request)?;
        let id: LocationId = parse_id("id", &request.get_ref().id)?;
        list(self.engine.locations.descendants(&ctx, id).await.map_err(status)?)
    }
}
