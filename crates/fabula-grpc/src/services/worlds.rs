use fabula_core::Engine;
use fabula_core::service::world::{NewWorld, WorldChanges};
use fabula_types::WorldId;
use tonic::{Request, Response};

use super::{RpcResult, reply};
use crate::convert::{parse_id, parse_opt_id};
use crate::error::status;
use crate::pb::{self, world_service_server::WorldService};
use crate::tenant::context;

/// World CRUD.
#[derive(Debug, Clone)]
pub struct WorldRpc {
    engine: Engine,
}

impl WorldRpc {
    /// Service over `engine`.
    pub const fn new(engine: Engine) -> Self {
        Self { engine }
    }
}

#[tonic::async_trait]
impl WorldService for WorldRpc {
    async fn create_world(&self, request: Request<pb::CreateWorldRequest>) -> RpcResult<pb::World> {
        let ctx = context(&request)?;
        let input = request.into_inner();
        let draft = NewWorld {
            name: input.name,
            description: input.description,
            genre: input.genre,
            rpg_system_id: parse_opt_id("rpg_system_id", input.rpg_system_id.as_deref())?,
        };
        reply(self.engine.worlds.create(&ctx, draft).await.map_err(status)?)
    }

    async fn get_world(&self, request: Request<pb::IdRequest>) -> RpcResult<pb::World> {
        let ctx = context(&request)?;
        let id: WorldId = parse_id("id", &request.get_ref().id)?;
        reply(self.engine.worlds.get(&ctx, id).await.map_err(status)?)
    }

    async fn list_worlds(&self, request: Request<pb::Empty>) -> RpcResult<pb::WorldList> {
        let ctx = context(&request)?;
        let worlds = self.engine.worlds.list(&ctx).await.map_err(status)?;
        Ok(Response::new(pb::WorldList {
            worlds: worlds.into_iter().map(Into::into).collect(),
        }))
    }

    async fn update_world(&self, request: Request<pb::UpdateWorldRequest>) -> RpcResult<pb::World> {
        let ctx = context(&request)?;
        let input = request.into_inner();
        let id: WorldId = parse_id("id", &input.id)?;
        let changes = WorldChanges {
            name: input.name,
            description: input.description,
            genre: input.genre,
            rpg_system_id: parse_opt_id("rpg_system_id", input.rpg_system_id.as_deref())?,
        };
        reply(self.engine.worlds.update(&ctx, id, changes).await.map_err(status)?)
    }

    async fn delete_world(&self, request: Request<pb::IdRequest>) -> RpcResult<pb::Empty> {
        let ctx = context(&request)?;
        let id: WorldId = parse_id("id", &request.get_ref().id)?;
        self.engine.worlds.delete(&ctx, id).await.map_err(status)?;
        Ok(Response::new(pb::Empty {}))
    }
}
