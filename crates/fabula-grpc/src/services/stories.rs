use fabula_core::Engine;
use fabula_core::service::story::{CloneStory, NewStory, StoryChanges};
use fabula_types::{Story, StoryId};
use tonic::{Request, Response};

use super::{RpcResult, reply};
use crate::convert::{parse_id, parse_opt_enum, parse_opt_id};
use crate::error::status;
use crate::pb::{self, story_service_server::StoryService};
use crate::tenant::context;

#[allow(clippy::unnecessary_wraps)]
fn list(stories: Vec<Story>) -> RpcResult<pb::StoryList> {
    Ok(Response::new(pb::StoryList {
        stories: stories.into_iter().map(Into::into).collect(),
    }))
}

/// Stories, clones and the version graph.
#[derive(Debug, Clone)]
pub struct StoryRpc {
    engine: Engine,
}

impl StoryRpc {
    /// Service over `engine`.
    pub const fn new(engine: Engine) -> Self {
        Self { engine }
    }
}

#[tonic::async_trait]
impl StoryService for StoryRpc {
    async fn create_story(&self, request: Request<pb::CreateStoryRequest>) -> RpcResult<pb::Story> {
        let ctx = context(&request)?;
        let input = request.into_inner();
        let draft = NewStory {
            title: input.title,
            description: input.description,
            world_id: parse_opt_id("world_id", input.world_id.as_deref())?,
            status: parse_opt_enum("status", input.status.as_deref())?,
        };
        reply(self.engine.stories.create(&ctx, draft).await.map_err(status)?)
    }

    async fn get_story(&self, request: Request<pb::IdRequest>) -> RpcResult<pb::Story> {
        let ctx = context(&request)?;
        let id: StoryId = parse_id("id", &request.get_ref().id)?;
        reply(self.engine.stories.get(&ctx, id).await.map_err(status)?)
    }

    async fn list_stories(&self, request: Request<pb::Empty>) -> RpcResult<pb::StoryList> {
        let ctx = context(&request)?;
        list(self.engine.stories.list(&ctx).await.map_err(status)?)
    }

    async fn update_story(&self, request: Request<pb::UpdateStoryRequest>) -> RpcResult<pb::Story> {
        let ctx = context(&request)?;
        let input = request.into_inner();
        let id: StoryId = parse_id("id", &input.id)?;
        let changes = StoryChanges {
            title: input.title,
            description: input.description,
            status: parse_opt_enum("status", input.status.as_deref())?,
        };
        reply(self.engine.stories.update(&ctx, id, changes).await.map_err(status)?)
    }

    async fn delete_story(&self, request: Request<pb::IdRequest>) -> RpcResult<pb::Empty> {
        let ctx = context(&request)?;
        let id: StoryId = parse_id("id", &request.get_ref().id)?;
        self.engine.stories.delete(&ctx, id).await.map_err(status)?;
        Ok(Response::new(pb::Empty {}))
    }

    async fn clone_story(&self, request: Request<pb::CloneStoryRequest>) -> RpcResult<pb::Story> {
        let ctx = context(&request)?;
        let input = request.into_inner();
        let id: StoryId = parse_id("id", &input.id)?;
        let options = CloneStory {
            title: input.title,
            description: input.description,
        };
        reply(
            self.engine
                .stories
                .clone_story(&ctx, id, options)
                .await
                .map_err(status)?,
        )
    }

    async fn list_versions(&self, request: Request<pb::IdRequest>) -> RpcResult<pb::StoryList> {
        let ctx = context(&request)?;
        let root: StoryId = parse_id("id", &request.get_ref().id)?;
        list(
            self.engine
                .stories
                .list_versions_by_root(&ctx, root)
                .await
                .map_err(status)?,
        )
    }

    async fn get_version_graph(
        &self,
        request: Request<pb::IdRequest>,
    ) -> RpcResult<pb::VersionGraph> {
        let ctx = context(&request)?;
        let id: StoryId = parse_id("id", &request.get_ref().id)?;
        reply(self.engine.stories.version_graph(&ctx, id).await.map_err(status)?)
    }
}
