use fabula_core::graph::{ListOptions, NewRelation, Page, RelationChanges};
use fabula_core::store::SortDirection;
use fabula_core::{CoreError, Engine};
use fabula_types::{EntityKind, EntityRelation, RelationId, WorldId};
use tonic::{Request, Response, Status};
use uuid::Uuid;

use super::{RpcResult, reply};
use crate::convert::{parse_enum, parse_id, parse_object, parse_opt_id};
use crate::error::status;
use crate::pb::{self, relation_service_server::RelationService};
use crate::tenant::context;

fn options(raw: Option<pb::ListOptions>) -> Result<ListOptions, Status> {
    let raw = raw.unwrap_or_default();
    let direction = match raw.order.as_str() {
        "" | "asc" => SortDirection::Asc,
        "desc" => SortDirection::Desc,
        other => {
            return Err(status(CoreError::validation(
                "order",
                format!("expected asc or desc, got {other:?}"),
            )));
        }
    };
    Ok(ListOptions {
        relation_type: raw.relation_type,
        exclude_mirrors: raw.exclude_mirrors,
        cursor: raw.cursor,
        direction,
        limit: raw.limit,
    })
}

fn endpoint(entity_type: &str, entity_id: &str) -> Result<(EntityKind, Uuid), Status> {
    Ok((
        parse_enum("entity_type", entity_type)?,
        parse_id("entity_id", entity_id)?,
    ))
}

impl From<Page<EntityRelation>> for pb::RelationPage {
    fn from(page: Page<EntityRelation>) -> Self {
        Self {
            items: page.items.into_iter().map(Into::into).collect(),
            next_cursor: page.next_cursor,
            has_more: page.has_more,
        }
    }
}

/// The entity-relation graph.
#[derive(Debug, Clone)]
pub struct RelationRpc {
    engine: Engine,
}

impl RelationRpc {
    /// Service over `engine`.
    pub const fn new(engine: Engine) -> Self {
        Self { engine }
    }
}

#[tonic::async_trait]
impl RelationService for RelationRpc {
    async fn create_relation(
        &self,
        request: Request<pb::CreateRelationRequest>,
    ) -> RpcResult<pb::CreateRelationResponse> {
        let ctx = context(&request)?;
        let input = request.into_inner();
        let draft = NewRelation {
            world_id: parse_id("world_id", &input.world_id)?,
            source_type: parse_enum("source_type", &input.source_type)?,
            source_id: parse_id("source_id", &input.source_id)?,
            target_type: parse_enum("target_type", &input.target_type)?,
            target_id: parse_id("target_id", &input.target_id)?,
            relation_type: input.relation_type,
            context_type: input.context_type,
            context_id: parse_opt_id("context_id", input.context_id.as_deref())?,
            attributes: parse_object("attributes_json", &input.attributes_json)?,
            summary: input.summary,
            create_mirror: input.create_mirror,
        };
        let created = self.engine.relations.create(&ctx, draft).await.map_err(status)?;
        Ok(Response::new(pb::CreateRelationResponse {
            relation: Some(created.relation.into()),
            mirror: created.mirror.map(Into::into),
        }))
    }

    async fn get_relation(&self, request: Request<pb::IdRequest>) -> RpcResult<pb::Relation> {
        let ctx = context(&request)?;
        let id: RelationId = parse_id("id", &request.get_ref().id)?;
        reply(self.engine.relations.get(&ctx, id).await.map_err(status)?)
    }

    async fn update_relation(
        &self,
        request: Request<pb::UpdateRelationRequest>,
    ) -> RpcResult<pb::Relation> {
        let ctx = context(&request)?;
        let input = request.into_inner();
        let id: RelationId = parse_id("id", &input.id)?;
        let changes = RelationChanges {
            relation_type: input.relation_type,
            attributes: input
                .attributes_json
                .as_deref()
                .map(|raw| parse_object("attributes_json", raw))
                .transpose()?,
            summary: input.summary,
        };
        reply(
            self.engine
                .relations
                .update(&ctx, id, changes)
                .await
                .map_err(status)?,
        )
    }

    async fn delete_relation(&self, request: Request<pb::IdRequest>) -> RpcResult<pb::Empty> {
        let ctx = context(&request)?;
        let id: RelationId = parse_id("id", &request.get_ref().id)?;
        self.engine.relations.delete(&ctx, id).await.map_err(status)?;
        Ok(Response::new(pb::Empty {}))
    }

    async fn list_by_source(
        &self,
        request: Request<pb::ListByEntityRequest>,
    ) -> RpcResult<pb::RelationPage> {
        let ctx = context(&request)?;
        let input = request.into_inner();
        let (kind, id) = endpoint(&input.entity_type, &input.entity_id)?;
        let page = self
            .engine
            .relations
            .list_by_source(&ctx, kind, id, options(input.options)?)
            .await
            .map_err(status)?;
        reply(page)
    }

    async fn list_by_target(
        &self,
        request: Request<pb::ListByEntityRequest>,
    ) -> RpcResult<pb::RelationPage> {
        let ctx = context(&request)?;
        let input = request.into_inner();
        let (kind, id) = endpoint(&input.entity_type, &input.entity_id)?;
        let page = self
            .engine
            .relations
            .list_by_target(&ctx, kind, id, options(input.options)?)
            .await
            .map_err(status)?;
        reply(page)
    }

    async fn list_by_world(
        &self,
        request: Request<pb::ListByWorldRequest>,
    ) -> RpcResult<pb::RelationPage> {
        let ctx = context(&request)?;
        let input = request.into_inner();
        let world: WorldId = parse_id("world_id", &input.world_id)?;
        let page = self
            .engine
            .relations
            .list_by_world(&ctx, world, options(input.options)?)
            .await
            .map_err(status)?;
        reply(page)
    }

    async fn delete_by_entity(
        &self,
        request: Request<pb::EntityRequest>,
    ) -> RpcResult<pb::DeleteCount> {
        let ctx = context(&request)?;
        let input = request.into_inner();
        let (kind, id) = endpoint(&input.entity_type, &input.entity_id)?;
        let deleted = self
            .engine
            .relations
            .delete_by_entity(&ctx, kind, id)
            .await
            .map_err(status)?;
        Ok(Response::new(pb::DeleteCount { deleted }))
    }
}
