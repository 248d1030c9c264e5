//! The relation graph as a use-case service.

use fabula_types::{AuditAction, EntityKind, EntityRelation, RelationId, World, WorldId};
use uuid::Uuid;

use super::{Deps, require_tenant};
use crate::error::CoreError;
use crate::graph::{self, CreatedRelation, ListOptions, NewRelation, Page, RelationChanges};
use crate::store::{Isolation, RelationEndpoint};
use crate::tenant::TenantContext;

/// Relation use cases.
#[derive(Debug, Clone)]
pub struct RelationService {
    deps: Deps,
}

impl RelationService {
    /// Create the service.
    pub const fn new(deps: Deps) -> Self {
        Self { deps }
    }

    /// Create an edge, and its mirror when `input.create_mirror` is set.
    /// Both rows commit together.
    pub async fn create(
        &self,
        ctx: &TenantContext,
        input: NewRelation,
    ) -> Result<CreatedRelation, CoreError> {
        let mut tx = self.deps.begin(ctx, Isolation::Serializable).await?;
        require_tenant(&mut tx).await?;
        let created = graph::create(&mut tx, input, ctx.actor).await?;
        tx.commit().await?;

        let id = created.relation.id;
        self.deps
            .side
            .audit(ctx, AuditAction::Create, EntityKind::Relation, id)
            .await;
        self.deps.side.ingest(ctx, "relation", id).await;
        Ok(created)
    }

    /// Load an edge.
    pub async fn get(
        &self,
        ctx: &TenantContext,
        id: RelationId,
    ) -> Result<EntityRelation, CoreError> {
        self.deps.open(ctx).await?.fetch_relation(id).await
    }

    /// Page through edges leaving `(kind, id)`.
    pub async fn list_by_source(
        &self,
        ctx: &TenantContext,
        kind: EntityKind,
        id: Uuid,
        options: ListOptions,
    ) -> Result<Page<EntityRelation>, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        graph::list(&mut tx, RelationEndpoint::Source(kind, id), options).await
    }

    /// Page through edges arriving at `(kind, id)`.
    pub async fn list_by_target(
        &self,
        ctx: &TenantContext,
        kind: EntityKind,
        id: Uuid,
        options: ListOptions,
    ) -> Result<Page<EntityRelation>, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        graph::list(&mut tx, RelationEndpoint::Target(kind, id), options).await
    }

    /// Page through every edge of a world.
    pub async fn list_by_world(
        &self,
        ctx: &TenantContext,
        world: WorldId,
        options: ListOptions,
    ) -> Result<Page<EntityRelation>, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        tx.fetch::<World>(world).await?;
        graph::list(&mut tx, RelationEndpoint::World(world), options).await
    }

    /// Relabel an edge or replace its attributes or summary. The mirror is
    /// left as it is.
    pub async fn update(
        &self,
        ctx: &TenantContext,
        id: RelationId,
        changes: RelationChanges,
    ) -> Result<EntityRelation, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        let relation = graph::update(&mut tx, id, changes).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Update, EntityKind::Relation, id)
            .await;
        self.deps.side.ingest(ctx, "relation", id).await;
        Ok(relation)
    }

    /// Delete an edge together with its mirror.
    pub async fn delete(&self, ctx: &TenantContext, id: RelationId) -> Result<(), CoreError> {
        let mut tx = self.deps.begin(ctx, Isolation::Serializable).await?;
        graph::delete(&mut tx, id).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Delete, EntityKind::Relation, id)
            .await;
        Ok(())
    }

    /// Delete every edge touching `(kind, id)`. Returns how many rows went.
    pub async fn delete_by_entity(
        &self,
        ctx: &TenantContext,
        kind: EntityKind,
        id: Uuid,
    ) -> Result<u64, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        let removed = graph::delete_by_entity(&mut tx, kind, id).await?;
        tx.commit().await?;
        Ok(removed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use super::*;
    use crate::service::artifact::{ArtifactService, NewArtifact};
    use crate::service::character::{CharacterService, NewCharacter};
    use crate::service::tenant::{NewTenant, TenantService};
    use crate::service::world::{NewWorld, WorldService};
    use crate::side_channel::SideChannels;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn deleting_one_side_removes_the_mirror() {
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
        let ada = CharacterService::new(deps.clone())
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
        let sword = ArtifactService::new(deps.clone())
            .create(
                &ctx,
                NewArtifact {
                    world_id: world.id,
                    name: "Sword".into(),
                    description: None,
                    rarity: None,
                },
            )
            .await
            .unwrap();

        let relations = RelationService::new(deps);
        let created = relations
            .create(
                &ctx,
                NewRelation {
                    world_id: world.id,
                    source_type: EntityKind::Character,
                    source_id: ada.id.into_inner(),
                    target_type: EntityKind::Artifact,
                    target_id: sword.id.into_inner(),
                    relation_type: "owns".into(),
                    context_type: None,
                    context_id: None,
                    attributes: BTreeMap::new(),
                    summary: None,
                    create_mirror: true,
                },
            )
            .await
            .unwrap();
        let mirror = created.mirror.unwrap();
        assert_eq!(mirror.relation_type, "owned_by");

        relations.delete(&ctx, mirror.id).await.unwrap();
        let err = relations.get(&ctx, created.relation.id).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }
}
