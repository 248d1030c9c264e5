use fabula_core::service::stats::NewStatsVersion;
use fabula_core::{CoreError, Engine, TenantContext};
use fabula_types::{
    ArtifactId, CharacterId, EntityKind, EventId, StatsVersion, StatsVersionId,
};
use tonic::{Request, Response, Status};
use uuid::Uuid;

use super::{RpcResult, reply};
use crate::convert::{parse_enum, parse_id, parse_json, parse_opt_id};
use crate::error::status;
use crate::pb::{self, stats_service_server::StatsService};
use crate::tenant::context;

/// A stats-bearing entity addressed by `(subject_type, subject_id)`.
#[derive(Debug, Clone, Copy)]
enum Subject {
    Character(CharacterId),
    Artifact(ArtifactId),
}

impl Subject {
    fn parse(subject_type: &str, subject_id: &str) -> Result<Self, Status> {
        let id: Uuid = parse_id("subject_id", subject_id)?;
        match parse_enum("subject_type", subject_type)? {
            EntityKind::Character => Ok(Self::Character(id.into())),
            EntityKind::Artifact => Ok(Self::Artifact(id.into())),
            other => Err(status(CoreError::validation(
                "subject_type",
                format!("{other} has no stats"),
            ))),
        }
    }
}

/// Runs the same call on whichever stats service owns the subject.
macro_rules! on_subject {
    ($engine:expr, $subject:expr, |$service:ident, $id:ident| $call:expr) => {
        match $subject {
            Subject::Character($id) => {
                let $service = &$engine.character_stats;
                $call
            }
            Subject::Artifact($id) => {
                let $service = &$engine.artifact_stats;
                $call
            }
        }
    };
}

#[allow(clippy::unnecessary_wraps)]
fn list(versions: Vec<StatsVersion>) -> RpcResult<pb::StatsVersionList> {
    Ok(Response::new(pb::StatsVersionList {
        versions: versions.into_iter().map(Into::into).collect(),
    }))
}

/// Versioned stats of characters and artifacts.
#[derive(Debug, Clone)]
pub struct StatsRpc {
    engine: Engine,
}

impl StatsRpc {
    /// Service over `engine`.
    pub const fn new(engine: Engine) -> Self {
        Self { engine }
    }

    async fn history(
        &self,
        ctx: &TenantContext,
        subject: Subject,
    ) -> Result<Vec<StatsVersion>, CoreError> {
        on_subject!(self.engine, subject, |service, id| service
            .list_history(ctx, id)
            .await)
    }
}

#[tonic::async_trait]
impl StatsService for StatsRpc {
    async fn create_version(
        &self,
        request: Request<pb::CreateStatsVersionRequest>,
    ) -> RpcResult<pb::StatsVersion> {
        let ctx = context(&request)?;
        let input = request.into_inner();
        let subject = Subject::parse(&input.subject_type, &input.subject_id)?;
        let draft = NewStatsVersion {
            base_stats: parse_json("base_stats_json", &input.base_stats_json)?,
            derived_stats: input
                .derived_stats_json
                .as_deref()
                .map(|raw| parse_json("derived_stats_json", raw))
                .transpose()?,
            progression: input
                .progression_json
                .as_deref()
                .map(|raw| parse_json("progression_json", raw))
                .transpose()?,
            event_id: parse_opt_id::<EventId>("event_id", input.event_id.as_deref())?,
            reason: input.reason,
            timeline: input.timeline,
            deactivate_previous: input.deactivate_previous,
        };
        let version = on_subject!(self.engine, subject, |service, id| service
            .create_version(&ctx, id, draft)
            .await)
        .map_err(status)?;
        reply(version)
    }

    async fn get_active(
        &self,
        request: Request<pb::SubjectRequest>,
    ) -> RpcResult<pb::StatsVersion> {
        let ctx = context(&request)?;
        let input = request.get_ref();
        let subject = Subject::parse(&input.subject_type, &input.subject_id)?;
        let version = on_subject!(self.engine, subject, |service, id| service
            .get_active(&ctx, id)
            .await)
        .map_err(status)?;
        reply(version)
    }

    async fn list_history(
        &self,
        request: Request<pb::SubjectRequest>,
    ) -> RpcResult<pb::StatsVersionList> {
        let ctx = context(&request)?;
        let input = request.get_ref();
        let subject = Subject::parse(&input.subject_type, &input.subject_id)?;
        list(self.history(&ctx, subject).await.map_err(status)?)
    }

    /// The version must belong to the named subject.
    async fn activate_version(
        &self,
        request: Request<pb::ActivateStatsVersionRequest>,
    ) -> RpcResult<pb::StatsVersion> {
        let ctx = context(&request)?;
        let input = request.get_ref();
        let subject = Subject::parse(&input.subject_type, &input.subject_id)?;
        let version_id: StatsVersionId = parse_id("id", &input.id)?;

        let history = self.history(&ctx, subject).await.map_err(status)?;
        if !history.iter().any(|v| v.id == version_id) {
            return Err(status(CoreError::not_found("stats version", version_id)));
        }
        let version = on_subject!(self.engine, subject, |service, _id| service
            .activate_version(&ctx, version_id)
            .await)
        .map_err(status)?;
        reply(version)
    }

    async fn delete_all(&self, request: Request<pb::SubjectRequest>) -> RpcResult<pb::DeleteCount> {
        let ctx = context(&request)?;
        let input = request.get_ref();
        let subject = Subject::parse(&input.subject_type, &input.subject_id)?;
        let deleted = on_subject!(self.engine, subject, |service, id| service
            .delete_all(&ctx, id)
            .await)
        .map_err(status)?;
        Ok(Response::new(pb::DeleteCount { deleted }))
    }

    async fn list_by_event(
        &self,
        request: Request<pb::IdRequest>,
    ) -> RpcResult<pb::StatsVersionList> {
        let ctx = context(&request)?;
        let event: EventId = parse_id("id", &request.get_ref().id)?;
        list(
            self.engine
                .character_stats
                .list_by_event(&ctx, event)
                .await
                .map_err(status)?,
        )
    }
}
