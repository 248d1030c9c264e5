use fabula_core::Engine;
use fabula_core::service::tenant::{NewTenant, TenantChanges};
use fabula_types::{TenantId, TenantStatus};
use tonic::{Request, Response};

use super::{RpcResult, reply};
use crate::convert::{parse_id, parse_opt_enum};
use crate::error::status;
use crate::pb::{self, tenant_service_server::TenantService};

/// Tenant registry. Public: mounted without the tenant interceptor.
#[derive(Debug, Clone)]
pub struct TenantRpc {
    engine: Engine,
}

impl TenantRpc {
    /// Service over `engine`.
    pub const fn new(engine: Engine) -> Self {
        Self { engine }
    }
}

#[tonic::async_trait]
impl TenantService for TenantRpc {
    async fn create_tenant(
        &self,
        request: Request<pb::CreateTenantRequest>,
    ) -> RpcResult<pb::Tenant> {
        let input = request.into_inner();
        let tenant = self
            .engine
            .tenants
            .create(NewTenant { name: input.name })
            .await
            .map_err(status)?;
        reply(tenant)
    }

    async fn get_tenant(&self, request: Request<pb::IdRequest>) -> RpcResult<pb::Tenant> {
        let id: TenantId = parse_id("id", &request.get_ref().id)?;
        reply(self.engine.tenants.get(id).await.map_err(status)?)
    }

    async fn list_tenants(&self, _request: Request<pb::Empty>) -> RpcResult<pb::TenantList> {
        let tenants = self.engine.tenants.list().await.map_err(status)?;
        Ok(Response::new(pb::TenantList {
            tenants: tenants.into_iter().map(Into::into).collect(),
        }))
    }

    async fn update_tenant(
        &self,
        request: Request<pb::UpdateTenantRequest>,
    ) -> RpcResult<pb::Tenant> {
        let input = request.into_inner();
        let id: TenantId = parse_id("id", &input.id)?;
        let changes = TenantChanges {
            name: input.name,
            status: parse_opt_enum::<TenantStatus>("status", input.status.as_deref())?,
        };
        reply(self.engine.tenants.update(id, changes).await.map_err(status)?)
    }
}
