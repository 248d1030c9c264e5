//! Request-scoped tenancy context.
//!
//! Transports resolve the tenant of an inbound request (an `X-Tenant-ID`
//! header, gRPC metadata, or the fixed offline tenant) and hand a
//! [`TenantContext`] to every use case. Store transactions are opened for
//! that tenant and qualify every query with it.

use fabula_types::{TenantId, UserId};

/// Tenant and actor a request runs on behalf of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TenantContext {
    /// Tenant qualifying every read and write.
    pub tenant_id: TenantId,
    /// Acting user, when the transport knows it.
    pub actor: Option<UserId>,
}

impl TenantContext {
    /// Context for `tenant_id` with no known actor.
    pub const fn new(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            actor: None,
        }
    }

    /// Attach the acting user.
    #[must_use]
    pub const fn with_actor(mut self, actor: UserId) -> Self {
        self.actor = Some(actor);
        self
    }
}

impl From<TenantId> for TenantContext {
    fn from(tenant_id: TenantId) -> Self {
        Self::new(tenant_id)
    }
}

/// How a transport determines the tenant of an inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantMode {
    /// Read from the request: the `X-Tenant-ID` header over HTTP, the
    /// `tenant_id` metadata entry over gRPC.
    Header,
    /// Always the given tenant (offline single-tenant runtime).
    Fixed(TenantId),
}
