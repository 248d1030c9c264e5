//! Tenant resolution for gRPC calls.
//!
//! [`TenantInterceptor`] runs before every tenant-scoped service. In
//! [`TenantMode::Header`] it reads the `tenant_id` metadata entry: a
//! missing entry is `UNAUTHENTICATED`, a malformed one `INVALID_ARGUMENT`.
//! In [`TenantMode::Fixed`] it injects the configured tenant. Services pick
//! the result up with [`context`].

use fabula_core::{CoreError, TenantContext, TenantMode};
use fabula_types::{TenantId, UserId};
use tonic::metadata::MetadataMap;
use tonic::service::Interceptor;
use tonic::{Request, Status};
use uuid::Uuid;

use crate::error::status;

/// Metadata key carrying the tenant id.
pub const TENANT_KEY: &str = "tenant_id";

/// Optional metadata key carrying the acting user id.
pub const USER_KEY: &str = "user_id";

fn metadata_uuid(metadata: &MetadataMap, key: &'static str) -> Result<Option<Uuid>, Status> {
    let Some(value) = metadata.get(key) else {
        return Ok(None);
    };
    value
        .to_str()
        .map_err(|e| e.to_string())
        .and_then(|text| Uuid::parse_str(text.trim()).map_err(|e| e.to_string()))
        .map(Some)
        .map_err(|reason| {
            status(CoreError::validation(
                key,
                format!("invalid {key} metadata: {reason}"),
            ))
        })
}

/// Attaches a [`TenantContext`] to each request.
#[derive(Debug, Clone, Copy)]
pub struct TenantInterceptor {
    mode: TenantMode,
}

impl TenantInterceptor {
    /// Interceptor resolving tenants according to `mode`.
    pub const fn new(mode: TenantMode) -> Self {
        Self { mode }
    }
}

impl Interceptor for TenantInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        let tenant = match self.mode {
            TenantMode::Fixed(tenant) => tenant,
            TenantMode::Header => metadata_uuid(request.metadata(), TENANT_KEY)?
                .map(TenantId::from)
                .ok_or_else(|| status(CoreError::Unauthorized))?,
        };

        let mut ctx = TenantContext::new(tenant);
        if let Some(user) = metadata_uuid(request.metadata(), USER_KEY)? {
            ctx = ctx.with_actor(UserId::from(user));
        }
        request.extensions_mut().insert(ctx);
        Ok(request)
    }
}

/// The context the interceptor attached to `request`.
///
/// # Errors
///
/// `UNAUTHENTICATED` when the service was mounted without the interceptor.
pub fn context<T>(request: &Request<T>) -> Result<TenantContext, Status> {
    request
        .extensions()
        .get::<TenantContext>()
        .copied()
        .ok_or_else(|| status(CoreError::Unauthorized))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tonic::Code;

    use super::*;

    fn with_metadata(entries: &[(&'static str, &str)]) -> Request<()> {
        let mut request = Request::new(());
        for (key, value) in entries {
            request.metadata_mut().insert(*key, value.parse().unwrap());
        }
        request
    }

    #[test]
    fn header_mode_reads_tenant_and_user() {
        let tenant = Uuid::now_v7();
        let user = Uuid::now_v7();
        let request = with_metadata(&[
            (TENANT_KEY, &tenant.to_string()),
            (USER_KEY, &user.to_string()),
        ]);

        let request = TenantInterceptor::new(TenantMode::Header)
            .call(request)
            .unwrap();
        let ctx = context(&request).unwrap();
        assert_eq!(ctx.tenant_id, TenantId::from(tenant));
        assert_eq!(ctx.actor, Some(UserId::from(user)));
    }

    #[test]
    fn missing_tenant_is_unauthenticated() {
        let err = TenantInterceptor::new(TenantMode::Header)
            .call(Request::new(()))
            .unwrap_err();
        assert_eq!(err.code(), Code::Unauthenticated);
    }

    #[test]
    fn malformed_tenant_is_invalid_argument() {
        let err = TenantInterceptor::new(TenantMode::Header)
            .call(with_metadata(&[(TENANT_KEY, "not-a-uuid")]))
            .unwrap_err();
        assert_eq!(err.code(), Code::InvalidArgument);
    }

    #[test]
    fn fixed_mode_ignores_metadata() {
        let other = Uuid::now_v7().to_string();
        let request = TenantInterceptor::new(TenantMode::Fixed(TenantId::OFFLINE_DEFAULT))
            .call(with_metadata(&[(TENANT_KEY, &other)]))
            .unwrap();
        assert_eq!(
            context(&request).unwrap().tenant_id,
            TenantId::OFFLINE_DEFAULT
        );
    }

    #[test]
    fn context_requires_the_interceptor() {
        let err = context(&Request::new(())).unwrap_err();
        assert_eq!(err.code(), Code::Unauthenticated);
    }
}
