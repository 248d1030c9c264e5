//! Tenant resolution.
//!
//! [`resolve_tenant`] runs in front of every protected route. In
//! [`TenantMode::Header`] it reads the `X-Tenant-ID` header: a missing
//! header is `401`, a malformed one is `400`. In [`TenantMode::Fixed`] it
//! injects the configured tenant and ignores the header. Handlers receive
//! the result through the [`Tenant`] extractor.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use fabula_core::{CoreError, TenantContext};
pub use fabula_core::tenant::TenantMode;
use fabula_types::{TenantId, UserId};
use uuid::Uuid;

use crate::error::ApiError;

/// Header carrying the tenant id.
pub const TENANT_HEADER: &str = "x-tenant-id";

/// Optional header carrying the acting user id.
pub const USER_HEADER: &str = "x-user-id";

fn header_uuid(
    request: &Request,
    name: &str,
    field: &'static str,
) -> Result<Option<Uuid>, ApiError> {
    let Some(value) = request.headers().get(name) else {
        return Ok(None);
    };
    let parsed = value
        .to_str()
        .map_err(|e| e.to_string())
        .and_then(|text| Uuid::parse_str(text.trim()).map_err(|e| e.to_string()));
    match parsed {
        Ok(id) => Ok(Some(id)),
        Err(reason) => {
            Err(CoreError::validation(field, format!("invalid {name} header: {reason}")).into())
        }
    }
}

/// Middleware attaching a [`TenantContext`] to the request.
///
/// # Errors
///
/// Returns [`CoreError::Unauthorized`] when the header is missing and a
/// validation error when it is not a UUID.
pub async fn resolve_tenant(
    State(mode): State<TenantMode>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let tenant = match mode {
        TenantMode::Fixed(tenant) => tenant,
        TenantMode::Header => header_uuid(&request, TENANT_HEADER, "tenant_id")?
            .map(TenantId::from)
            .ok_or(CoreError::Unauthorized)?,
    };

    let mut ctx = TenantContext::new(tenant);
    if let Some(user) = header_uuid(&request, USER_HEADER, "user_id")? {
        ctx = ctx.with_actor(UserId::from(user));
    }

    request.extensions_mut().insert(ctx);
    Ok(next.run(request).await)
}

/// Extractor for the context attached by [`resolve_tenant`].
#[derive(Debug, Clone, Copy)]
pub struct Tenant(pub TenantContext);

impl<S: Send + Sync> FromRequestParts<S> for Tenant {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantContext>()
            .copied()
            .map(Self)
            .ok_or(ApiError::Core(CoreError::Unauthorized))
    }
}
