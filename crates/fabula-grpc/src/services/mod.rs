//! Service implementations, one per entity kind.
//!
//! Each holds a clone of the [`fabula_core::Engine`] and forwards to the
//! matching core service. All but [`TenantRpc`] expect the tenant context
//! attached by [`crate::TenantInterceptor`].

mod events;
mod locations;
mod relations;
mod stats;
mod stories;
mod tenants;
mod worlds;

pub use events::EventRpc;
pub use locations::LocationRpc;
pub use relations::RelationRpc;
pub use stats::StatsRpc;
pub use stories::StoryRpc;
pub use tenants::TenantRpc;
pub use worlds::WorldRpc;

/// Result type of every RPC handler.
pub(crate) type RpcResult<T> = Result<tonic::Response<T>, tonic::Status>;

/// Wrap a domain value into a response message.
#[allow(clippy::unnecessary_wraps)]
pub(crate) fn reply<T, M: From<T>>(value: T) -> RpcResult<M> {
    Ok(tonic::Response::new(M::from(value)))
}
