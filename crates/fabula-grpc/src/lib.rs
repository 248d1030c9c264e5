//! gRPC surface of the Fabula story engine.
//!
//! Tonic services generated from `proto/fabula.proto` (package
//! `fabula.v1`) over the same [`fabula_core::Engine`] the HTTP surface
//! uses, so every mutation has the HTTP semantics. Tenant-scoped services
//! sit behind [`TenantInterceptor`], which reads the `tenant_id` metadata
//! entry or injects the fixed offline tenant.
//!
//! # Modules
//!
//! - [`pb`] -- Generated messages, service traits and clients
//! - [`error`] -- [`fabula_core::CoreError`] to [`tonic::Status`] mapping
//! - [`tenant`] -- Tenant interceptor and context lookup
//! - [`convert`] -- Domain/wire conversions and request field parsing
//! - [`services`] -- One service implementation per entity kind
//! - [`server`] -- Listener lifecycle, message limits and reflection

pub mod convert;
pub mod error;
pub mod server;
pub mod services;
pub mod tenant;

/// Generated protobuf types and tonic stubs.
#[allow(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::missing_const_for_fn,
    clippy::doc_markdown
)]
pub mod pb {
    tonic::include_proto!("fabula.v1");

    /// Encoded descriptor set served by the reflection service.
    pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("fabula_descriptor");
}

pub use error::status;
pub use server::{GrpcConfig, GrpcServerError, start_server};
pub use tenant::{TENANT_KEY, TenantInterceptor, USER_KEY};
