//! Domain engine for the Fabula story engine.
//!
//! Everything a transport needs to serve a request lives here: the tenant
//! context, the store contract every backend implements, and one service
//! per aggregate. Services open a transaction for the caller's tenant, run
//! the use case, commit, and then notify the audit sink and the ingestion
//! queue. Side-channel failures are logged and never fail the request.
//!
//! # Modules
//!
//! - [`error`] -- [`CoreError`] taxonomy and the backend-neutral [`StoreError`]
//! - [`tenant`] -- Request-scoped [`TenantContext`]
//! - [`clock`] -- Microsecond-truncated timestamps
//! - [`store`] -- Store and transaction traits, row mapping, in-memory store
//! - [`side_channel`] -- Audit sink and ingestion queue
//! - [`hierarchy`] -- Parent/level maintenance for tree-shaped kinds
//! - [`graph`] -- Relation edges, mirrors and cursor pagination
//! - [`cascade`] -- Dependent-row cleanup for deletes
//! - [`service`] -- Use-case services and the [`Engine`] that wires them

pub mod cascade;
pub mod clock;
pub mod error;
pub mod graph;
pub mod hierarchy;
pub mod service;
pub mod side_channel;
pub mod store;
pub mod tenant;

pub use error::{CoreError, StoreError};
pub use service::Engine;
pub use side_channel::{AuditSink, IngestionQueue, SideChannels};
pub use store::{Isolation, MemoryStore, Store, Transaction};
pub use tenant::{TenantContext, TenantMode};
