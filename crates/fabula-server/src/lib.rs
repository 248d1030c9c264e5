//! Process wiring for the Fabula story engine.
//!
//! Two binaries share this library:
//!
//! - `fabula-server` -- multi-tenant HTTP and gRPC; the tenant comes from
//!   the `X-Tenant-ID` header or the `tenant_id` metadata entry.
//! - `fabula-offline` -- single-tenant; `SQLite` by default, the fixed
//!   default tenant injected on every call, no audit trail.
//!
//! # Modules
//!
//! - [`config`] -- [`ServerConfig`] loaded from the environment
//! - [`logging`] -- `tracing` subscriber bootstrap
//! - [`runtime`] -- Store selection, side channels, serving and shutdown

pub mod config;
pub mod logging;
pub mod runtime;

pub use config::{ConfigError, DbDriver, LogFormat, ServerConfig};
pub use runtime::{AuditMode, Runtime, serve, shutdown_signal};
