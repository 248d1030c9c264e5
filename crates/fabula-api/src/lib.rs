//! HTTP surface of the Fabula story engine.
//!
//! An Axum router over the [`fabula_core::Engine`]. Every protected route
//! runs for one tenant, resolved from the `X-Tenant-ID` header or fixed by
//! the offline runtime; handlers call a single engine service and map
//! [`fabula_core::CoreError`] onto HTTP statuses.
//!
//! # Modules
//!
//! - [`error`] -- [`ApiError`] and the JSON error body
//! - [`extract`] -- JSON, path and query extractors rejecting with [`ApiError`]
//! - [`tenant`] -- Tenant middleware and the [`Tenant`](tenant::Tenant) extractor
//! - [`state`] -- Shared [`AppState`]
//! - [`handlers`] -- REST endpoint handlers
//! - [`router`] -- Route table and middleware stack
//! - [`server`] -- Listener lifecycle with graceful shutdown

pub mod error;
pub mod extract;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod tenant;

pub use error::{ApiError, ApiResult};
pub use router::build_router;
pub use server::{HttpConfig, ServerError, start_server};
pub use state::AppState;
pub use tenant::TenantMode;
