//! SQL collaborators for the Fabula story engine.
//!
//! `PostgreSQL` backs the multi-tenant deployment, `SQLite` the offline
//! single-tenant runtime. Both implement the engine's store contract with
//! the same SQL, and both embed their migrations. Redis holds the
//! ingestion queue.
//!
//! # Architecture
//!
//! ```text
//! Engine services
//!     |
//!     +-- Store / Transaction --> PgStore | SqliteStore
//!     |                              +-- entity tables (one per kind)
//!     |                              +-- entity_relations (+ *_references views)
//!     |
//!     +-- AuditSink ------------> SqlAuditSink (audit_log)
//!     +-- IngestionQueue -------> RedisIngestionQueue (ingestion:queue:{tenant})
//! ```
//!
//! # Modules
//!
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`sqlite`] -- `SQLite` connection pool and configuration
//! - [`pg_store`] -- Store over `PostgreSQL`
//! - [`sqlite_store`] -- Store over `SQLite`
//! - [`audit`] -- Audit sink over either pool
//! - [`ingestion`] -- Redis sorted-set ingestion queue
//! - [`error`] -- Shared error types

pub mod audit;
pub mod error;
pub mod ingestion;
pub mod pg_store;
pub mod postgres;
pub mod sqlite;
pub mod sqlite_store;

mod sql;

pub use audit::SqlAuditSink;
pub use error::DbError;
pub use ingestion::RedisIngestionQueue;
pub use pg_store::PgStore;
pub use postgres::{PostgresConfig, PostgresPool};
pub use sqlite::{SqliteConfig, SqlitePool};
pub use sqlite_store::SqliteStore;
