//! `SQLite` connection pool for the offline single-tenant runtime.
//!
//! The pool holds exactly one connection. Every transaction therefore
//! runs alone, which gives serializable behaviour without `SQLITE_BUSY`
//! retries, and keeps a `sqlite::memory:` database alive for the life of
//! the pool.

use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool as SqlxSqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

use crate::error::DbError;

/// How long a statement waits on a locked database file.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for the `SQLite` pool.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Database file path, or `:memory:`.
    pub path: String,
}

impl SqliteConfig {
    /// File-backed database at `path`, created when missing.
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_owned(),
        }
    }

    /// Private in-memory database.
    pub fn in_memory() -> Self {
        Self::new(":memory:")
    }

    fn is_memory(&self) -> bool {
        self.path == ":memory:"
    }
}

/// Connection pool handle to `SQLite`.
#[derive(Debug, Clone)]
pub struct SqlitePool {
    pool: SqlxSqlitePool,
}

impl SqlitePool {
    /// Open (or create) the database described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the path cannot be turned into
    /// connection options, [`DbError::Sql`] if opening fails.
    pub async fn connect(config: &SqliteConfig) -> Result<Self, DbError> {
        let options = if config.is_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::Config(format!("Invalid SQLite options: {e}")))?
        } else {
            SqliteConnectOptions::new()
                .filename(&config.path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
        }
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        tracing::info!(path = %config.path, "Opened SQLite database");
        Ok(Self { pool })
    }

    /// Run all pending migrations from `migrations/sqlite`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Migration`] if any migration fails.
    pub async fn run_migrations(&self) -> Result<(), DbError> {
        sqlx::migrate!("./migrations/sqlite").run(&self.pool).await?;
        tracing::info!("SQLite migrations completed");
        Ok(())
    }

    /// Return a reference to the underlying pool.
    pub const fn pool(&self) -> &SqlxSqlitePool {
        &self.pool
    }

    /// Close the pool.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("SQLite pool closed");
    }
}
