//! Error types for the data layer.
//!
//! Connection, migration and configuration failures surface as [`DbError`].
//! Failures inside a store transaction are translated by [`store_error`]
//! into the backend-neutral [`StoreError`] the engine understands.

use fabula_core::StoreError;

/// Errors that can occur while setting up the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A SQL operation failed.
    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    /// A migration failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A Redis operation failed.
    #[error("Redis error: {0}")]
    Redis(#[from] fred::error::Error),

    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// `PostgreSQL` serialization failure.
const SERIALIZATION_FAILURE: &str = "40001";
/// `PostgreSQL` deadlock.
const DEADLOCK_DETECTED: &str = "40P01";
/// `SQLite` `SQLITE_BUSY` and `SQLITE_LOCKED`.
const SQLITE_BUSY: &str = "5";
const SQLITE_LOCKED: &str = "6";

/// Translate a driver error raised inside a transaction.
pub fn store_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db) => {
            let code = db.code();
            match code.as_deref() {
                Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED | SQLITE_BUSY | SQLITE_LOCKED) => {
                    StoreError::Conflict(db.message().to_owned())
                }
                _ if db.is_unique_violation() => StoreError::Duplicate(db.message().to_owned()),
                _ => StoreError::Backend(db.message().to_owned()),
            }
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(err.to_string())
        }
        other => StoreError::Backend(other.to_string()),
    }
}

/// A stored text column that does not parse back into its enum.
pub(crate) fn bad_column(column: &str, err: impl core::fmt::Display) -> StoreError {
    StoreError::Backend(format!("invalid {column} column: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_exhaustion_is_unavailable() {
        assert!(matches!(
            store_error(sqlx::Error::PoolTimedOut),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            store_error(sqlx::Error::RowNotFound),
            StoreError::Backend(_)
        ));
    }
}
