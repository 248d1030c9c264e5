//! [`Store`] backed by `PostgreSQL`.

use async_trait::async_trait;
use fabula_core::StoreError;
use fabula_core::store::{Isolation, Store, Transaction};
use sqlx::{PgPool, Postgres};

use crate::error::store_error;
use crate::postgres::PostgresPool;
use crate::sql::sql_transaction;

/// Engine store over a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Store sharing `pool`'s connections.
    pub fn new(pool: &PostgresPool) -> Self {
        Self {
            pool: pool.pool().clone(),
        }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self, isolation: Isolation) -> Result<Box<dyn Transaction>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;
        if isolation == Isolation::Serializable {
            sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
                .execute(&mut *tx)
                .await
                .map_err(store_error)?;
        }
        Ok(Box::new(PgTransaction::new(tx)))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(())
    }
}

sql_transaction!(
    /// An open `PostgreSQL` transaction. Dropping it rolls back.
    PgTransaction,
    Postgres
);
