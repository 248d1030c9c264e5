//! Wiring shared by both binaries: store selection, side channels,
//! concurrent HTTP and gRPC serving, and signal-driven shutdown.

use std::sync::Arc;

use anyhow::Context;
use fabula_api::AppState;
use fabula_core::{
    AuditSink, Engine, IngestionQueue, MemoryStore, SideChannels, Store, TenantMode,
};
use fabula_db::{
    PgStore, PostgresConfig, PostgresPool, RedisIngestionQueue, SqlAuditSink, SqliteConfig,
    SqlitePool, SqliteStore,
};
use tokio::sync::watch;
use tracing::{error, info};

use crate::config::{DbDriver, ServerConfig};

/// Whether audit entries are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditMode {
    /// Follow `AUDIT_ENABLED`.
    Configured,
    /// Always discard (offline runtime).
    Disabled,
}

/// Connection pool held for the lifetime of the process.
#[derive(Debug)]
enum Pool {
    Postgres(PostgresPool),
    Sqlite(SqlitePool),
    Memory,
}

/// A connected engine and the pool behind it.
#[derive(Debug)]
pub struct Runtime {
    /// The engine every surface serves.
    pub engine: Engine,
    pool: Pool,
}

impl Runtime {
    /// Connect the configured store, run its migrations and wire the side
    /// channels.
    pub async fn connect(config: &ServerConfig, audit: AuditMode) -> anyhow::Result<Self> {
        let db = &config.database;
        let audit_enabled = audit == AuditMode::Configured && config.audit_enabled;

        let (store, sink, pool): (Arc<dyn Store>, Option<Arc<dyn AuditSink>>, Pool) =
            match db.driver {
                DbDriver::Postgres => {
                    let pool = PostgresPool::connect(
                        &PostgresConfig::new(&db.postgres_url())
                            .with_max_connections(db.max_connections),
                    )
                    .await
                    .context("connecting to PostgreSQL")?;
                    pool.run_migrations()
                        .await
                        .context("running PostgreSQL migrations")?;
                    let sink: Option<Arc<dyn AuditSink>> = audit_enabled
                        .then(|| Arc::new(SqlAuditSink::postgres(&pool)) as Arc<dyn AuditSink>);
                    (Arc::new(PgStore::new(&pool)), sink, Pool::Postgres(pool))
                }
                DbDriver::Sqlite => {
                    let pool = SqlitePool::connect(&SqliteConfig::new(&db.path))
                        .await
                        .context("opening SQLite database")?;
                    pool.run_migrations()
                        .await
                        .context("running SQLite migrations")?;
                    let sink: Option<Arc<dyn AuditSink>> = audit_enabled
                        .then(|| Arc::new(SqlAuditSink::sqlite(&pool)) as Arc<dyn AuditSink>);
                    (Arc::new(SqliteStore::new(&pool)), sink, Pool::Sqlite(pool))
                }
                DbDriver::Memory => (Arc::new(MemoryStore::new()), None, Pool::Memory),
            };
        info!(driver = ?db.driver, audit = sink.is_some(), "Store ready");

        let side = sink.map_or_else(SideChannels::noop, SideChannels::new);
        let engine = Engine::new(store, Arc::new(side));

        if let Some(url) = &config.ingestion_redis_url {
            let queue: Arc<dyn IngestionQueue> = Arc::new(
                RedisIngestionQueue::connect(url)
                    .await
                    .context("connecting to the ingestion queue")?,
            );
            engine.set_ingestion_queue(Some(queue));
            info!("Ingestion queue enabled");
        }

        Ok(Self { engine, pool })
    }

    /// Close the connection pool.
    pub async fn close(self) {
        match self.pool {
            Pool::Postgres(pool) => pool.close().await,
            Pool::Sqlite(pool) => pool.close().await,
            Pool::Memory => {}
        }
        info!("Store closed");
    }
}

/// Serve HTTP and gRPC side by side until SIGINT or SIGTERM, or until
/// either listener fails.
pub async fn serve(config: &ServerConfig, engine: Engine, mode: TenantMode) -> anyhow::Result<()> {
    let (stop, stopped) = watch::channel(false);
    let signals = tokio::spawn(async move {
        shutdown_signal().await;
        let _ = stop.send(true);
    });

    let state = Arc::new(AppState::new(engine.clone()));
    let http = async {
        fabula_api::start_server(&config.http, state, mode, wait(stopped.clone()))
            .await
            .context("HTTP server")
    };
    let grpc = async {
        fabula_grpc::start_server(&config.grpc, engine, mode, wait(stopped.clone()))
            .await
            .context("gRPC server")
    };

    let result = tokio::try_join!(http, grpc).map(|((), ())| ());
    signals.abort();
    result
}

async fn wait(mut stopped: watch::Receiver<bool>) {
    let _ = stopped.wait_for(|stop| *stop).await;
}

/// Resolve on the first SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Cannot listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => {},
        () = terminate => {},
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::DbDriver;

    fn memory_config() -> ServerConfig {
        ServerConfig::load(
            |var| (var == "DB_DRIVER").then(|| "memory".to_owned()),
            DbDriver::Postgres,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn memory_driver_needs_no_database() {
        let runtime = Runtime::connect(&memory_config(), AuditMode::Configured)
            .await
            .unwrap();
        runtime.engine.ping().await.unwrap();
        runtime.close().await;
    }

    #[tokio::test]
    async fn sqlite_driver_migrates_a_fresh_file() {
        let path = std::env::temp_dir().join(format!("fabula-{}.db", std::process::id()));
        let path_text = path.to_string_lossy().into_owned();
        let config = ServerConfig::load(
            |var| match var {
                "DB_DRIVER" => Some("sqlite".to_owned()),
                "DB_PATH" => Some(path_text.clone()),
                _ => None,
            },
            DbDriver::Postgres,
        )
        .unwrap();

        let runtime = Runtime::connect(&config, AuditMode::Disabled).await.unwrap();
        let tenant = runtime
            .engine
            .tenants
            .ensure(fabula_types::TenantId::OFFLINE_DEFAULT, "Default")
            .await
            .unwrap();
        assert_eq!(tenant.id, fabula_types::TenantId::OFFLINE_DEFAULT);
        runtime.close().await;
        let _ = std::fs::remove_file(&path);
    }
}
