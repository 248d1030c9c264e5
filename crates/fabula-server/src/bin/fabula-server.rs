//! Multi-tenant Fabula server.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from the environment
//! 2. Initialize structured logging
//! 3. Connect the store, run migrations, wire audit and ingestion
//! 4. Serve HTTP and gRPC until SIGINT or SIGTERM
//! 5. Close the store

use fabula_core::TenantMode;
use fabula_server::{AuditMode, Runtime, ServerConfig, logging, serve};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env()?;
    logging::init(config.log_format);

    info!(
        driver = ?config.database.driver,
        http_port = config.http.port,
        grpc_port = config.grpc.port,
        "fabula-server starting"
    );

    let runtime = Runtime::connect(&config, AuditMode::Configured).await?;
    let result = serve(&config, runtime.engine.clone(), TenantMode::Header).await;
    runtime.close().await;
    result?;

    info!("fabula-server shutdown complete");
    Ok(())
}
