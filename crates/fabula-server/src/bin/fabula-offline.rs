//! Single-tenant Fabula runtime for local use.
//!
//! Same surfaces as `fabula-server`, but every request runs for the fixed
//! default tenant regardless of headers or metadata, the store defaults to
//! a local `SQLite` file, and nothing is audited.

use fabula_core::TenantMode;
use fabula_server::{AuditMode, Runtime, ServerConfig, logging, serve};
use fabula_types::TenantId;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::offline_from_env()?;
    logging::init(config.log_format);

    info!(
        driver = ?config.database.driver,
        path = %config.database.path,
        http_port = config.http.port,
        grpc_port = config.grpc.port,
        "fabula-offline starting"
    );

    let runtime = Runtime::connect(&config, AuditMode::Disabled).await?;
    let tenant = runtime
        .engine
        .tenants
        .ensure(TenantId::OFFLINE_DEFAULT, &config.offline_tenant_name)
        .await?;
    info!(tenant_id = %tenant.id, name = %tenant.name, "Default tenant ready");

    let result = serve(&config, runtime.engine.clone(), TenantMode::Fixed(tenant.id)).await;
    runtime.close().await;
    result?;

    info!("fabula-offline shutdown complete");
    Ok(())
}
