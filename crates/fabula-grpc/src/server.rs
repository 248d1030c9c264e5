//! gRPC server lifecycle.
//!
//! [`start_server`] mounts every service on one tonic router and serves it
//! until the shutdown future resolves. Tenant-scoped services sit behind
//! the [`TenantInterceptor`]; the tenant registry and reflection do not.
//! Callers' `grpc-timeout` deadlines are honoured and capped at
//! [`REQUEST_TIMEOUT`]; an expired call drops its use-case future, which
//! rolls back any open transaction.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use fabula_core::{Engine, TenantMode};
use tonic::service::interceptor::InterceptedService;
use tonic::transport::Server;
use tracing::info;

use crate::pb::FILE_DESCRIPTOR_SET;
use crate::pb::event_service_server::EventServiceServer;
use crate::pb::location_service_server::LocationServiceServer;
use crate::pb::relation_service_server::RelationServiceServer;
use crate::pb::stats_service_server::StatsServiceServer;
use crate::pb::story_service_server::StoryServiceServer;
use crate::pb::tenant_service_server::TenantServiceServer;
use crate::pb::world_service_server::WorldServiceServer;
use crate::services::{
    EventRpc, LocationRpc, RelationRpc, StatsRpc, StoryRpc, TenantRpc, WorldRpc,
};
use crate::tenant::TenantInterceptor;

/// Upper bound on the duration of one call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Default message size limit in both directions (4 MiB).
pub const DEFAULT_MAX_MSG_SIZE: usize = 4_194_304;

/// Listener and limits of the gRPC server.
#[derive(Debug, Clone)]
pub struct GrpcConfig {
    /// The host address to bind to.
    pub host: String,
    /// The TCP port to listen on.
    pub port: u16,
    /// Serve `grpc.reflection.v1`.
    pub enable_reflection: bool,
    /// Largest accepted request message, in bytes.
    pub max_recv_msg_size: usize,
    /// Largest sent response message, in bytes.
    pub max_send_msg_size: usize,
}

impl Default for GrpcConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 9090,
            enable_reflection: true,
            max_recv_msg_size: DEFAULT_MAX_MSG_SIZE,
            max_send_msg_size: DEFAULT_MAX_MSG_SIZE,
        }
    }
}

/// Serve the gRPC API until `shutdown` resolves.
///
/// # Errors
///
/// Returns [`GrpcServerError::Bind`] for an invalid address,
/// [`GrpcServerError::Reflection`] if the descriptor set cannot be loaded
/// and [`GrpcServerError::Transport`] on a fatal serving error.
pub async fn start_server<F>(
    config: &GrpcConfig,
    engine: Engine,
    mode: TenantMode,
    shutdown: F,
) -> Result<(), GrpcServerError>
where
    F: Future<Output = ()> + Send,
{
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| GrpcServerError::Bind(format!("invalid address: {e}")))?;

    let interceptor = TenantInterceptor::new(mode);
    macro_rules! limited {
        ($server:ident, $service:expr) => {
            $server::new($service)
                .max_decoding_message_size(config.max_recv_msg_size)
                .max_encoding_message_size(config.max_send_msg_size)
        };
    }
    macro_rules! scoped {
        ($server:ident, $service:expr) => {
            InterceptedService::new(limited!($server, $service), interceptor)
        };
    }

    let reflection = if config.enable_reflection {
        Some(
            tonic_reflection::server::Builder::configure()
                .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
                .build_v1()?,
        )
    } else {
        None
    };

    info!(%addr, ?mode, reflection = config.enable_reflection, "gRPC server listening");

    Server::builder()
        .timeout(REQUEST_TIMEOUT)
        .add_service(limited!(TenantServiceServer, TenantRpc::new(engine.clone())))
        .add_service(scoped!(WorldServiceServer, WorldRpc::new(engine.clone())))
        .add_service(scoped!(LocationServiceServer, LocationRpc::new(engine.clone())))
        .add_service(scoped!(EventServiceServer, EventRpc::new(engine.clone())))
        .add_service(scoped!(RelationServiceServer, RelationRpc::new(engine.clone())))
        .add_service(scoped!(StoryServiceServer, StoryRpc::new(engine.clone())))
        .add_service(scoped!(StatsServiceServer, StatsRpc::new(engine)))
        .add_optional_service(reflection)
        .serve_with_shutdown(addr, shutdown)
        .await?;

    info!("gRPC server stopped");
    Ok(())
}

/// Errors that can occur when starting or running the gRPC server.
#[derive(Debug, thiserror::Error)]
pub enum GrpcServerError {
    /// The listen address is invalid.
    #[error("bind error: {0}")]
    Bind(String),

    /// The reflection service could not load the descriptor set.
    #[error("reflection error: {0}")]
    Reflection(#[from] tonic_reflection::server::Error),

    /// The transport failed while binding or serving.
    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
}
