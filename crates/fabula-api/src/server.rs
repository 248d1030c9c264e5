//! HTTP server lifecycle.
//!
//! [`start_server`] binds a TCP listener and serves the router until the
//! given shutdown future resolves. In-flight requests are allowed to
//! finish; new connections are refused once shutdown starts.

use std::future::Future;
use std::net::{AddrParseError, SocketAddr};
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::router::build_router;
use crate::state::AppState;
use crate::tenant::TenantMode;

/// Where the HTTP API listens.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Interface to bind, `0.0.0.0` for all.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 8080,
        }
    }
}

/// Serve the HTTP API until `shutdown` resolves.
///
/// # Errors
///
/// [`ServerError::Address`] when host and port do not form a socket
/// address, [`ServerError::Bind`] when the listener cannot be opened and
/// [`ServerError::Serve`] when accepting connections fails.
pub async fn start_server<F>(
    config: &HttpConfig,
    state: Arc<AppState>,
    mode: TenantMode,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e: AddrParseError| ServerError::Address(e.to_string()))?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    info!(%addr, ?mode, "HTTP server listening");

    axum::serve(listener, build_router(state, mode))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(ServerError::Serve)?;

    info!("HTTP server stopped");
    Ok(())
}

/// Failures of the HTTP listener.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// `host:port` is not a socket address.
    #[error("invalid listen address: {0}")]
    Address(String),

    /// The listener could not be opened.
    #[error("cannot listen on {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: SocketAddr,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Serving stopped on an I/O error.
    #[error("HTTP server failed: {0}")]
    Serve(#[source] std::io::Error),
}
