//! Listener setup and graceful serving.
//!
//! [`start_server`] is [`bind`] followed by [`serve`]. The two halves are
//! public so callers (and tests) can bind an ephemeral port, read the
//! chosen address, and only then start serving.

use std::future::Future;
use std::io;
use std::sync::Arc;

use terra_core::config::ServerSection;
use tokio::net::TcpListener;
use tracing::info;

use crate::router::build_router;
use crate::state::AppState;

/// Where to listen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Interface address or hostname.
    pub host: String,
    /// TCP port; 0 lets the OS pick.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from(&ServerSection::default())
    }
}

impl From<&ServerSection> for ServerConfig {
    fn from(section: &ServerSection) -> Self {
        Self {
            host: section.host.clone(),
            port: section.port,
        }
    }
}

impl ServerConfig {
    /// `host:port`, as logged and reported in errors.
    pub fn display_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Resolve `host` and bind a listener on the first address that accepts.
pub async fn bind(config: &ServerConfig) -> Result<TcpListener, ServerError> {
    TcpListener::bind((config.host.as_str(), config.port))
        .await
        .map_err(|source| ServerError::Bind {
            addr: config.display_addr(),
            source,
        })
}

/// Serve the telemetry router on `listener` until `shutdown` resolves.
///
/// In-flight requests are allowed to finish; open streams end when their
/// sessions observe the dropped transport.
pub async fn serve<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let local = listener.local_addr().map_err(ServerError::Serve)?;
    info!(addr = %local, "Telemetry server listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(ServerError::Serve)?;

    info!(addr = %local, "Telemetry server stopped");
    Ok(())
}

/// Bind from `config`, then [`serve`] until `shutdown` resolves.
pub async fn start_server<F>(
    config: &ServerConfig,
    state: Arc<AppState>,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = bind(config).await?;
    serve(listener, state, shutdown).await
}

/// Listener failures.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The address did not resolve or the port could not be bound.
    #[error("bind failed on {addr}: {source}")]
    Bind {
        /// Address as configured.
        addr: String,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },

    /// Accepting or serving connections failed.
    #[error("serve failed: {0}")]
    Serve(#[source] io::Error),
}
