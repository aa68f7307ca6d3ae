//! REST API server over built daily tables
//!
//! A client uploads a workbook, receives a session id, and queries the
//! table and its analytics through that session. Tables are immutable
//! snapshots shared through the content cache.

mod error;
mod handlers;
mod routes;
mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::{AppState, Session};

use crate::builder::DailyTableBuilder;
use crate::cache::{TableCache, DEFAULT_CACHE_CAPACITY};
use crate::config::BuildConfig;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server host address (default: "127.0.0.1")
    pub host: String,
    /// Server port (default: 3000)
    pub port: u16,
    /// Maximum concurrent sessions (default: 32)
    pub max_sessions: usize,
    /// Largest accepted upload in bytes (default: 32 MiB)
    pub max_upload_bytes: usize,
    /// Number of built tables kept in the cache
    pub cache_capacity: usize,
    /// Pipeline configuration applied to every upload
    pub build: BuildConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            max_sessions: 32,
            max_upload_bytes: 32 * 1024 * 1024,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            build: BuildConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Creates a new server configuration
    pub fn new(host: impl Into<String>, port: u16, build: BuildConfig) -> Self {
        ServerConfig {
            host: host.into(),
            port,
            build,
            ..ServerConfig::default()
        }
    }
}

/// Runs the API server
///
/// # Returns
/// Returns an error if the build configuration is invalid, the address
/// cannot be bound, or the server encounters a fatal error
///
/// # Example
/// ```rust,no_run
/// use curvedesk::server::{run_server, ServerConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = ServerConfig::default();
///     run_server(config).await?;
///     Ok(())
/// }
/// ```
pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG controls verbosity, e.g. RUST_LOG=curvedesk=debug
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let builder = DailyTableBuilder::new(config.build.clone())?;
    let cache = TableCache::new(config.cache_capacity);
    let state = Arc::new(AppState::new(
        builder,
        cache,
        config.max_sessions,
        config.max_upload_bytes,
    ));

    let app = routes::create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
