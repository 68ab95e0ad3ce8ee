//! HTTP server for the vista preview server.
//!
//! This crate provides a native Rust HTTP server using axum, serving:
//! - Static files from two root directories (primary checked first)
//! - WebSocket endpoint for live reload when the output root changes
//!
//! # Quick Start
//!
//! ```ignore
//! use std::path::PathBuf;
//! use vista_server::{ServerConfig, run_server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig {
//!         host: "127.0.0.1".to_string(),
//!         port: 8081,
//!         primary_root: PathBuf::from("web"),
//!         output_root: PathBuf::from("output"),
//!         watch_depth: 2,
//!         debounce_ms: 100,
//!         live_reload_enabled: true,
//!     };
//!
//!     run_server(config).await.unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Browser ──HTTP──► Rust axum server (vista-server)
//!                        │
//!                        ├─► Static files (primary root, then output root)
//!                        │
//!                        └─► WebSocket (Rust LiveReloadManager)
//!                                │
//!                                └─► notify watcher on the output root
//! ```

mod app;
mod error;
mod live_reload;
mod state;
mod static_files;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use state::AppState;
use tokio::sync::broadcast;

pub use app::LIVE_RELOAD_PATH;
pub use error::ServerError;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Directory checked first when resolving a request path.
    pub primary_root: PathBuf,
    /// Directory checked second; also the watched subtree.
    pub output_root: PathBuf,
    /// Maximum subdirectory depth observed under the output root.
    pub watch_depth: u32,
    /// Coalescing window for change notifications, in milliseconds.
    pub debounce_ms: u64,
    /// Enable live reload.
    pub live_reload_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8081,
            primary_root: PathBuf::from("web"),
            output_root: PathBuf::from("output"),
            watch_depth: 2,
            debounce_ms: 100,
            live_reload_enabled: true,
        }
    }
}

/// Run the server.
///
/// Validates both served roots, starts the output-root watcher (when live
/// reload is enabled), binds the listener and serves until Ctrl-C.
///
/// # Errors
///
/// Returns an error if either root is missing, the watcher cannot be
/// established or the listener cannot be bound. No listening happens when
/// validation fails.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    validate_roots(&config)?;

    // Create live reload manager if enabled
    let live_reload = if config.live_reload_enabled {
        let (tx, _rx) = broadcast::channel::<live_reload::ChangeEvent>(100);
        let mut manager = live_reload::LiveReloadManager::new(config.output_root.clone(), tx)
            .with_depth(config.watch_depth)
            .with_debounce_ms(config.debounce_ms);
        manager.start()?;
        Some(manager)
    } else {
        None
    };

    // Create app state
    let state = Arc::new(AppState {
        primary_root: config.primary_root.clone(),
        output_root: config.output_root.clone(),
        live_reload,
    });

    // Create router
    let app = app::create_router(state);

    // Bind and run server
    let addr = SocketAddr::from_str(&format!("{}:{}", config.host, config.port))
        .map_err(|_| ServerError::InvalidAddress(config.host.clone(), config.port))?;
    tracing::info!(address = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Check that both served roots exist and are directories.
fn validate_roots(config: &ServerConfig) -> Result<(), ServerError> {
    for root in [&config.primary_root, &config.output_root] {
        if !root.is_dir() {
            return Err(ServerError::MissingRoot(root.clone()));
        }
    }
    Ok(())
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}

/// Create server configuration from vista config.
#[must_use]
pub fn server_config_from_config(config: &vista_config::Config) -> ServerConfig {
    ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        primary_root: config.serve_resolved.primary_root.clone(),
        output_root: config.serve_resolved.output_root.clone(),
        watch_depth: config.watch.depth,
        debounce_ms: config.watch.debounce_ms,
        live_reload_enabled: config.watch.enabled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_primary_root_fails_before_binding() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            primary_root: dir.path().join("does-not-exist"),
            output_root: dir.path().to_path_buf(),
            ..ServerConfig::default()
        };

        let result = run_server(config).await;

        assert!(matches!(result, Err(ServerError::MissingRoot(_))));
    }

    #[tokio::test]
    async fn test_missing_output_root_fails_before_binding() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            primary_root: dir.path().to_path_buf(),
            output_root: dir.path().join("does-not-exist"),
            ..ServerConfig::default()
        };

        let result = run_server(config).await;

        assert!(matches!(result, Err(ServerError::MissingRoot(_))));
    }

    #[test]
    fn test_server_config_from_config() {
        let config = vista_config::Config::default();
        let server_config = server_config_from_config(&config);

        assert_eq!(server_config.port, 8081);
        assert_eq!(server_config.watch_depth, 2);
        assert!(server_config.live_reload_enabled);
    }
}
