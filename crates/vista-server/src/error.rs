//! Server error types.
//!
//! Only startup-time failures surface through [`ServerError`]; steady-state
//! request and watch errors are handled locally and never terminate the
//! process.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Server startup error.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// A served root directory is missing or not a directory.
    #[error("Served root is not a directory: {}", .0.display())]
    MissingRoot(PathBuf),

    /// The host/port pair does not form a valid socket address.
    #[error("Invalid listen address: {0}:{1}")]
    InvalidAddress(String, u16),

    /// The listener could not be bound.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Address the server attempted to bind.
        addr: SocketAddr,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The filesystem watcher could not be established.
    #[error("Failed to start file watcher: {0}")]
    Watch(#[from] notify::Error),

    /// I/O error while serving.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
