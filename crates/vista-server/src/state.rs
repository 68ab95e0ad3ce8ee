//! Application state.
//!
//! Shared state for all request handlers. Constructed once at startup and
//! handed to axum as an `Arc`; there is no other process-wide state.

use std::path::PathBuf;

use crate::live_reload::LiveReloadManager;

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// Directory checked first when resolving a request path.
    pub(crate) primary_root: PathBuf,
    /// Directory checked second; also the watched subtree.
    pub(crate) output_root: PathBuf,
    /// Live reload manager (if enabled).
    pub(crate) live_reload: Option<LiveReloadManager>,
}
