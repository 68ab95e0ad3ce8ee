//! Router construction.
//!
//! Builds the axum router with the live reload endpoint and the static
//! file fallback.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::live_reload;
use crate::state::AppState;
use crate::static_files;

/// Path of the live reload WebSocket endpoint.
///
/// Prefixed so it cannot shadow a real file in either served root.
pub const LIVE_RELOAD_PATH: &str = "/__vista/live-reload";

/// Create the application router.
///
/// # Arguments
///
/// * `state` - Shared application state
pub(crate) fn create_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new();

    // WebSocket for live reload
    if state.live_reload.is_some() {
        router = router.route(LIVE_RELOAD_PATH, get(live_reload::ws_handler));
    }

    // Static files from the two served roots
    router = router.merge(static_files::static_router());

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
