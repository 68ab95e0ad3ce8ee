//! Live reload subsystem.
//!
//! Watches the output root for filesystem changes, coalesces bursts of raw
//! events into single change signals and broadcasts them to connected
//! WebSocket clients.

mod coalescer;
mod manager;
mod websocket;

pub(crate) use manager::{ChangeEvent, LiveReloadManager};
pub(crate) use websocket::ws_handler;
