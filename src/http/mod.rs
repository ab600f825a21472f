//! HTTP API for a local chat UI
//!
//! This module exposes one tab's chat view over REST:
//! - GET /messages - Session log
//! - POST /messages - Send text
//! - PUT /input - Update the text draft
//! - POST /messages/:id/reactions - Toggle a reaction
//! - POST /messages/:id/picker - Open/close the reaction picker
//! - POST /messages/:id/playback - Play/pause a voice message
//! - POST /recording/start, POST /recording/stop - Voice input
//! - GET /status, GET /notices, GET /health

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
