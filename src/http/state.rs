use crate::chat::ChatController;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The chat view served by this process
    pub controller: Arc<ChatController>,
}

impl AppState {
    pub fn new(controller: Arc<ChatController>) -> Self {
        Self { controller }
    }
}
