use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chat::Message;

/// Message snapshot broadcast between tabs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncEnvelope {
    /// Channel name the snapshot was published on
    pub channel: String,
    /// Publishing tab; receivers drop their own envelopes
    pub origin: Uuid,
    pub sent_at: DateTime<Utc>,
    pub message: Message,
}

impl SyncEnvelope {
    pub fn new(channel: &str, origin: Uuid, message: Message) -> Self {
        Self {
            channel: channel.to_string(),
            origin,
            sent_at: Utc::now(),
            message,
        }
    }
}
