//! Error types for the chat core
//!
//! Device- and network-facing failures are caught at the `ChatController`
//! boundary and turned into user-visible notices; none of them is fatal.

use thiserror::Error;

use crate::chat::MessageId;

/// Chat core errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// Capture device missing, busy, or permission denied
    #[error("Capture device unavailable: {0}")]
    DeviceUnavailable(String),

    /// `stop()` called without a matching `start()`
    #[error("No active recording")]
    NoActiveRecording,

    /// Transport or upstream failure in the translation service
    #[error("Translation failed: {0}")]
    TranslationFailed(String),

    /// Message id not present in the local log
    #[error("Message {0} not found")]
    NotFound(MessageId),

    /// Captured audio could not be assembled into a clip
    #[error("Capture failed: {0}")]
    CaptureFailed(String),
}

impl ChatError {
    /// Text shown to the participant when this error reaches the UI
    pub fn user_message(&self) -> String {
        match self {
            ChatError::DeviceUnavailable(_) => {
                "Microphone unavailable. Please check the device and permissions.".to_string()
            }
            ChatError::NoActiveRecording => "There is no recording to stop.".to_string(),
            ChatError::TranslationFailed(_) => {
                "Translation failed. Please try again.".to_string()
            }
            ChatError::NotFound(_) => "That message is no longer available.".to_string(),
            ChatError::CaptureFailed(_) => {
                "The recording could not be processed. Please try again.".to_string()
            }
        }
    }
}

pub type ChatResult<T> = std::result::Result<T, ChatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_detail() {
        let err = ChatError::TranslationFailed("status 503".to_string());
        assert_eq!(err.to_string(), "Translation failed: status 503");

        let err = ChatError::NotFound(MessageId::from("m1"));
        assert_eq!(err.to_string(), "Message m1 not found");
    }

    #[test]
    fn test_user_message_hides_detail() {
        let err = ChatError::DeviceUnavailable("EACCES /dev/snd".to_string());
        assert!(!err.user_message().contains("EACCES"));
    }
}
