use serde::{Deserialize, Serialize};

use crate::audio::AudioPayload;
use crate::chat::Role;
use crate::error::ChatResult;

/// Result of one translation round trip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    /// What the speaker said, in their own language
    pub transcription: String,
    /// The same text in the peer's language
    pub translation: String,
}

/// Translation service collaborator
///
/// Every failure surfaces as `ChatError::TranslationFailed`; callers do not
/// retry.
#[async_trait::async_trait]
pub trait TranslationGateway: Send + Sync {
    async fn translate_text(&self, text: &str, source: Role) -> ChatResult<Translation>;

    async fn translate_audio(&self, audio: &AudioPayload, source: Role) -> ChatResult<Translation>;
}
