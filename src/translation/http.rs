use anyhow::{Context, Result};
use base64::Engine;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error};

use super::gateway::{Translation, TranslationGateway};
use crate::audio::AudioPayload;
use crate::chat::{LanguagePair, Role};
use crate::config::TranslationConfig;
use crate::error::{ChatError, ChatResult};

/// Request body sent to the translation endpoint
#[derive(Debug, Serialize)]
pub struct TranslateRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<&'a str>,
    /// Base64-encoded audio
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<&'a str>,
    pub source_language: &'a str,
    pub target_language: &'a str,
}

/// Translation gateway backed by a JSON HTTP endpoint
pub struct HttpTranslationGateway {
    client: reqwest::Client,
    endpoint: String,
    languages: LanguagePair,
}

impl HttpTranslationGateway {
    pub fn new(config: &TranslationConfig, languages: LanguagePair) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            languages,
        })
    }

    pub fn text_request<'a>(&'a self, text: &'a str, source: Role) -> TranslateRequest<'a> {
        TranslateRequest {
            text: Some(text),
            audio: None,
            mime_type: None,
            source_language: self.languages.language_of(source),
            target_language: self.languages.language_of(source.peer()),
        }
    }

    pub fn audio_request<'a>(&'a self, audio: &'a AudioPayload, source: Role) -> TranslateRequest<'a> {
        TranslateRequest {
            text: None,
            audio: Some(base64::engine::general_purpose::STANDARD.encode(&audio.bytes)),
            mime_type: Some(audio.mime_type()),
            source_language: self.languages.language_of(source),
            target_language: self.languages.language_of(source.peer()),
        }
    }

    async fn post(&self, request: &TranslateRequest<'_>) -> ChatResult<Translation> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!("Translation request failed: {}", e);
                ChatError::TranslationFailed(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Translation service returned {}: {}", status, body);
            return Err(ChatError::TranslationFailed(format!("status {}", status)));
        }

        let translation: Translation = response.json().await.map_err(|e| {
            error!("Failed to decode translation response: {}", e);
            ChatError::TranslationFailed(e.to_string())
        })?;

        debug!(
            "Translated ({} -> {}): {:?} -> {:?}",
            request.source_language,
            request.target_language,
            translation.transcription,
            translation.translation
        );

        Ok(translation)
    }
}

#[async_trait::async_trait]
impl TranslationGateway for HttpTranslationGateway {
    async fn translate_text(&self, text: &str, source: Role) -> ChatResult<Translation> {
        self.post(&self.text_request(text, source)).await
    }

    async fn translate_audio(&self, audio: &AudioPayload, source: Role) -> ChatResult<Translation> {
        self.post(&self.audio_request(audio, source)).await
    }
}
