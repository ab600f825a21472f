use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

use crate::chat::LanguagePair;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    pub translation: TranslationConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub recording: RecordingConfig,
    pub access: AccessConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Name of the broadcast channel shared by all tabs of one conversation
    pub channel: String,
    #[serde(default)]
    pub languages: LanguagePair,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            channel: "chat-sync".to_string(),
            languages: LanguagePair::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranslationConfig {
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncConfig {
    /// NATS server URL; without it the tab runs alone
    pub nats_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordingConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub max_duration_secs: u64,
    /// Frame size delivered by the capture device
    pub buffer_duration_ms: u64,
    /// WAV file replayed as microphone input
    pub source: Option<PathBuf>,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            max_duration_secs: 120,
            buffer_duration_ms: 100,
            source: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessConfig {
    /// Shared secret carried by invite links
    pub secret: String,
    /// Base URL invite links are built on
    #[serde(default = "default_invite_base")]
    pub invite_base: String,
}

fn default_invite_base() -> String {
    "http://localhost:8080/".to_string()
}

impl Config {
    /// Load from a config file (extension optional) with `LINGO__` env overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("LINGO").separator("__"))
            .build()
            .with_context(|| format!("Failed to read config from {}", path))?;

        settings
            .try_deserialize()
            .context("Invalid configuration")
    }
}
