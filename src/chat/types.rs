use anyhow::{bail, Context, Result};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One of the two fixed chat participants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// English speaker
    A,
    /// Spanish speaker
    B,
}

impl Role {
    /// The other participant
    pub fn peer(self) -> Role {
        match self {
            Role::A => Role::B,
            Role::B => Role::A,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::A => "a",
            Role::B => "b",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown role '{0}' (expected a, b, english or spanish)")]
pub struct ParseRoleError(String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" | "english" => Ok(Role::A),
            "b" | "spanish" => Ok(Role::B),
            _ => Err(ParseRoleError(s.to_string())),
        }
    }
}

/// Language code spoken by each role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguagePair {
    pub a: String,
    pub b: String,
}

impl LanguagePair {
    pub fn language_of(&self, role: Role) -> &str {
        match role {
            Role::A => &self.a,
            Role::B => &self.b,
        }
    }
}

impl Default for LanguagePair {
    fn default() -> Self {
        Self {
            a: "en".to_string(),
            b: "es".to_string(),
        }
    }
}

/// Opaque message identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MessageId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A per-sender emoji annotation on a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub emoji: String,
    pub sender: Role,
}

const WAV_DATA_URL_PREFIX: &str = "data:audio/wav;base64,";

/// Playable reference to a voice clip (a WAV data URL)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioRef(String);

impl AudioRef {
    pub fn from_wav(bytes: &[u8]) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        Self(format!("{}{}", WAV_DATA_URL_PREFIX, encoded))
    }

    pub fn as_url(&self) -> &str {
        &self.0
    }

    /// Decode the WAV bytes behind this reference
    pub fn decode(&self) -> Result<Vec<u8>> {
        let Some(encoded) = self.0.strip_prefix(WAV_DATA_URL_PREFIX) else {
            bail!("Unsupported audio reference: expected a WAV data URL");
        };

        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .context("Invalid base64 in audio reference")
    }
}

/// A transcript/translation pair plus its reactions
///
/// Everything except `reactions` is fixed once the message is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender: Role,
    pub original_text: String,
    pub translated_text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioRef>,
}

impl Message {
    pub fn is_voice(&self) -> bool {
        self.audio.is_some()
    }

    pub fn has_reaction(&self, emoji: &str, sender: Role) -> bool {
        self.reactions
            .iter()
            .any(|r| r.emoji == emoji && r.sender == sender)
    }
}
