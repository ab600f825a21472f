//! Voice message playback collaborator

use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::audio::wav_duration_secs;
use crate::chat::AudioRef;

/// Plays voice clips
///
/// Only one clip plays at a time; starting a new one stops the previous one.
#[async_trait::async_trait]
pub trait AudioPlayer: Send + Sync {
    /// Begin playback; the receiver fires when the clip ends on its own
    ///
    /// If playback is paused or replaced, the sender is dropped instead.
    async fn play(&self, audio: &AudioRef) -> Result<oneshot::Receiver<()>>;

    async fn pause(&self) -> Result<()>;
}

/// Headless player that only tracks clip length
pub struct TimedPlayer {
    current: Mutex<Option<JoinHandle<()>>>,
}

impl TimedPlayer {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
        }
    }
}

impl Default for TimedPlayer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl AudioPlayer for TimedPlayer {
    async fn play(&self, audio: &AudioRef) -> Result<oneshot::Receiver<()>> {
        let secs = wav_duration_secs(&audio.decode()?)?;
        let duration = Duration::try_from_secs_f64(secs)
            .with_context(|| format!("Unplayable clip length: {}s", secs))?;
        let (ended_tx, ended_rx) = oneshot::channel();

        info!("Playing {:.1}s clip", secs);
        let playback = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let _ = ended_tx.send(());
        });

        if let Some(previous) = self.current.lock().replace(playback) {
            previous.abort();
        }
        Ok(ended_rx)
    }

    async fn pause(&self) -> Result<()> {
        if let Some(playback) = self.current.lock().take() {
            debug!("Playback paused");
            playback.abort();
        }
        Ok(())
    }
}
