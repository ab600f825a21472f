use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::audio::{AudioPayload, CaptureDevice, ClipBuffer};
use crate::config::RecordingConfig;
use crate::error::{ChatError, ChatResult};

/// Where a recording session currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    Idle,
    Recording,
    /// Stop requested, clip being assembled
    Finalizing,
}

/// Holds the capture device for one recording; releases it on drop
///
/// Taken before `acquire` so an abandoned start still gives the device back.
struct DeviceLease {
    device: Arc<dyn CaptureDevice>,
    armed: bool,
}

impl DeviceLease {
    fn new(device: Arc<dyn CaptureDevice>) -> Self {
        Self {
            device,
            armed: true,
        }
    }

    /// The device refused the acquire and holds nothing for us
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for DeviceLease {
    fn drop(&mut self) {
        if self.armed {
            info!("Releasing capture device: {}", self.device.name());
            self.device.release();
        }
    }
}

struct ActiveCapture {
    lease: DeviceLease,
    stop_tx: oneshot::Sender<()>,
    collector: JoinHandle<ClipBuffer>,
    ticker: JoinHandle<()>,
}

/// Captures one bounded audio clip at a time
pub struct RecordingSession {
    config: RecordingConfig,
    device: Arc<dyn CaptureDevice>,
    state: Mutex<RecordingState>,
    elapsed_tx: Arc<watch::Sender<u64>>,
    /// Serializes start/stop; `Some` while a capture is running
    active: AsyncMutex<Option<ActiveCapture>>,
}

impl RecordingSession {
    pub fn new(config: RecordingConfig, device: Arc<dyn CaptureDevice>) -> Self {
        let (elapsed_tx, _) = watch::channel(0);
        Self {
            config,
            device,
            state: Mutex::new(RecordingState::Idle),
            elapsed_tx: Arc::new(elapsed_tx),
            active: AsyncMutex::new(None),
        }
    }

    /// Start recording
    pub async fn start(&self) -> ChatResult<()> {
        let mut active = self.active.lock().await;
        if active.is_some() {
            warn!("Recording already started");
            return Ok(());
        }

        let mut lease = DeviceLease::new(Arc::clone(&self.device));
        let mut frames = match self.device.acquire().await {
            Ok(rx) => rx,
            Err(e) => {
                lease.disarm();
                error!("Failed to acquire {}: {}", self.device.name(), e);
                return Err(e);
            }
        };

        info!("Recording started on {}", self.device.name());

        let mut clip = ClipBuffer::new(
            self.config.sample_rate,
            self.config.channels,
            self.config.max_duration_secs,
        );
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let collector = tokio::spawn(async move {
            loop {
                tokio::select! {
                    frame = frames.recv() => match frame {
                        Some(frame) => {
                            if !clip.push(&frame) {
                                warn!("Recording reached its length limit; further audio is dropped");
                                break;
                            }
                        }
                        None => break,
                    },
                    _ = &mut stop_rx => {
                        // Keep whatever the device delivered before the stop
                        while let Ok(frame) = frames.try_recv() {
                            if !clip.push(&frame) {
                                break;
                            }
                        }
                        break;
                    }
                }
            }
            clip
        });

        self.elapsed_tx.send_replace(0);
        let elapsed_tx = Arc::clone(&self.elapsed_tx);
        let max_secs = self.config.max_duration_secs;
        let ticker = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            interval.tick().await;
            // The clip stops growing at its length limit, so does the counter
            loop {
                interval.tick().await;
                elapsed_tx.send_if_modified(|secs| {
                    if *secs < max_secs {
                        *secs += 1;
                        true
                    } else {
                        false
                    }
                });
            }
        });

        *self.state.lock() = RecordingState::Recording;
        *active = Some(ActiveCapture {
            lease,
            stop_tx,
            collector,
            ticker,
        });

        Ok(())
    }

    /// Stop recording and return the assembled clip
    pub async fn stop(&self) -> ChatResult<AudioPayload> {
        let mut active = self.active.lock().await;
        let Some(capture) = active.take() else {
            warn!("Recording not active");
            return Err(ChatError::NoActiveRecording);
        };

        *self.state.lock() = RecordingState::Finalizing;
        let result = Self::finalize(capture).await;

        self.elapsed_tx.send_replace(0);
        *self.state.lock() = RecordingState::Idle;

        match &result {
            Ok(payload) => info!(
                "Recording stopped: {:.1}s, {} bytes",
                payload.duration_secs,
                payload.bytes.len()
            ),
            Err(e) => error!("Failed to finalize recording: {}", e),
        }

        result
    }

    async fn finalize(capture: ActiveCapture) -> ChatResult<AudioPayload> {
        let ActiveCapture {
            lease,
            stop_tx,
            collector,
            ticker,
        } = capture;

        ticker.abort();
        let _ = stop_tx.send(());
        drop(lease);

        let clip = collector
            .await
            .map_err(|e| ChatError::CaptureFailed(format!("collector task failed: {}", e)))?;

        if clip.is_truncated() {
            info!("Recording was truncated to its length limit");
        }

        clip.finish()
            .map_err(|e| ChatError::CaptureFailed(format!("{:#}", e)))
    }

    pub fn state(&self) -> RecordingState {
        *self.state.lock()
    }

    pub fn is_recording(&self) -> bool {
        self.state() != RecordingState::Idle
    }

    /// Whole seconds since the current recording started (0 when idle)
    pub fn elapsed_secs(&self) -> u64 {
        *self.elapsed_tx.borrow()
    }

    /// Observe the elapsed-seconds counter
    pub fn watch_elapsed(&self) -> watch::Receiver<u64> {
        self.elapsed_tx.subscribe()
    }

    pub fn device_name(&self) -> &str {
        self.device.name()
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        // An abandoned capture still holds the device through its lease
        if let Some(capture) = self.active.get_mut().take() {
            capture.ticker.abort();
            capture.collector.abort();
        }
    }
}
