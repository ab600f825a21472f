use std::path::PathBuf;
use tokio::sync::mpsc;

use crate::error::{ChatError, ChatResult};

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Capture device trait
///
/// A device is acquired for the length of one recording and released when the
/// recording ends. Implementations:
/// - File: stream a WAV file in real time (headless setups, tests)
/// - None: no capture source configured, always unavailable
#[async_trait::async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Acquire the device and start capturing
    ///
    /// Returns a channel receiver that yields frames until the device is
    /// released or the source runs dry.
    async fn acquire(&self) -> ChatResult<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing and give the device back
    fn release(&self);

    /// Check if the device is currently held
    fn is_capturing(&self) -> bool;

    /// Get device name for logging
    fn name(&self) -> &str;
}

/// Capture source type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    /// WAV file replayed as if it were live input
    File(PathBuf),
    /// No capture source
    None,
}

/// Capture device factory
pub struct CaptureDeviceFactory;

impl CaptureDeviceFactory {
    pub fn create(source: AudioSource, buffer_duration_ms: u64) -> Box<dyn CaptureDevice> {
        match source {
            AudioSource::File(path) => Box::new(super::file::FileDevice::new(path, buffer_duration_ms)),
            AudioSource::None => Box::new(NoDevice),
        }
    }
}

/// Stand-in used when no capture source is configured
pub struct NoDevice;

#[async_trait::async_trait]
impl CaptureDevice for NoDevice {
    async fn acquire(&self) -> ChatResult<mpsc::Receiver<AudioFrame>> {
        Err(ChatError::DeviceUnavailable(
            "no capture source configured".to_string(),
        ))
    }

    fn release(&self) {}

    fn is_capturing(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "none"
    }
}
