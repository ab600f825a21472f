use anyhow::{Context, Result};
use hound::WavReader;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::backend::{AudioFrame, CaptureDevice};
use crate::error::{ChatError, ChatResult};

/// Decoded contents of a WAV file
pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path).context("Failed to open WAV file")?;

        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let duration_seconds =
            samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64);

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }
}

/// Marks the device busy until dropped, unless kept
struct CaptureClaim<'a> {
    capturing: &'a AtomicBool,
    kept: bool,
}

impl CaptureClaim<'_> {
    fn keep(mut self) {
        self.kept = true;
    }
}

impl Drop for CaptureClaim<'_> {
    fn drop(&mut self) {
        if !self.kept {
            self.capturing.store(false, Ordering::SeqCst);
        }
    }
}

/// Capture device that replays a WAV file at real-time pace
pub struct FileDevice {
    path: PathBuf,
    buffer_duration_ms: u64,
    capturing: Arc<AtomicBool>,
    feeder: Mutex<Option<JoinHandle<()>>>,
    name: String,
}

impl FileDevice {
    pub fn new(path: PathBuf, buffer_duration_ms: u64) -> Self {
        let name = format!("file:{}", path.display());
        Self {
            path,
            buffer_duration_ms: buffer_duration_ms.max(1),
            capturing: Arc::new(AtomicBool::new(false)),
            feeder: Mutex::new(None),
            name,
        }
    }
}

#[async_trait::async_trait]
impl CaptureDevice for FileDevice {
    async fn acquire(&self) -> ChatResult<mpsc::Receiver<AudioFrame>> {
        if self.capturing.swap(true, Ordering::SeqCst) {
            return Err(ChatError::DeviceUnavailable(format!(
                "{} is already in use",
                self.name
            )));
        }

        // Released again if loading fails or this future is dropped
        let claim = CaptureClaim {
            capturing: &self.capturing,
            kept: false,
        };

        let path = self.path.clone();
        let audio = match tokio::task::spawn_blocking(move || AudioFile::open(path)).await {
            Ok(Ok(audio)) => audio,
            Ok(Err(e)) => return Err(ChatError::DeviceUnavailable(format!("{:#}", e))),
            Err(e) => {
                return Err(ChatError::DeviceUnavailable(format!(
                    "loader task failed: {}",
                    e
                )))
            }
        };
        claim.keep();

        info!(
            "Capturing from {} ({:.1}s, {}Hz, {} channels)",
            self.name, audio.duration_seconds, audio.sample_rate, audio.channels
        );

        let (tx, rx) = mpsc::channel(100);
        let capturing = Arc::clone(&self.capturing);
        let buffer_duration_ms = self.buffer_duration_ms;

        let feeder = tokio::spawn(async move {
            let samples_per_frame = (audio.sample_rate as u64 * buffer_duration_ms / 1000)
                .max(1) as usize
                * audio.channels as usize;
            let mut ticker = tokio::time::interval(Duration::from_millis(buffer_duration_ms));

            for (index, chunk) in audio.samples.chunks(samples_per_frame).enumerate() {
                ticker.tick().await;
                if !capturing.load(Ordering::SeqCst) {
                    break;
                }

                let frame = AudioFrame {
                    samples: chunk.to_vec(),
                    sample_rate: audio.sample_rate,
                    channels: audio.channels,
                    timestamp_ms: index as u64 * buffer_duration_ms,
                };
                if tx.send(frame).await.is_err() {
                    break;
                }
            }

            debug!("File capture feeder finished");
        });

        *self.feeder.lock() = Some(feeder);
        Ok(rx)
    }

    fn release(&self) {
        if self.capturing.swap(false, Ordering::SeqCst) {
            debug!("Releasing {}", self.name);
        }
        if let Some(feeder) = self.feeder.lock().take() {
            feeder.abort();
        }
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_wav(path: &Path, samples: &[i16], sample_rate: u32) -> Result<()> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        Ok(())
    }

    #[test]
    fn test_audio_file_open() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("clip.wav");
        write_wav(&path, &vec![7i16; 16000], 16000)?;

        let audio = AudioFile::open(&path)?;
        assert_eq!(audio.sample_rate, 16000);
        assert_eq!(audio.channels, 1);
        assert_eq!(audio.samples.len(), 16000);
        assert!((audio.duration_seconds - 1.0).abs() < 0.001);
        assert!(audio.path.contains("clip.wav"));
        Ok(())
    }

    #[tokio::test]
    async fn test_file_device_streams_all_samples() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("clip.wav");
        write_wav(&path, &vec![1i16; 800], 8000)?;

        // 10ms frames at 8kHz = 80 samples each
        let device = FileDevice::new(path, 10);
        let mut rx = device.acquire().await?;
        assert!(device.is_capturing());

        let mut total = 0;
        let mut frames = 0;
        while let Some(frame) = rx.recv().await {
            assert_eq!(frame.sample_rate, 8000);
            total += frame.samples.len();
            frames += 1;
        }
        assert_eq!(total, 800);
        assert_eq!(frames, 10);

        device.release();
        assert!(!device.is_capturing());
        Ok(())
    }

    #[tokio::test]
    async fn test_file_device_missing_file() {
        let device = FileDevice::new(PathBuf::from("/nonexistent/clip.wav"), 100);

        let result = device.acquire().await;
        assert!(matches!(result, Err(ChatError::DeviceUnavailable(_))));
        assert!(!device.is_capturing());
    }

    #[tokio::test]
    async fn test_file_device_is_exclusive() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("clip.wav");
        write_wav(&path, &vec![0i16; 16000], 16000)?;

        let device = FileDevice::new(path, 100);
        let _rx = device.acquire().await?;
        assert!(matches!(
            device.acquire().await,
            Err(ChatError::DeviceUnavailable(_))
        ));

        device.release();
        let _rx = device.acquire().await?;
        device.release();
        Ok(())
    }

    #[tokio::test]
    async fn test_dropped_acquire_frees_device() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("clip.wav");
        write_wav(&path, &vec![0i16; 160000], 16000)?;

        let device = FileDevice::new(path, 100);
        match tokio::time::timeout(Duration::ZERO, device.acquire()).await {
            // Dropped while the file was loading
            Err(_) => assert!(!device.is_capturing()),
            Ok(acquired) => {
                acquired?;
                device.release();
            }
        }

        let _rx = device.acquire().await?;
        assert!(device.is_capturing());
        device.release();
        Ok(())
    }
}
