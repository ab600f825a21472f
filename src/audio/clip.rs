use anyhow::{bail, Context, Result};
use std::io::Cursor;
use tracing::warn;

use super::backend::AudioFrame;
use crate::chat::AudioRef;

/// Accumulates captured frames up to a fixed length
#[derive(Debug)]
pub struct ClipBuffer {
    samples: Vec<i16>,
    max_samples: usize,
    sample_rate: u32,
    channels: u16,
    truncated: bool,
}

impl ClipBuffer {
    pub fn new(sample_rate: u32, channels: u16, max_duration_secs: u64) -> Self {
        Self {
            samples: Vec::new(),
            max_samples: max_duration_secs as usize * sample_rate as usize * channels as usize,
            sample_rate,
            channels,
            truncated: false,
        }
    }

    /// Append a frame; returns false once the clip is full
    ///
    /// The first frame decides the clip format.
    pub fn push(&mut self, frame: &AudioFrame) -> bool {
        if self.samples.is_empty() && !self.truncated {
            if frame.sample_rate != self.sample_rate || frame.channels != self.channels {
                let seconds = self.max_samples
                    / (self.sample_rate as usize * self.channels as usize).max(1);
                self.sample_rate = frame.sample_rate;
                self.channels = frame.channels;
                self.max_samples = seconds * frame.sample_rate as usize * frame.channels as usize;
            }
        } else if frame.sample_rate != self.sample_rate || frame.channels != self.channels {
            warn!(
                "Dropping frame with mismatched format ({}Hz/{}ch, clip is {}Hz/{}ch)",
                frame.sample_rate, frame.channels, self.sample_rate, self.channels
            );
            return true;
        }

        let room = self.max_samples.saturating_sub(self.samples.len());
        if frame.samples.len() > room {
            self.samples.extend_from_slice(&frame.samples[..room]);
            self.truncated = true;
            return false;
        }

        self.samples.extend_from_slice(&frame.samples);
        self.samples.len() < self.max_samples
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Encode the accumulated samples as a 16-bit PCM WAV file
    pub fn finish(self) -> Result<AudioPayload> {
        let spec = hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer =
                hound::WavWriter::new(&mut cursor, spec).context("Failed to create WAV writer")?;
            for &sample in &self.samples {
                writer
                    .write_sample(sample)
                    .context("Failed to write sample to WAV")?;
            }
            writer.finalize().context("Failed to finalize WAV data")?;
        }

        let duration_secs =
            self.samples.len() as f64 / (self.sample_rate as f64 * self.channels as f64);

        Ok(AudioPayload {
            bytes: cursor.into_inner(),
            sample_rate: self.sample_rate,
            channels: self.channels,
            sample_count: self.samples.len(),
            duration_secs,
        })
    }
}

/// A finished recording, encoded as WAV
#[derive(Debug, Clone, PartialEq)]
pub struct AudioPayload {
    pub bytes: Vec<u8>,
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_count: usize,
    pub duration_secs: f64,
}

impl AudioPayload {
    pub fn is_empty(&self) -> bool {
        self.sample_count == 0
    }

    pub fn mime_type(&self) -> &'static str {
        "audio/wav"
    }

    pub fn to_audio_ref(&self) -> AudioRef {
        AudioRef::from_wav(&self.bytes)
    }
}

/// Playback length of WAV bytes, read from the header
pub fn wav_duration_secs(bytes: &[u8]) -> Result<f64> {
    let reader = hound::WavReader::new(Cursor::new(bytes)).context("Invalid WAV data")?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        bail!("WAV header declares a sample rate of 0");
    }

    let duration = reader.duration() as f64 / spec.sample_rate as f64;
    if !duration.is_finite() {
        bail!("WAV duration is not a finite number of seconds");
    }
    Ok(duration)
}
