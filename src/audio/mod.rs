pub mod backend;
pub mod clip;
pub mod file;

pub use backend::{AudioFrame, AudioSource, CaptureDevice, CaptureDeviceFactory, NoDevice};
pub use clip::{wav_duration_secs, AudioPayload, ClipBuffer};
pub use file::{AudioFile, FileDevice};
