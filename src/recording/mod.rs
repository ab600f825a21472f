//! Voice capture
//!
//! `RecordingSession` drives one capture device through
//! `Idle -> Recording -> Finalizing -> Idle` and hands back a WAV clip.

mod session;

pub use session::{RecordingSession, RecordingState};
