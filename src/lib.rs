pub mod access;
pub mod audio;
pub mod chat;
pub mod config;
pub mod error;
pub mod http;
pub mod playback;
pub mod recording;
pub mod sync;
pub mod translation;

pub use access::{AccessGate, Invite};
pub use audio::{AudioFrame, AudioPayload, AudioSource, CaptureDevice, CaptureDeviceFactory};
pub use chat::{
    AudioRef, ChatController, ControllerStatus, LanguagePair, Message, MessageId, MessageStore,
    Notice, Reaction, Role,
};
pub use config::Config;
pub use error::{ChatError, ChatResult};
pub use http::{create_router, AppState};
pub use playback::{AudioPlayer, TimedPlayer};
pub use recording::{RecordingSession, RecordingState};
pub use sync::{BroadcastTransport, LocalHub, NatsTransport, SyncChannel};
pub use translation::{HttpTranslationGateway, Translation, TranslationGateway};
