// Shared fakes for integration tests
//
// FakeGateway answers translation calls without a network; ScriptedDevice
// hands out a fixed list of frames and counts acquisitions and releases.

#![allow(dead_code)]

use lingo_bridge::audio::AudioFrame;
use lingo_bridge::config::RecordingConfig;
use lingo_bridge::{
    AudioPayload, CaptureDevice, ChatController, ChatError, ChatResult, LocalHub,
    RecordingSession, Role, SyncChannel, TimedPlayer, Translation, TranslationGateway,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

pub const CHANNEL: &str = "test-chat";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    Text(String, Role),
    Audio(usize, Role),
}

enum Reply {
    Echo,
    Fixed(Translation),
    Fail,
}

pub struct FakeGateway {
    reply: Reply,
    hold: Option<Arc<Notify>>,
    calls: Mutex<Vec<GatewayCall>>,
}

impl FakeGateway {
    /// Transcription is the input, translation is tagged with the peer role
    pub fn echo() -> Arc<Self> {
        Arc::new(Self::build(Reply::Echo, None))
    }

    pub fn fixed(transcription: &str, translation: &str) -> Arc<Self> {
        Arc::new(Self::build(
            Reply::Fixed(Translation {
                transcription: transcription.to_string(),
                translation: translation.to_string(),
            }),
            None,
        ))
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self::build(Reply::Fail, None))
    }

    /// Echo gateway whose calls wait until the returned `Notify` fires
    pub fn held() -> (Arc<Self>, Arc<Notify>) {
        let release = Arc::new(Notify::new());
        (
            Arc::new(Self::build(Reply::Echo, Some(Arc::clone(&release)))),
            release,
        )
    }

    fn build(reply: Reply, hold: Option<Arc<Notify>>) -> Self {
        Self {
            reply,
            hold,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().clone()
    }

    async fn answer(&self, input: &str, source: Role) -> ChatResult<Translation> {
        if let Some(hold) = &self.hold {
            hold.notified().await;
        }
        match &self.reply {
            Reply::Echo => Ok(Translation {
                transcription: input.to_string(),
                translation: format!("[{}] {}", source.peer(), input),
            }),
            Reply::Fixed(translation) => Ok(translation.clone()),
            Reply::Fail => Err(ChatError::TranslationFailed("upstream 503".to_string())),
        }
    }
}

#[async_trait::async_trait]
impl TranslationGateway for FakeGateway {
    async fn translate_text(&self, text: &str, source: Role) -> ChatResult<Translation> {
        self.calls
            .lock()
            .push(GatewayCall::Text(text.to_string(), source));
        self.answer(text, source).await
    }

    async fn translate_audio(&self, audio: &AudioPayload, source: Role) -> ChatResult<Translation> {
        self.calls
            .lock()
            .push(GatewayCall::Audio(audio.bytes.len(), source));
        self.answer("voice note", source).await
    }
}

pub struct ScriptedDevice {
    frames: Vec<AudioFrame>,
    available: bool,
    acquire_delay: Option<Duration>,
    capturing: AtomicBool,
    acquisitions: AtomicUsize,
    releases: AtomicUsize,
    feed: Mutex<Option<mpsc::Sender<AudioFrame>>>,
}

impl ScriptedDevice {
    pub fn with_frames(frames: Vec<AudioFrame>) -> Arc<Self> {
        Arc::new(Self {
            frames,
            available: true,
            acquire_delay: None,
            capturing: AtomicBool::new(false),
            acquisitions: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
            feed: Mutex::new(None),
        })
    }

    /// Device that delivers `count` frames of 1600 samples (100ms at 16kHz)
    pub fn speaking(count: usize) -> Arc<Self> {
        Self::with_frames((0..count).map(|i| frame(1600, i as u64 * 100)).collect())
    }

    /// Like `speaking`, but each acquire takes `delay` to open the device
    pub fn slow(count: usize, delay: Duration) -> Arc<Self> {
        let mut device = Self::speaking(count);
        if let Some(device) = Arc::get_mut(&mut device) {
            device.acquire_delay = Some(delay);
        }
        device
    }

    pub fn unavailable() -> Arc<Self> {
        Arc::new(Self {
            frames: Vec::new(),
            available: false,
            acquire_delay: None,
            capturing: AtomicBool::new(false),
            acquisitions: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
            feed: Mutex::new(None),
        })
    }

    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl CaptureDevice for ScriptedDevice {
    async fn acquire(&self) -> ChatResult<mpsc::Receiver<AudioFrame>> {
        if let Some(delay) = self.acquire_delay {
            tokio::time::sleep(delay).await;
        }
        if !self.available {
            return Err(ChatError::DeviceUnavailable("permission denied".to_string()));
        }

        let (tx, rx) = mpsc::channel(self.frames.len() + 1);
        for frame in &self.frames {
            tx.try_send(frame.clone())
                .expect("channel sized for all frames");
        }

        // The sender stays open until release, like a live microphone
        *self.feed.lock() = Some(tx);
        self.capturing.store(true, Ordering::SeqCst);
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        Ok(rx)
    }

    fn release(&self) {
        self.feed.lock().take();
        self.capturing.store(false, Ordering::SeqCst);
        self.releases.fetch_add(1, Ordering::SeqCst);
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub fn frame(samples: usize, timestamp_ms: u64) -> AudioFrame {
    AudioFrame {
        samples: (0..samples).map(|i| (i % 512) as i16).collect(),
        sample_rate: 16000,
        channels: 1,
        timestamp_ms,
    }
}

pub fn recorder(device: Arc<ScriptedDevice>) -> RecordingSession {
    RecordingSession::new(RecordingConfig::default(), device)
}

/// Open a tab; with a hub it syncs with every other tab on that hub
pub async fn open_tab(
    hub: Option<&LocalHub>,
    role: Role,
    gateway: Arc<FakeGateway>,
    device: Arc<ScriptedDevice>,
) -> ChatController {
    let channel = match hub {
        Some(hub) => SyncChannel::open(CHANNEL, Arc::new(hub.transport(CHANNEL))),
        None => SyncChannel::detached(CHANNEL),
    };

    ChatController::open(
        role,
        channel,
        gateway,
        recorder(device),
        Arc::new(TimedPlayer::new()),
    )
    .await
}

/// Poll `condition` until it holds or two seconds pass
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
