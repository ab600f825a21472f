use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::store::MessageStore;
use super::types::{AudioRef, Message, MessageId, Role};
use crate::error::{ChatError, ChatResult};
use crate::playback::AudioPlayer;
use crate::recording::{RecordingSession, RecordingState};
use crate::sync::SyncChannel;
use crate::translation::{Translation, TranslationGateway};

const MAX_NOTICES: usize = 50;

/// User-visible notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub at: DateTime<Utc>,
    pub text: String,
}

/// Snapshot of the controller's transient UI state
#[derive(Debug, Clone, Serialize)]
pub struct ControllerStatus {
    pub role: Role,
    pub is_processing: bool,
    pub recording: RecordingState,
    pub elapsed_secs: u64,
    pub input: String,
    pub reaction_picker: Option<MessageId>,
    pub playing: Option<MessageId>,
    pub message_count: usize,
    pub channel_closed: bool,
}

/// Marks a send as in flight; cleared when dropped
struct ProcessingGuard<'a>(&'a AtomicBool);

impl<'a> ProcessingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Claim on voice input; given back on drop unless kept
struct RecordingClaim<'a> {
    flag: &'a AtomicBool,
    kept: bool,
}

impl<'a> RecordingClaim<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        (!flag.swap(true, Ordering::SeqCst)).then(|| Self { flag, kept: false })
    }

    fn keep(mut self) {
        self.kept = true;
    }
}

impl Drop for RecordingClaim<'_> {
    fn drop(&mut self) {
        if !self.kept {
            self.flag.store(false, Ordering::SeqCst);
        }
    }
}

/// One tab of the conversation
///
/// Turns user intent into translation calls, store updates and broadcasts.
/// Apart from the store it only holds transient UI flags.
pub struct ChatController {
    role: Role,
    store: Arc<Mutex<MessageStore>>,
    channel: SyncChannel,
    gateway: Arc<dyn TranslationGateway>,
    recorder: RecordingSession,
    player: Arc<dyn AudioPlayer>,
    input: Mutex<String>,
    processing: AtomicBool,
    /// Set while voice input owns the input area
    recording: AtomicBool,
    reaction_picker: Mutex<Option<MessageId>>,
    playing: Arc<Mutex<Option<MessageId>>>,
    notices: Mutex<VecDeque<Notice>>,
}

impl ChatController {
    /// Mount the chat view: subscribe the store to snapshots from other tabs
    pub async fn open(
        role: Role,
        channel: SyncChannel,
        gateway: Arc<dyn TranslationGateway>,
        recorder: RecordingSession,
        player: Arc<dyn AudioPlayer>,
    ) -> Self {
        let store = Arc::new(Mutex::new(MessageStore::new()));

        let inbox = Arc::clone(&store);
        if let Err(e) = channel
            .on_receive(move |message| inbox.lock().merge(message))
            .await
        {
            warn!(
                "Sync unavailable on {}, continuing as a single tab: {:#}",
                channel.name(),
                e
            );
        }

        info!("Chat view opened as role {} on {}", role, channel.name());

        Self {
            role,
            store,
            channel,
            gateway,
            recorder,
            player,
            input: Mutex::new(String::new()),
            processing: AtomicBool::new(false),
            recording: AtomicBool::new(false),
            reaction_picker: Mutex::new(None),
            playing: Arc::new(Mutex::new(None)),
            notices: Mutex::new(VecDeque::new()),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Replace the text draft; refused while a recording is active
    pub fn set_input(&self, text: &str) -> bool {
        let mut input = self.input.lock();
        if self.recording.load(Ordering::SeqCst) {
            warn!("Text input refused while recording");
            return false;
        }
        *input = text.to_string();
        true
    }

    pub fn input(&self) -> String {
        self.input.lock().clone()
    }

    /// Translate the current draft and post it
    ///
    /// `Ok(None)` means the send was refused: blank draft, another send in
    /// flight, or a recording in progress.
    pub async fn send_text(&self) -> ChatResult<Option<Message>> {
        let Some(_guard) = ProcessingGuard::acquire(&self.processing) else {
            warn!("Send refused: another send is in flight");
            return Ok(None);
        };

        let text = {
            let mut input = self.input.lock();
            if self.recording.load(Ordering::SeqCst) {
                warn!("Send refused: recording in progress");
                return Ok(None);
            }
            let text = input.trim().to_string();
            if text.is_empty() {
                return Ok(None);
            }
            input.clear();
            text
        };

        let translation = match self.gateway.translate_text(&text, self.role).await {
            Ok(translation) => translation,
            Err(e) => {
                self.notify(e.user_message());
                return Err(e);
            }
        };

        let message = self.post(translation, &text, None).await;
        Ok(Some(message))
    }

    /// Begin voice input
    ///
    /// Returns false when refused: draft not empty, a send in flight, or
    /// already recording.
    pub async fn start_recording(&self) -> ChatResult<bool> {
        let claim = {
            let input = self.input.lock();
            if !input.trim().is_empty() {
                warn!("Recording refused: text input is not empty");
                return Ok(false);
            }
            if self.processing.load(Ordering::SeqCst) {
                warn!("Recording refused: a send is in flight");
                return Ok(false);
            }
            match RecordingClaim::acquire(&self.recording) {
                Some(claim) => claim,
                None => {
                    warn!("Recording refused: already recording");
                    return Ok(false);
                }
            }
        };

        // Dropping the claim (error or cancelled start) re-enables text input
        match self.recorder.start().await {
            Ok(()) => {
                claim.keep();
                Ok(true)
            }
            Err(e) => {
                drop(claim);
                self.notify(e.user_message());
                Err(e)
            }
        }
    }

    /// Finish voice input, translate the clip and post it
    pub async fn stop_recording(&self) -> ChatResult<Option<Message>> {
        let Some(_guard) = ProcessingGuard::acquire(&self.processing) else {
            warn!("Stop refused: a send is in flight");
            return Ok(None);
        };

        let stopped = self.recorder.stop().await;
        self.recording.store(false, Ordering::SeqCst);

        let payload = match stopped {
            Ok(payload) => payload,
            Err(ChatError::NoActiveRecording) => return Err(ChatError::NoActiveRecording),
            Err(e) => {
                self.notify(e.user_message());
                return Err(e);
            }
        };

        if payload.is_empty() {
            self.notify("Nothing was recorded.".to_string());
            return Ok(None);
        }

        let audio = payload.to_audio_ref();
        let translation = match self.gateway.translate_audio(&payload, self.role).await {
            Ok(translation) => translation,
            Err(e) => {
                self.notify(e.user_message());
                return Err(e);
            }
        };

        let message = self.post(translation, "", Some(audio)).await;
        Ok(Some(message))
    }

    /// Add or remove this tab's `emoji` reaction and share the result
    ///
    /// Unknown ids are ignored: the message may not have been merged yet.
    pub async fn toggle_reaction(&self, id: &MessageId, emoji: &str) -> Option<Message> {
        self.reaction_picker.lock().take();

        if emoji.trim().is_empty() {
            return None;
        }

        let toggled = self.store.lock().toggle_reaction(id, emoji, self.role);
        match toggled {
            Ok(message) => {
                self.channel.publish(&message).await;
                Some(message)
            }
            Err(e) => {
                debug!("Ignoring reaction: {}", e);
                None
            }
        }
    }

    /// Open the reaction picker on a message, or close it if already open there
    pub fn toggle_reaction_picker(&self, id: &MessageId) -> Option<MessageId> {
        let mut picker = self.reaction_picker.lock();
        if picker.as_ref() == Some(id) {
            *picker = None;
        } else {
            *picker = Some(id.clone());
        }
        picker.clone()
    }

    /// Play a voice message, or pause it if it is the one playing
    ///
    /// Returns whether the message is playing afterwards.
    pub async fn toggle_playback(&self, id: &MessageId) -> ChatResult<bool> {
        let audio = {
            let store = self.store.lock();
            let message = store.get(id).ok_or_else(|| ChatError::NotFound(id.clone()))?;
            message.audio.clone()
        };
        let Some(audio) = audio else {
            debug!("Message {} has no audio", id);
            return Ok(false);
        };

        let already_playing = self.playing.lock().as_ref() == Some(id);
        if already_playing {
            if let Err(e) = self.player.pause().await {
                warn!("Failed to pause playback: {:#}", e);
            }
            self.playing.lock().take();
            return Ok(false);
        }

        let ended = match self.player.play(&audio).await {
            Ok(ended) => ended,
            Err(e) => {
                warn!("Failed to play {}: {:#}", id, e);
                self.notify("This voice message could not be played.".to_string());
                return Ok(false);
            }
        };

        *self.playing.lock() = Some(id.clone());

        let playing = Arc::clone(&self.playing);
        let id = id.clone();
        tokio::spawn(async move {
            if ended.await.is_ok() {
                let mut playing = playing.lock();
                if playing.as_ref() == Some(&id) {
                    *playing = None;
                }
            }
        });

        Ok(true)
    }

    /// Render-ready session log
    pub fn messages(&self) -> Arc<[Message]> {
        self.store.lock().snapshot()
    }

    pub fn status(&self) -> ControllerStatus {
        ControllerStatus {
            role: self.role,
            is_processing: self.processing.load(Ordering::SeqCst),
            recording: self.recorder.state(),
            elapsed_secs: self.recorder.elapsed_secs(),
            input: self.input.lock().clone(),
            reaction_picker: self.reaction_picker.lock().clone(),
            playing: self.playing.lock().clone(),
            message_count: self.store.lock().len(),
            channel_closed: self.channel.is_closed(),
        }
    }

    pub fn recorder(&self) -> &RecordingSession {
        &self.recorder
    }

    /// Drain pending notices, oldest first
    pub fn take_notices(&self) -> Vec<Notice> {
        self.notices.lock().drain(..).collect()
    }

    /// Unmount the chat view
    ///
    /// Abandons any recording in progress, stops playback and closes the
    /// channel. Returns false if the view was already closed.
    pub async fn close(&self) -> bool {
        if self.recording.swap(false, Ordering::SeqCst) {
            match self.recorder.stop().await {
                Ok(payload) => info!("Discarded {:.1}s recording on close", payload.duration_secs),
                Err(e) => warn!("Failed to stop recording on close: {}", e),
            }
        }

        if self.playing.lock().take().is_some() {
            if let Err(e) = self.player.pause().await {
                warn!("Failed to stop playback on close: {:#}", e);
            }
        }

        self.channel.close().await
    }

    /// Append locally first, then tell the other tabs
    async fn post(&self, translation: Translation, typed: &str, audio: Option<AudioRef>) -> Message {
        let original = if translation.transcription.trim().is_empty() {
            typed.to_string()
        } else {
            translation.transcription
        };

        let message = self
            .store
            .lock()
            .create(self.role, original, translation.translation, audio);
        self.channel.publish(&message).await;

        let kind = if message.is_voice() { "voice" } else { "text" };
        info!("Posted {} message {}", kind, message.id);
        message
    }

    fn notify(&self, text: String) {
        warn!("Notice: {}", text);
        let mut notices = self.notices.lock();
        if notices.len() == MAX_NOTICES {
            notices.pop_front();
        }
        notices.push_back(Notice {
            at: Utc::now(),
            text,
        });
    }
}
