use chrono::Utc;
use std::cell::OnceCell;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::types::{AudioRef, Message, MessageId, Reaction, Role};
use crate::error::{ChatError, ChatResult};

/// The session log of one tab
///
/// Messages are kept in local receipt order. `merge` is the only place where
/// state from other tabs enters; it replaces whole records, so two tabs
/// toggling reactions on the same message at the same time converge on
/// whichever snapshot arrives last and the other change is lost.
#[derive(Debug)]
pub struct MessageStore {
    messages: Vec<Message>,
    index: HashMap<MessageId, usize>,
    /// Distinguishes ids minted here from ids minted by other tabs
    tag: String,
    last_stamp: i64,
    snapshot: OnceCell<Arc<[Message]>>,
}

impl MessageStore {
    pub fn new() -> Self {
        let tag = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();
        Self::with_tag(tag)
    }

    pub fn with_tag(tag: impl Into<String>) -> Self {
        Self {
            messages: Vec::new(),
            index: HashMap::new(),
            tag: tag.into(),
            last_stamp: 0,
            snapshot: OnceCell::new(),
        }
    }

    /// Build a new message with empty reactions and append it
    pub fn create(
        &mut self,
        sender: Role,
        original_text: impl Into<String>,
        translated_text: impl Into<String>,
        audio: Option<AudioRef>,
    ) -> Message {
        let message = Message {
            id: self.next_id(),
            sender,
            original_text: original_text.into(),
            translated_text: translated_text.into(),
            timestamp: Utc::now(),
            reactions: Vec::new(),
            audio,
        };

        debug!("Created message {} ({})", message.id, sender);
        self.append(message.clone());
        message
    }

    /// Add the `(emoji, role)` reaction, or remove it if already present
    pub fn toggle_reaction(
        &mut self,
        id: &MessageId,
        emoji: &str,
        role: Role,
    ) -> ChatResult<Message> {
        let position = *self
            .index
            .get(id)
            .ok_or_else(|| ChatError::NotFound(id.clone()))?;

        let message = &mut self.messages[position];
        match message
            .reactions
            .iter()
            .position(|r| r.emoji == emoji && r.sender == role)
        {
            Some(existing) => {
                message.reactions.remove(existing);
            }
            None => message.reactions.push(Reaction {
                emoji: emoji.to_string(),
                sender: role,
            }),
        }

        let updated = message.clone();
        self.snapshot.take();
        Ok(updated)
    }

    /// Upsert a snapshot received from another tab
    pub fn merge(&mut self, incoming: Message) {
        match self.index.get(&incoming.id) {
            Some(&position) => {
                debug!("Merge replaced message {}", incoming.id);
                self.messages[position] = incoming;
                self.snapshot.take();
            }
            None => {
                debug!("Merge appended message {}", incoming.id);
                self.append(incoming);
            }
        }
    }

    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.index.get(id).map(|&position| &self.messages[position])
    }

    /// Render-ready view of the log, rebuilt only after a mutation
    pub fn snapshot(&self) -> Arc<[Message]> {
        self.snapshot
            .get_or_init(|| Arc::from(self.messages.as_slice()))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn append(&mut self, message: Message) {
        self.index.insert(message.id.clone(), self.messages.len());
        self.messages.push(message);
        self.snapshot.take();
    }

    /// Nanosecond timestamp, bumped so ids never repeat within this store
    fn next_id(&mut self) -> MessageId {
        let now = Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or(self.last_stamp + 1);
        let stamp = now.max(self.last_stamp + 1);
        self.last_stamp = stamp;
        MessageId::new(format!("{:020}-{}", stamp, self.tag))
    }
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}
