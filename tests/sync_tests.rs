// Integration tests for cross-tab synchronization
//
// Two stores joined by SyncChannels on one LocalHub, the way two browser
// tabs of the same conversation would be.

mod common;

use anyhow::Result;
use common::{eventually, CHANNEL};
use lingo_bridge::sync::SyncEnvelope;
use lingo_bridge::{BroadcastTransport, LocalHub, Message, MessageStore, Role, SyncChannel};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

struct Tab {
    store: Arc<Mutex<MessageStore>>,
    channel: SyncChannel,
}

impl Tab {
    async fn open(hub: &LocalHub) -> Result<Self> {
        let store = Arc::new(Mutex::new(MessageStore::new()));
        let channel = SyncChannel::open(CHANNEL, Arc::new(hub.transport(CHANNEL)));

        let inbox = Arc::clone(&store);
        channel
            .on_receive(move |message| inbox.lock().merge(message))
            .await?;

        Ok(Self { store, channel })
    }

    async fn send(&self, sender: Role, original: &str, translated: &str) -> Message {
        let message = self.store.lock().create(sender, original, translated, None);
        self.channel.publish(&message).await;
        message
    }

    async fn react(&self, message: &Message, emoji: &str, role: Role) -> Result<Message> {
        let updated = self.store.lock().toggle_reaction(&message.id, emoji, role)?;
        self.channel.publish(&updated).await;
        Ok(updated)
    }

    fn ids(&self) -> BTreeSet<String> {
        self.store
            .lock()
            .snapshot()
            .iter()
            .map(|m| m.id.to_string())
            .collect()
    }

    fn len(&self) -> usize {
        self.store.lock().len()
    }

    fn get(&self, message: &Message) -> Option<Message> {
        self.store.lock().get(&message.id).cloned()
    }
}

#[tokio::test]
async fn test_tabs_converge_on_same_messages() -> Result<()> {
    let hub = LocalHub::new();
    let left = Tab::open(&hub).await?;
    let right = Tab::open(&hub).await?;

    let hello = left.send(Role::A, "Hello", "Hola").await;
    let reply = right.send(Role::B, "¿Qué tal?", "How are you?").await;
    left.send(Role::A, "Good", "Bien").await;

    assert!(eventually(|| left.len() == 3 && right.len() == 3).await);
    assert_eq!(left.ids(), right.ids());

    let seen = right.get(&hello).expect("hello merged on the right");
    assert_eq!(seen.sender, hello.sender);
    assert_eq!(seen.original_text, hello.original_text);
    assert_eq!(seen.translated_text, hello.translated_text);
    assert_eq!(seen.timestamp, hello.timestamp);

    let seen = left.get(&reply).expect("reply merged on the left");
    assert_eq!(seen.original_text, "¿Qué tal?");
    Ok(())
}

#[tokio::test]
async fn test_reactions_propagate() -> Result<()> {
    let hub = LocalHub::new();
    let left = Tab::open(&hub).await?;
    let right = Tab::open(&hub).await?;

    let hello = left.send(Role::A, "Hello", "Hola").await;
    assert!(eventually(|| right.get(&hello).is_some()).await);

    right.react(&hello, "❤️", Role::B).await?;
    assert!(eventually(|| {
        left.get(&hello)
            .is_some_and(|m| m.has_reaction("❤️", Role::B))
    })
    .await);

    right.react(&hello, "❤️", Role::B).await?;
    assert!(eventually(|| left.get(&hello).is_some_and(|m| m.reactions.is_empty())).await);
    Ok(())
}

#[tokio::test]
async fn test_own_publications_are_not_merged_back() -> Result<()> {
    let hub = LocalHub::new();
    let tab = Tab::open(&hub).await?;
    let listener = Tab::open(&hub).await?;

    tab.send(Role::A, "Hello", "Hola").await;
    assert!(eventually(|| listener.len() == 1).await);

    // Give a stray echo time to land
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(tab.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_detached_channel_is_silent() -> Result<()> {
    let hub = LocalHub::new();
    let connected = Tab::open(&hub).await?;

    let store = Arc::new(Mutex::new(MessageStore::new()));
    let detached = SyncChannel::detached(CHANNEL);
    let inbox = Arc::clone(&store);
    detached
        .on_receive(move |message| inbox.lock().merge(message))
        .await?;
    assert!(detached.is_detached());

    let message = store.lock().create(Role::B, "Hola", "Hello", None);
    detached.publish(&message).await;
    connected.send(Role::A, "Hello", "Hola").await;

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(store.lock().len(), 1);
    assert_eq!(connected.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_second_handler_is_rejected() -> Result<()> {
    let hub = LocalHub::new();
    let tab = Tab::open(&hub).await?;

    let result = tab.channel.on_receive(|_| {}).await;

    assert!(result.is_err());
    Ok(())
}

#[tokio::test]
async fn test_close_stops_delivery() -> Result<()> {
    let hub = LocalHub::new();
    let left = Tab::open(&hub).await?;
    let right = Tab::open(&hub).await?;

    assert!(right.channel.close().await);
    assert!(!right.channel.close().await);
    assert!(right.channel.is_closed());

    left.send(Role::A, "Hello", "Hola").await;
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(right.len(), 0);

    // A closed channel publishes nothing either
    right.send(Role::B, "Hola", "Hello").await;
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(left.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_malformed_payload_is_skipped() -> Result<()> {
    let hub = LocalHub::new();
    let tab = Tab::open(&hub).await?;
    let raw = hub.transport(CHANNEL);

    raw.publish(b"not json".to_vec()).await?;
    raw.publish(br#"{"channel":"test-chat"}"#.to_vec()).await?;

    let sender = Tab::open(&hub).await?;
    sender.send(Role::A, "Hello", "Hola").await;

    assert!(eventually(|| tab.len() == 1).await);
    Ok(())
}

#[tokio::test]
async fn test_foreign_channel_name_is_ignored() -> Result<()> {
    let hub = LocalHub::new();
    let tab = Tab::open(&hub).await?;
    let raw = hub.transport(CHANNEL);

    let stray = MessageStore::new().create(Role::A, "Hello", "Hola", None);
    let envelope = SyncEnvelope::new("another-chat", Uuid::new_v4(), stray);
    raw.publish(serde_json::to_vec(&envelope)?).await?;

    let sender = Tab::open(&hub).await?;
    let hello = sender.send(Role::A, "Hi", "Hola").await;

    assert!(eventually(|| tab.get(&hello).is_some()).await);
    assert_eq!(tab.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_late_tab_sees_only_new_messages() -> Result<()> {
    let hub = LocalHub::new();
    let early = Tab::open(&hub).await?;
    early.send(Role::A, "Before", "Antes").await;

    let late = Tab::open(&hub).await?;
    let after = early.send(Role::A, "After", "Después").await;

    assert!(eventually(|| late.get(&after).is_some()).await);
    assert_eq!(late.len(), 1);
    Ok(())
}
