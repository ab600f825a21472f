use anyhow::{bail, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::envelope::SyncEnvelope;
use super::transport::BroadcastTransport;
use crate::chat::Message;

/// Best-effort link carrying whole-message snapshots between tabs
///
/// Without a transport the channel is detached: publishing does nothing and
/// nothing is ever received, so a lone tab behaves exactly like a connected
/// one from its own point of view.
pub struct SyncChannel {
    name: String,
    origin: Uuid,
    transport: Option<Arc<dyn BroadcastTransport>>,
    receiver: Mutex<Option<JoinHandle<()>>>,
    subscribed: AtomicBool,
    closed: AtomicBool,
}

impl SyncChannel {
    pub fn open(name: &str, transport: Arc<dyn BroadcastTransport>) -> Self {
        info!("Opening sync channel {} over {}", name, transport.name());
        Self::build(name, Some(transport))
    }

    /// A channel with no transport behind it
    pub fn detached(name: &str) -> Self {
        info!("Opening detached sync channel {}", name);
        Self::build(name, None)
    }

    fn build(name: &str, transport: Option<Arc<dyn BroadcastTransport>>) -> Self {
        Self {
            name: name.to_string(),
            origin: Uuid::new_v4(),
            transport,
            receiver: Mutex::new(None),
            subscribed: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    /// Broadcast a snapshot to every other tab; never fails
    pub async fn publish(&self, message: &Message) {
        if self.closed.load(Ordering::SeqCst) {
            debug!("Channel {} closed, not publishing {}", self.name, message.id);
            return;
        }
        let Some(transport) = &self.transport else {
            return;
        };

        let envelope = SyncEnvelope::new(&self.name, self.origin, message.clone());
        let payload = match serde_json::to_vec(&envelope) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Failed to encode snapshot {}: {}", message.id, e);
                return;
            }
        };

        match transport.publish(payload).await {
            Ok(()) => debug!("Published {} on {}", message.id, self.name),
            Err(e) => warn!("Failed to publish {} on {}: {:#}", message.id, self.name, e),
        }
    }

    /// Register the one handler for snapshots from other tabs
    ///
    /// The handler runs on a single receive task, one snapshot at a time.
    pub async fn on_receive<F>(&self, mut handler: F) -> Result<()>
    where
        F: FnMut(Message) + Send + 'static,
    {
        if self.closed.load(Ordering::SeqCst) {
            bail!("Sync channel {} is closed", self.name);
        }
        if self.subscribed.swap(true, Ordering::SeqCst) {
            bail!("Sync channel {} already has a receive handler", self.name);
        }
        let Some(transport) = &self.transport else {
            debug!("Channel {} is detached; nothing will be received", self.name);
            return Ok(());
        };

        let mut rx = match transport.subscribe().await {
            Ok(rx) => rx,
            Err(e) => {
                self.subscribed.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        let name = self.name.clone();
        let origin = self.origin;
        let receiver = tokio::spawn(async move {
            while let Some(payload) = rx.recv().await {
                let envelope = match serde_json::from_slice::<SyncEnvelope>(&payload) {
                    Ok(envelope) => envelope,
                    Err(e) => {
                        warn!("Failed to parse snapshot on {}: {}", name, e);
                        continue;
                    }
                };

                if envelope.origin == origin || envelope.channel != name {
                    continue;
                }

                debug!("Received {} on {}", envelope.message.id, name);
                handler(envelope.message);
            }

            debug!("Receive task for {} stopped", name);
        });

        *self.receiver.lock() = Some(receiver);
        Ok(())
    }

    /// Stop delivery; only the first call has any effect
    pub async fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            debug!("Sync channel {} already closed", self.name);
            return false;
        }

        info!("Closing sync channel {}", self.name);

        if let Some(receiver) = self.receiver.lock().take() {
            receiver.abort();
        }
        if let Some(transport) = &self.transport {
            if let Err(e) = transport.close().await {
                warn!("Failed to close {}: {:#}", transport.name(), e);
            }
        }
        true
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn is_detached(&self) -> bool {
        self.transport.is_none()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifies this tab in published envelopes
    pub fn origin(&self) -> Uuid {
        self.origin
    }
}

impl Drop for SyncChannel {
    fn drop(&mut self) {
        if let Some(receiver) = self.receiver.get_mut().take() {
            receiver.abort();
        }
    }
}
