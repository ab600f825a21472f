use anyhow::Result;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Named-channel publish/subscribe primitive shared by all tabs
///
/// Delivery is best effort and unordered across publishers. Subscribers may
/// also see their own publications; `SyncChannel` filters those out.
#[async_trait::async_trait]
pub trait BroadcastTransport: Send + Sync {
    /// Publish one payload to every subscriber of the channel
    async fn publish(&self, payload: Vec<u8>) -> Result<()>;

    /// Start receiving payloads published on the channel
    async fn subscribe(&self) -> Result<mpsc::Receiver<Vec<u8>>>;

    /// Stop delivery to this transport's subscribers
    async fn close(&self) -> Result<()>;

    /// Get transport name for logging
    fn name(&self) -> &str;
}

/// In-process broadcast hub; every tab of one process shares it
#[derive(Clone, Default)]
pub struct LocalHub {
    channels: Arc<Mutex<HashMap<String, broadcast::Sender<Arc<Vec<u8>>>>>>,
}

impl LocalHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a transport on the named channel
    pub fn transport(&self, channel: &str) -> LocalTransport {
        let sender = self
            .channels
            .lock()
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(1024).0)
            .clone();

        LocalTransport {
            name: format!("local:{}", channel),
            sender,
            forwarders: Mutex::new(Vec::new()),
        }
    }
}

/// One tab's handle on a `LocalHub` channel
pub struct LocalTransport {
    name: String,
    sender: broadcast::Sender<Arc<Vec<u8>>>,
    forwarders: Mutex<Vec<JoinHandle<()>>>,
}

#[async_trait::async_trait]
impl BroadcastTransport for LocalTransport {
    async fn publish(&self, payload: Vec<u8>) -> Result<()> {
        // No receivers is not an error: the other tabs may simply be closed
        if self.sender.send(Arc::new(payload)).is_err() {
            debug!("No subscribers on {}", self.name);
        }
        Ok(())
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<Vec<u8>>> {
        let mut subscription = self.sender.subscribe();
        let (tx, rx) = mpsc::channel(100);
        let name = self.name.clone();

        let forwarder = tokio::spawn(async move {
            loop {
                match subscription.recv().await {
                    Ok(payload) => {
                        if tx.send(payload.as_ref().clone()).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("{} lagged, {} snapshots dropped", name, skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        self.forwarders.lock().push(forwarder);
        Ok(rx)
    }

    async fn close(&self) -> Result<()> {
        for forwarder in self.forwarders.lock().drain(..) {
            forwarder.abort();
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for LocalTransport {
    fn drop(&mut self) {
        for forwarder in self.forwarders.get_mut().drain(..) {
            forwarder.abort();
        }
    }
}
