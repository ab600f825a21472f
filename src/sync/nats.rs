use anyhow::{Context, Result};
use async_nats::Client;
use futures::stream::StreamExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::transport::BroadcastTransport;

/// Broadcast transport over a NATS subject, for tabs in separate processes
pub struct NatsTransport {
    client: Client,
    subject: String,
    name: String,
    listeners: Mutex<Vec<JoinHandle<()>>>,
}

impl NatsTransport {
    /// Connect to NATS server
    pub async fn connect(url: &str, channel: &str) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        let subject = Self::subject_for(channel);
        Ok(Self {
            client,
            name: format!("nats:{}", subject),
            subject,
            listeners: Mutex::new(Vec::new()),
        })
    }

    pub fn subject_for(channel: &str) -> String {
        format!("lingo.sync.{}", channel)
    }
}

#[async_trait::async_trait]
impl BroadcastTransport for NatsTransport {
    async fn publish(&self, payload: Vec<u8>) -> Result<()> {
        let bytes = payload.len();
        self.client
            .publish(self.subject.clone(), payload.into())
            .await
            .context("Failed to publish snapshot")?;

        debug!("Published snapshot to {} ({} bytes)", self.subject, bytes);
        Ok(())
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<Vec<u8>>> {
        info!("Subscribing to {}", self.subject);

        let mut subscriber = self
            .client
            .subscribe(self.subject.clone())
            .await
            .context("Failed to subscribe to sync subject")?;
        let (tx, rx) = mpsc::channel(100);

        let listener = tokio::spawn(async move {
            while let Some(msg) = subscriber.next().await {
                if let Err(e) = tx.send(msg.payload.to_vec()).await {
                    error!("Failed to forward snapshot: {}", e);
                    break;
                }
            }
        });

        self.listeners.lock().push(listener);
        Ok(rx)
    }

    async fn close(&self) -> Result<()> {
        info!("Closing NATS transport {}", self.subject);
        for listener in self.listeners.lock().drain(..) {
            listener.abort();
        }
        // Push out anything still buffered before the connection is dropped
        self.client
            .flush()
            .await
            .context("Failed to flush NATS connection")?;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
