//! Cross-tab synchronization
//!
//! Tabs exchange whole-message snapshots over a named broadcast channel:
//! - `LocalHub` for tabs living in one process
//! - `NatsTransport` for tabs in separate processes
//!
//! There is no ordering or delivery guarantee; `MessageStore::merge` is the
//! only convergence step.

mod channel;
mod envelope;
mod nats;
mod transport;

pub use channel::SyncChannel;
pub use envelope::SyncEnvelope;
pub use nats::NatsTransport;
pub use transport::{BroadcastTransport, LocalHub, LocalTransport};
