//! The per-tab chat core: message model, session log and orchestration

mod controller;
mod store;
mod types;

pub use controller::{ChatController, ControllerStatus, Notice};
pub use store::MessageStore;
pub use types::{AudioRef, LanguagePair, Message, MessageId, ParseRoleError, Reaction, Role};
