//! Publish/subscribe channels carrying canvas operations between peers.
//!
//! Delivery is best effort: no acknowledgement, no ordering guarantee across
//! peers, no replay for late subscribers. A channel may echo a publisher's
//! own messages back to it; receivers filter by originator.

mod memory;
mod relay;

pub use memory::MemoryChannel;
pub use relay::RelayClient;

use crate::sync::RemoteOperation;
use std::sync::mpsc::Receiver;
use thiserror::Error;

/// Channel errors.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Not connected")]
    NotConnected,
    #[error("Send failed: {0}")]
    Send(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Connection error: {0}")]
    Connection(String),
}

/// Result type for channel operations.
pub type ChannelResult<T> = Result<T, ChannelError>;

/// A live subscription to one scope.
///
/// Yields raw JSON messages; decoding happens at the session boundary.
/// Dropping the subscription unsubscribes.
pub struct Subscription {
    scope: String,
    receiver: Receiver<String>,
    on_drop: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(
        scope: impl Into<String>,
        receiver: Receiver<String>,
        on_drop: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            scope: scope.into(),
            receiver,
            on_drop: Some(Box::new(on_drop)),
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Next pending message without blocking.
    pub fn try_recv(&self) -> Option<String> {
        self.receiver.try_recv().ok()
    }

    /// All pending messages, oldest first.
    pub fn drain(&self) -> Vec<String> {
        self.receiver.try_iter().collect()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.on_drop.take() {
            unsubscribe();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("scope", &self.scope).finish()
    }
}

/// Trait for pub/sub transports.
pub trait Channel: Send + Sync {
    /// Start receiving messages published to `scope`.
    fn subscribe(&self, scope: &str) -> ChannelResult<Subscription>;

    /// Publish an operation to every subscriber of `scope`. Fire-and-forget.
    fn publish(&self, scope: &str, operation: &RemoteOperation) -> ChannelResult<()>;
}
