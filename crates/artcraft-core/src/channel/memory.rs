//! In-process channel.

use super::{Channel, ChannelError, ChannelResult, Subscription};
use crate::sync::RemoteOperation;
use std::collections::HashMap;
use std::sync::mpsc::{Sender, channel};
use std::sync::{Arc, Mutex, PoisonError, Weak};

#[derive(Default)]
struct Hub {
    next_id: u64,
    subscribers: HashMap<String, Vec<(u64, Sender<String>)>>,
}

/// In-memory pub/sub hub shared by every session in the process.
///
/// Like many hosted broadcast services it echoes messages back to the
/// publisher's own subscription.
#[derive(Clone, Default)]
pub struct MemoryChannel {
    hub: Arc<Mutex<Hub>>,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscriptions to a scope.
    pub fn subscriber_count(&self, scope: &str) -> usize {
        self.hub
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribers
            .get(scope)
            .map_or(0, Vec::len)
    }

    /// Deliver a raw payload, bypassing encoding. Lets tests inject
    /// malformed traffic.
    pub fn publish_raw(&self, scope: &str, payload: &str) {
        let mut hub = self.hub.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(subs) = hub.subscribers.get_mut(scope) {
            subs.retain(|(_, tx)| tx.send(payload.to_string()).is_ok());
        }
    }
}

fn unsubscribe(hub: &Weak<Mutex<Hub>>, scope: &str, id: u64) {
    let Some(hub) = hub.upgrade() else {
        return;
    };
    let mut hub = hub.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(subs) = hub.subscribers.get_mut(scope) {
        subs.retain(|(sub_id, _)| *sub_id != id);
        if subs.is_empty() {
            hub.subscribers.remove(scope);
        }
    }
}

impl Channel for MemoryChannel {
    fn subscribe(&self, scope: &str) -> ChannelResult<Subscription> {
        let (tx, rx) = channel();
        let id = {
            let mut hub = self.hub.lock().unwrap_or_else(PoisonError::into_inner);
            hub.next_id += 1;
            let id = hub.next_id;
            hub.subscribers
                .entry(scope.to_string())
                .or_default()
                .push((id, tx));
            id
        };

        let weak = Arc::downgrade(&self.hub);
        let scope_owned = scope.to_string();
        Ok(Subscription::new(scope, rx, move || {
            unsubscribe(&weak, &scope_owned, id)
        }))
    }

    fn publish(&self, scope: &str, operation: &RemoteOperation) -> ChannelResult<()> {
        let payload = operation
            .encode()
            .map_err(|e| ChannelError::Send(e.to_string()))?;
        self.publish_raw(scope, &payload);
        Ok(())
    }
}
