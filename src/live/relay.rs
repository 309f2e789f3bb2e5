use crate::{db::Message, event::ServerEvent};

use super::store::SessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Queued on the recipient's live connection.
    Delivered,
    /// Recipient had no live connection; the stored row is all they get.
    Offline,
    /// Recipient's connection closed between lookup and push.
    Dropped,
}

/// Pushes already-persisted messages to the recipient's live connection.
#[derive(Debug, Clone)]
pub struct MessageRelay {
    store: SessionStore,
}

impl MessageRelay {
    pub fn new(store: SessionStore) -> Self {
        Self { store }
    }

    /// Call only after `message` has been inserted.
    pub fn relay(&self, message: &Message) -> RelayOutcome {
        let Some(handle) = self.store.lookup(&message.receiver_id) else {
            tracing::debug!(message_id = %message.id, receiver = %message.receiver_id, "receiver offline");
            return RelayOutcome::Offline;
        };

        if handle.push(ServerEvent::NewMessage(message.clone())) {
            tracing::debug!(message_id = %message.id, connection = %handle.id, "relayed");
            RelayOutcome::Delivered
        } else {
            RelayOutcome::Dropped
        }
    }
}
