use tokio::sync::{broadcast, mpsc};

use crate::event::ServerEvent;

use super::store::{ConnectionHandle, ConnectionId, SessionStore};

pub const PRESENCE_CAPACITY: usize = 64;

/// Keeps the session store in step with connects and disconnects and tells
/// every connected client who is online after each change.
///
/// Broadcasts are whole snapshots, so a client that lags simply skips to a
/// newer one.
#[derive(Debug, Clone)]
pub struct PresenceChannel {
    store: SessionStore,
    tx: broadcast::Sender<ServerEvent>,
}

impl PresenceChannel {
    pub fn new(store: SessionStore) -> Self {
        Self {
            store,
            tx: broadcast::channel(PRESENCE_CAPACITY).0,
        }
    }

    /// Receiver for every broadcast. Subscribe before `connect` so the
    /// snapshot announcing this connection is not missed.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.tx.subscribe()
    }

    pub fn connect(
        &self,
        user_id: &str,
        sender: mpsc::UnboundedSender<ServerEvent>,
    ) -> ConnectionId {
        let handle = ConnectionHandle::new(sender);
        let connection_id = handle.id;

        if let Some(superseded) = self.store.register(user_id, handle) {
            tracing::debug!(user_id, superseded = %superseded.id, "newer connection replaces older one");
        }
        tracing::info!(user_id, connection = %connection_id, "user connected");

        self.broadcast_online();
        connection_id
    }

    /// Returns whether `connection_id` was still the registered one.
    pub fn disconnect(&self, user_id: &str, connection_id: ConnectionId) -> bool {
        let removed = self.store.unregister(user_id, connection_id);
        tracing::info!(user_id, connection = %connection_id, removed, "user disconnected");

        self.broadcast_online();
        removed
    }

    pub fn online_ids(&self) -> Vec<String> {
        self.store.online_ids()
    }

    fn broadcast_online(&self) {
        // no receivers is fine: nobody is listening yet
        let _ = self.tx.send(ServerEvent::GetOnlineUsers(self.store.online_ids()));
    }
}
