use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::event::ServerEvent;

pub type ConnectionId = Uuid;

/// The sending half of one live connection, tagged with a per-connection id
/// so a late disconnect can tell whether it still owns the slot.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub id: ConnectionId,
    sender: mpsc::UnboundedSender<ServerEvent>,
}

impl ConnectionHandle {
    pub fn new(sender: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self {
            id: Uuid::now_v7(),
            sender,
        }
    }

    /// Queue an event for the connection's writer. False once the writer is gone.
    pub fn push(&self, event: ServerEvent) -> bool {
        self.sender.send(event).is_ok()
    }
}

/// Process-local map from user id to that user's live connection.
///
/// One slot per user id; registering again replaces the slot. The lock is
/// held only for the map operation itself and never across an await.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    slots: Arc<Mutex<HashMap<String, ConnectionHandle>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<String, ConnectionHandle>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `handle` for `user_id`, returning the handle it superseded.
    pub fn register(&self, user_id: &str, handle: ConnectionHandle) -> Option<ConnectionHandle> {
        self.slots().insert(user_id.to_owned(), handle)
    }

    /// Remove the slot only if it still holds `connection_id`.
    pub fn unregister(&self, user_id: &str, connection_id: ConnectionId) -> bool {
        let mut slots = self.slots();
        match slots.get(user_id) {
            Some(current) if current.id == connection_id => {
                slots.remove(user_id);
                true
            }
            _ => false,
        }
    }

    pub fn lookup(&self, user_id: &str) -> Option<ConnectionHandle> {
        self.slots().get(user_id).cloned()
    }

    /// Sorted snapshot of every user id holding a live connection.
    pub fn online_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.slots().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every handle. Writers see their direct channel close.
    pub fn clear(&self) {
        self.slots().clear();
    }
}
