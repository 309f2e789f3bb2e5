//! Events pushed from the server to live connections.

use serde::{Deserialize, Serialize};

use crate::db::Message;

/// A server → client frame, encoded as `{"event": ..., "data": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    NewMessage(Message),
    GetOnlineUsers(Vec<String>),
}

impl ServerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ServerEvent::NewMessage(_) => EventKind::NewMessage,
            ServerEvent::GetOnlineUsers(_) => EventKind::GetOnlineUsers,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    NewMessage,
    GetOnlineUsers,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_use_event_names_of_the_channel() {
        let json = serde_json::to_value(ServerEvent::GetOnlineUsers(vec!["a".into()])).unwrap();
        assert_eq!(json, serde_json::json!({ "event": "getOnlineUsers", "data": ["a"] }));

        let message = Message {
            id: "m1".into(),
            sender_id: "u1".into(),
            receiver_id: "u2".into(),
            text: Some("hi".into()),
            image: None,
            created_at: 1,
        };
        let json = serde_json::to_value(ServerEvent::NewMessage(message)).unwrap();
        assert_eq!(json["event"], "newMessage");
        assert_eq!(json["data"]["senderId"], "u1");
    }
}
