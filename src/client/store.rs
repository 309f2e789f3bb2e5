use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    db::{Message, User},
    event::{EventKind, ServerEvent},
};

use super::{ApiClient, ApiError, Channel, Subscription};

/// Transient user-facing failure, shown once and then discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
}

impl Notice {
    fn from_error(err: &anyhow::Error, fallback: &str) -> Self {
        let message = err
            .downcast_ref::<ApiError>()
            .map(|e| e.message.clone())
            .unwrap_or_else(|| fallback.to_owned());
        tracing::warn!("{fallback}: {err:#}");
        Self { message }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChatState {
    pub messages: Vec<Message>,
    pub users: Vec<User>,
    pub selected_user: Option<User>,
    pub is_users_loading: bool,
    pub is_messages_loading: bool,
    pub notices: Vec<Notice>,
}

/// Chat state for one signed-in client.
///
/// Holds at most one `newMessage` handler, for the selected conversation.
/// Selecting another conversation, deselecting, detaching the channel, or
/// dropping the store releases it.
pub struct ChatStore {
    api: ApiClient,
    state: Arc<Mutex<ChatState>>,
    channel: Option<Channel>,
    subscription: Option<Subscription>,
}

fn lock(state: &Mutex<ChatState>) -> MutexGuard<'_, ChatState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ChatStore {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: Arc::new(Mutex::new(ChatState::default())),
            channel: None,
            subscription: None,
        }
    }

    pub fn snapshot(&self) -> ChatState {
        lock(&self.state).clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        lock(&self.state).messages.clone()
    }

    pub fn take_notices(&self) -> Vec<Notice> {
        std::mem::take(&mut lock(&self.state).notices)
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Use `channel` for live messages from now on.
    pub fn attach(&mut self, channel: Channel) {
        self.channel = Some(channel);
        self.subscribe_to_messages();
    }

    pub fn detach(&mut self) {
        self.unsubscribe_from_messages();
        self.channel = None;
    }

    /// Open the conversation with `user`, replacing any handler for the
    /// previous one. Messages from other senders are dropped from then on.
    pub fn select_conversation(&mut self, user: User) {
        {
            let mut state = lock(&self.state);
            state.selected_user = Some(user);
            state.messages.clear();
        }
        self.subscribe_to_messages();
    }

    pub fn deselect(&mut self) {
        self.unsubscribe_from_messages();
        let mut state = lock(&self.state);
        state.selected_user = None;
        state.messages.clear();
    }

    /// Select `user` and load the history with them.
    pub async fn open_conversation(&mut self, user: User) {
        let user_id = user.id.clone();
        self.select_conversation(user);
        self.get_messages(&user_id).await;
    }

    fn subscribe_to_messages(&mut self) {
        self.unsubscribe_from_messages();

        let Some(selected_id) = lock(&self.state).selected_user.as_ref().map(|u| u.id.clone()) else {
            return;
        };
        let Some(channel) = &self.channel else {
            tracing::debug!("no live channel yet, not subscribing");
            return;
        };

        let state = Arc::clone(&self.state);
        self.subscription = Some(channel.on(EventKind::NewMessage, move |event| {
            let ServerEvent::NewMessage(message) = event else {
                return;
            };
            if message.sender_id != selected_id {
                return;
            }

            let mut state = lock(&state);
            // a history fetch may already hold the row the push announces
            if state.messages.iter().all(|m| m.id != message.id) {
                state.messages.push(message.clone());
            }
        }));
    }

    fn unsubscribe_from_messages(&mut self) {
        self.subscription = None;
    }

    pub async fn get_users(&self) {
        lock(&self.state).is_users_loading = true;
        let result = self.api.users().await;

        let mut state = lock(&self.state);
        match result {
            Ok(users) => state.users = users,
            Err(err) => state.notices.push(Notice::from_error(&err, "Failed to load users")),
        }
        state.is_users_loading = false;
    }

    pub async fn get_messages(&self, user_id: &str) {
        if user_id.is_empty() {
            return;
        }

        {
            let mut state = lock(&self.state);
            if state.is_open(user_id) {
                state.is_messages_loading = true;
            }
        }
        let result = self.api.messages(user_id).await;

        let mut state = lock(&self.state);
        // the reply is stale if another conversation was opened meanwhile
        let current = state.is_open(user_id);
        match result {
            Ok(history) if current => merge_history(&mut state.messages, history),
            Ok(_) => {}
            Err(err) => state.notices.push(Notice::from_error(&err, "Failed to load messages")),
        }
        if current {
            state.is_messages_loading = false;
        }
    }

    /// Send to the selected user and append the stored row. No-op when no
    /// conversation is open.
    pub async fn send_message(&self, text: Option<&str>, image: Option<&str>) {
        let Some(user_id) = lock(&self.state).selected_user.as_ref().map(|u| u.id.clone()) else {
            return;
        };

        let result = self.api.send_message(&user_id, text, image).await;

        let mut state = lock(&self.state);
        match result {
            Ok(message) => {
                // a push may already hold this row when the sender is the recipient
                let held = state.messages.iter().any(|m| m.id == message.id);
                if state.is_open(&message.receiver_id) && !held {
                    state.messages.push(message);
                }
            }
            Err(err) => state.notices.push(Notice::from_error(&err, "Failed to send message")),
        }
    }
}

impl ChatState {
    fn is_open(&self, user_id: &str) -> bool {
        self.selected_user.as_ref().is_some_and(|u| u.id == user_id)
    }
}

/// Fold a history reply into the rows already held. Pushes that landed
/// while the request was in flight are kept; rows are ordered by `created_at`.
fn merge_history(held: &mut Vec<Message>, history: Vec<Message>) {
    let pushed: Vec<Message> = held
        .drain(..)
        .filter(|m| history.iter().all(|h| h.id != m.id))
        .collect();
    held.extend(history);
    held.extend(pushed);
    held.sort_by_key(|m| m.created_at);
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{
        extract::Path,
        http::StatusCode,
        routing::{get, post},
        Json, Router,
    };

    use super::*;

    fn user(id: &str) -> User {
        User {
            id: id.to_owned(),
            email: format!("{id}@example.com"),
            full_name: id.to_owned(),
            profile_pic: String::new(),
            created_at: 0,
        }
    }

    fn message(id: &str, from: &str, to: &str, text: &str, created_at: i64) -> Message {
        Message {
            id: id.to_owned(),
            sender_id: from.to_owned(),
            receiver_id: to.to_owned(),
            text: Some(text.to_owned()),
            image: None,
            created_at,
        }
    }

    fn push(channel: &Channel, id: &str, from: &str, to: &str, text: &str) {
        channel.dispatch(&ServerEvent::NewMessage(message(id, from, to, text, 0)));
    }

    /// Base url of a port that was just bound and released.
    fn closed_port_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        format!("http://127.0.0.1:{port}")
    }

    /// Stand-in API: history with `a` answers `[]` after 300ms, every
    /// other history is empty at once, and a send echoes row `m1` back.
    async fn fake_api() -> ApiClient {
        let app = Router::new()
            .route(
                "/api/messages/{user_id}",
                get(|Path(user_id): Path<String>| async move {
                    if user_id == "a" {
                        tokio::time::sleep(Duration::from_millis(300)).await;
                    }
                    Json(Vec::<Message>::new())
                }),
            )
            .route(
                "/api/messages/send/{user_id}",
                post(|Path(user_id): Path<String>| async move {
                    (StatusCode::CREATED, Json(message("m1", "me", &user_id, "sent", 1)))
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        ApiClient::new(&format!("http://{addr}")).unwrap()
    }

    fn store_with_channel() -> (ChatStore, Channel) {
        let mut store = ChatStore::new(ApiClient::new(&closed_port_url()).unwrap());
        let channel = Channel::new();
        store.attach(channel.clone());
        (store, channel)
    }

    #[test]
    fn switching_conversations_keeps_one_handler() {
        let (mut store, channel) = store_with_channel();
        assert_eq!(channel.handler_count(EventKind::NewMessage), 0);

        for id in ["a", "b", "a", "a"] {
            store.select_conversation(user(id));
            assert_eq!(channel.handler_count(EventKind::NewMessage), 1);
        }

        store.deselect();
        assert_eq!(channel.handler_count(EventKind::NewMessage), 0);
        store.deselect();
        assert_eq!(channel.handler_count(EventKind::NewMessage), 0);
    }

    #[test]
    fn only_the_open_conversation_is_appended() {
        let (mut store, channel) = store_with_channel();
        store.select_conversation(user("a"));
        store.select_conversation(user("b"));

        push(&channel, "m1", "a", "me", "for a");
        assert!(store.messages().is_empty());

        push(&channel, "m2", "b", "me", "hi");
        let messages = store.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender_id, "b");
        assert_eq!(messages[0].text.as_deref(), Some("hi"));
    }

    #[test]
    fn same_push_is_appended_once() {
        let (mut store, channel) = store_with_channel();
        store.select_conversation(user("a"));
        push(&channel, "m1", "a", "me", "hi");
        push(&channel, "m1", "a", "me", "hi");
        assert_eq!(store.messages().len(), 1);
    }

    #[test]
    fn no_channel_means_no_handler_until_attached() {
        let mut store = ChatStore::new(ApiClient::new(&closed_port_url()).unwrap());
        store.select_conversation(user("a"));
        assert!(!store.is_subscribed());

        let channel = Channel::new();
        store.attach(channel.clone());
        assert!(store.is_subscribed());
        assert_eq!(channel.handler_count(EventKind::NewMessage), 1);

        store.detach();
        assert_eq!(channel.handler_count(EventKind::NewMessage), 0);
    }

    #[test]
    fn dropping_the_store_releases_the_handler() {
        let (mut store, channel) = store_with_channel();
        store.select_conversation(user("a"));
        drop(store);
        assert_eq!(channel.handler_count(EventKind::NewMessage), 0);
    }

    #[tokio::test]
    async fn failed_fetch_becomes_a_notice() {
        let (mut store, _channel) = store_with_channel();
        store.select_conversation(user("a"));
        store.get_users().await;
        store.send_message(Some("hi"), None).await;

        let notices = store.take_notices();
        assert_eq!(
            notices,
            vec![
                Notice { message: "Failed to load users".into() },
                Notice { message: "Failed to send message".into() },
            ]
        );
        assert!(store.take_notices().is_empty());
        assert!(!store.snapshot().is_users_loading);
    }

    #[tokio::test]
    async fn push_during_history_fetch_survives() {
        let mut store = ChatStore::new(fake_api().await);
        let channel = Channel::new();
        store.attach(channel.clone());

        let pusher = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            push(&channel, "m1", "a", "me", "while loading");
        });
        store.open_conversation(user("a")).await;
        pusher.await.unwrap();

        let messages = store.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, "m1");
        assert!(!store.snapshot().is_messages_loading);
    }

    #[test]
    fn history_merge_keeps_pushes_and_orders_by_time() {
        let mut held = vec![message("m3", "a", "me", "pushed", 30), message("m2", "a", "me", "both", 20)];
        let history = vec![message("m1", "me", "a", "old", 10), message("m2", "a", "me", "both", 20)];

        merge_history(&mut held, history);

        let ids: Vec<_> = held.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["m1", "m2", "m3"]);
    }

    #[tokio::test]
    async fn stale_reply_leaves_loading_flag_alone() {
        let mut store = ChatStore::new(fake_api().await);
        store.select_conversation(user("a"));

        let (_, loading_after_stale_reply) = tokio::join!(store.get_messages("a"), async {
            store.get_messages("b").await;
            store.snapshot().is_messages_loading
        });

        assert!(loading_after_stale_reply);
        assert!(!store.snapshot().is_messages_loading);
    }

    #[tokio::test]
    async fn reply_already_pushed_is_not_appended_again() {
        let (mut store, channel) = (ChatStore::new(fake_api().await), Channel::new());
        store.attach(channel.clone());
        store.select_conversation(user("a"));

        push(&channel, "m1", "a", "a", "sent");
        store.send_message(Some("sent"), None).await;

        assert_eq!(store.messages().len(), 1);
    }
}
