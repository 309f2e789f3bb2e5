use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context;
use futures_util::StreamExt;
use tokio::{net::TcpStream, sync::oneshot, task::JoinHandle};
use tokio_tungstenite::{
    tungstenite::{client::IntoClientRequest, http::header::COOKIE, Message as WsMessage},
    MaybeTlsStream, WebSocketStream,
};

use crate::event::{EventKind, ServerEvent};

use super::{ApiClient, Channel, Subscription};

type LiveStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A connected live channel. Server events are decoded on a background task
/// and dispatched to handlers registered on [`LiveSocket::channel`].
pub struct LiveSocket {
    channel: Channel,
    online: Arc<Mutex<Vec<String>>>,
    _presence: Subscription,
    shutdown: Option<oneshot::Sender<()>>,
    reader: JoinHandle<()>,
}

impl LiveSocket {
    /// Connect with the session cookie held by `api`; the server derives the
    /// user from it.
    pub async fn connect(api: &ApiClient) -> anyhow::Result<Self> {
        let mut request = api.live_url()?.as_str().into_client_request()?;
        if let Some(cookie) = api.cookie_header() {
            request.headers_mut().insert(COOKIE, cookie);
        }

        let (stream, _) = tokio_tungstenite::connect_async(request)
            .await
            .context("live channel handshake failed")?;

        let channel = Channel::new();
        let online = Arc::new(Mutex::new(Vec::new()));
        let presence = {
            let online = Arc::clone(&online);
            channel.on(EventKind::GetOnlineUsers, move |event| {
                if let ServerEvent::GetOnlineUsers(ids) = event {
                    *online.lock().unwrap_or_else(PoisonError::into_inner) = ids.clone();
                }
            })
        };

        let (shutdown, shutdown_rx) = oneshot::channel();
        let reader = tokio::spawn(read_loop(stream, channel.clone(), shutdown_rx));

        Ok(Self {
            channel,
            online,
            _presence: presence,
            shutdown: Some(shutdown),
            reader,
        })
    }

    pub fn channel(&self) -> Channel {
        self.channel.clone()
    }

    /// Latest online snapshot the server broadcast.
    pub fn online_users(&self) -> Vec<String> {
        self.online.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.online_users().iter().any(|id| id == user_id)
    }

    /// Send a close frame and wait for the reader to stop.
    pub async fn disconnect(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        let _ = (&mut self.reader).await;
    }
}

impl Drop for LiveSocket {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn read_loop(mut stream: LiveStream, channel: Channel, mut shutdown: oneshot::Receiver<()>) {
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                let _ = stream.close(None).await;
                break;
            }
            frame = stream.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => match serde_json::from_str::<ServerEvent>(&text) {
                    Ok(event) => channel.dispatch(&event),
                    Err(err) => tracing::warn!("undecodable live frame: {err}"),
                },
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    tracing::warn!("live channel error: {err}");
                    break;
                }
            },
        }
    }
}
