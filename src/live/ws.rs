use axum::{
    debug_handler,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message as WsMessage, WebSocket},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};

use crate::auth::CurrentUser;

use super::PresenceChannel;

/// Upgrade to the live channel. The user id comes from the server-side
/// session only; anything the client puts in the URL is ignored.
#[debug_handler(state = crate::AppState)]
pub async fn live_ws(
    CurrentUser(user): CurrentUser,
    State(presence): State<PresenceChannel>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| connection(socket, user.id, presence))
}

async fn connection(socket: WebSocket, user_id: String, presence: PresenceChannel) {
    let mut broadcasts = presence.subscribe();
    let (tx, mut direct) = mpsc::unbounded_channel();
    let connection_id = presence.connect(&user_id, tx);

    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        // closes when a newer connection for the same user takes the slot;
        // presence keeps flowing to this socket afterwards
        let mut direct_open = true;

        loop {
            let event = tokio::select! {
                event = direct.recv(), if direct_open => match event {
                    Some(event) => event,
                    None => {
                        direct_open = false;
                        continue;
                    }
                },
                event = broadcasts.recv() => match event {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "presence receiver lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            };

            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    tracing::warn!("failed to encode event: {err}");
                    continue;
                }
            };
            if sender.send(WsMessage::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let WsMessage::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    };

    presence.disconnect(&user_id, connection_id);
}
