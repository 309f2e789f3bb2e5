use axum::{debug_handler, extract::{Path, State}, http::StatusCode, Json};
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    auth::{find_user, CurrentUser},
    db::{self, Message},
    live::{MessageRelay, RelayOutcome},
    AppError, AppResult,
};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SendMessageBody {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    image: Option<String>,
}

pub async fn insert_message(
    db_pool: &SqlitePool,
    sender_id: &str,
    receiver_id: &str,
    text: Option<String>,
    image: Option<String>,
) -> Result<Message, sqlx::Error> {
    let message = Message {
        id: Uuid::now_v7().to_string(),
        sender_id: sender_id.to_owned(),
        receiver_id: receiver_id.to_owned(),
        text,
        image,
        created_at: db::now_millis(),
    };

    sqlx::query("INSERT INTO messages (id,sender_id,receiver_id,text,image,created_at) VALUES (?,?,?,?,?,?)")
        .bind(&message.id)
        .bind(&message.sender_id)
        .bind(&message.receiver_id)
        .bind(&message.text)
        .bind(&message.image)
        .bind(message.created_at)
        .execute(db_pool)
        .await?;

    Ok(message)
}

fn non_blank(field: Option<String>) -> Option<String> {
    field.filter(|s| !s.trim().is_empty())
}

/// Persist, then relay. A failed insert returns before anything is pushed.
pub(crate) async fn persist_and_relay(
    db_pool: &SqlitePool,
    relay: &MessageRelay,
    sender_id: &str,
    receiver_id: &str,
    text: Option<String>,
    image: Option<String>,
) -> Result<(Message, RelayOutcome), sqlx::Error> {
    let message = insert_message(db_pool, sender_id, receiver_id, text, image).await?;
    let outcome = relay.relay(&message);
    Ok((message, outcome))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn send(
    CurrentUser(sender): CurrentUser,
    Path(receiver_id): Path<String>,
    State(db_pool): State<SqlitePool>,
    State(relay): State<MessageRelay>,
    Json(SendMessageBody { text, image }): Json<SendMessageBody>,
) -> AppResult<(StatusCode, Json<Message>)> {
    let text = non_blank(text);
    let image = non_blank(image);
    if text.is_none() && image.is_none() {
        return Err(AppError::bad_request("Message must have text or an image"));
    }
    if receiver_id == sender.id {
        return Err(AppError::bad_request("Cannot send a message to yourself"));
    }

    if find_user(&db_pool, &receiver_id).await?.is_none() {
        return Err(AppError::not_found("User not found"));
    }

    let (message, outcome) =
        persist_and_relay(&db_pool, &relay, &sender.id, &receiver_id, text, image).await?;
    tracing::debug!(message_id = %message.id, ?outcome, "message sent");

    Ok((StatusCode::CREATED, Json(message)))
}
