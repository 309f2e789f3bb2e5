use axum::{debug_handler, extract::{Path, State}, Json};
use sqlx::SqlitePool;

use crate::{auth::CurrentUser, db::{Message, MESSAGE_COLUMNS}, AppResult};

/// Every message between `a` and `b` in either direction, in the order
/// they were stored.
pub async fn conversation(db_pool: &SqlitePool, a: &str, b: &str) -> Result<Vec<Message>, sqlx::Error> {
    sqlx::query_as::<_, Message>(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages \
         WHERE (sender_id=? AND receiver_id=?) OR (sender_id=? AND receiver_id=?) \
         ORDER BY created_at, rowid"
    ))
    .bind(a)
    .bind(b)
    .bind(b)
    .bind(a)
    .fetch_all(db_pool)
    .await
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn history(
    CurrentUser(me): CurrentUser,
    Path(user_id): Path<String>,
    State(db_pool): State<SqlitePool>,
) -> AppResult<Json<Vec<Message>>> {
    Ok(Json(conversation(&db_pool, &me.id, &user_id).await?))
}
