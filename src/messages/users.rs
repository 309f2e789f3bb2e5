use axum::{debug_handler, extract::State, Json};
use sqlx::SqlitePool;

use crate::{auth::CurrentUser, db::{User, USER_COLUMNS}, AppResult};

/// Everyone except `user_id`, oldest account first.
pub async fn other_users(db_pool: &SqlitePool, user_id: &str) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id<>? ORDER BY created_at, rowid"
    ))
    .bind(user_id)
    .fetch_all(db_pool)
    .await
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn users(
    CurrentUser(me): CurrentUser,
    State(db_pool): State<SqlitePool>,
) -> AppResult<Json<Vec<User>>> {
    Ok(Json(other_users(&db_pool, &me.id).await?))
}
