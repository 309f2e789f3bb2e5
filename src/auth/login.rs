use axum::{debug_handler, extract::State, Json};
use serde::Deserialize;
use sqlx::{FromRow, SqlitePool};
use tower_sessions::Session;

use crate::{
    db::{User, USER_COLUMNS},
    session::USER_ID,
    AppError, AppResult,
};

use super::password;

#[derive(Deserialize)]
pub(crate) struct LoginBody {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(FromRow)]
struct Credentials {
    #[sqlx(flatten)]
    user: User,
    password_hash: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn login(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Json(LoginBody { email, password }): Json<LoginBody>,
) -> AppResult<Json<User>> {
    let email = email.trim().to_lowercase();

    let credentials = sqlx::query_as::<_, Credentials>(&format!(
        "SELECT {USER_COLUMNS},password_hash FROM users WHERE email=?"
    ))
    .bind(&email)
    .fetch_optional(&db_pool)
    .await?;

    let Some(Credentials { user, password_hash }) = credentials else {
        return Err(AppError::bad_request("Invalid credentials"));
    };
    if !password::verify_off_thread(password, password_hash).await? {
        return Err(AppError::bad_request("Invalid credentials"));
    }

    session.cycle_id().await?;
    session.insert(USER_ID, &user.id).await?;

    tracing::info!(user_id = %user.id, "welcome back");
    Ok(Json(user))
}
