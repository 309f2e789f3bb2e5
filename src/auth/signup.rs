use axum::{debug_handler, extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{session::USER_ID, AppError, AppResult};

use super::{create_user, password};

pub(crate) const MIN_PASSWORD_LEN: usize = 6;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SignupBody {
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn signup(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Json(SignupBody { full_name, email, password }): Json<SignupBody>,
) -> AppResult<impl IntoResponse> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || password.is_empty() {
        return Err(AppError::bad_request("All fields are required"));
    }
    if !email.contains('@') {
        return Err(AppError::bad_request("Invalid email"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let password_hash = password::hash_off_thread(password).await?;

    let user = match create_user(&db_pool, full_name.as_deref(), &email, &password_hash).await {
        Ok(user) => user,
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(AppError::bad_request("Email already exists"));
        }
        Err(e) => return Err(e.into()),
    };

    session.cycle_id().await?;
    session.insert(USER_ID, &user.id).await?;

    Ok((StatusCode::CREATED, Json(user)))
}
