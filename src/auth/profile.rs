use axum::{debug_handler, extract::State, Json};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{db::User, AppError, AppResult};

use super::{find_user, CurrentUser};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateProfileBody {
    #[serde(default)]
    profile_pic: Option<String>,
    #[serde(default)]
    full_name: Option<String>,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn update_profile(
    CurrentUser(user): CurrentUser,
    State(db_pool): State<SqlitePool>,
    Json(UpdateProfileBody { profile_pic, full_name }): Json<UpdateProfileBody>,
) -> AppResult<Json<User>> {
    let full_name = full_name
        .map(|name| name.trim().to_owned())
        .filter(|name| !name.is_empty());
    if profile_pic.is_none() && full_name.is_none() {
        return Err(AppError::bad_request("Nothing to update"));
    }

    sqlx::query("UPDATE users SET profile_pic=COALESCE(?,profile_pic), full_name=COALESCE(?,full_name) WHERE id=?")
        .bind(profile_pic)
        .bind(full_name)
        .bind(&user.id)
        .execute(&db_pool)
        .await?;

    let updated = find_user(&db_pool, &user.id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(updated))
}
