use axum::{debug_handler, Json};

use crate::db::User;

use super::CurrentUser;

#[debug_handler(state = crate::AppState)]
pub(crate) async fn check_auth(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}
