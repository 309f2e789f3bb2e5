//! The CRUD side of chat: sidebar users, conversation history, sending.

mod history;
mod send;
mod users;

use axum::{routing::{get, post}, Router};

use crate::AppState;

pub use history::conversation;
pub use send::insert_message;
pub use users::other_users;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(users::users))
        .route("/{user_id}", get(history::history))
        .route("/send/{user_id}", post(send::send))
}
