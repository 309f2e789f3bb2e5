//! The live channel: who is connected, and pushing messages to them.

mod presence;
mod relay;
mod store;
mod ws;

use axum::{routing::get, Router};

use crate::AppState;

pub use presence::PresenceChannel;
pub use relay::{MessageRelay, RelayOutcome};
pub use store::{ConnectionHandle, ConnectionId, SessionStore};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::live_ws))
}
