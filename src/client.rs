//! Client side of the chat: the HTTP API, the live socket, and the store
//! that keeps the open conversation in step with both.

mod api;
mod channel;
mod socket;
mod store;

pub use api::{ApiClient, ApiError};
pub use channel::{Channel, Subscription};
pub use socket::LiveSocket;
pub use store::{ChatState, ChatStore, Notice};
