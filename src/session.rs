//! Keys stored in the cookie-backed `tower_sessions::Session`.

pub const USER_ID: &str = "user_id";
