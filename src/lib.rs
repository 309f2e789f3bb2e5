pub mod appresult;
pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod event;
pub mod live;
pub mod messages;
pub mod res;
pub mod session;

use axum::{
    extract::FromRef,
    http::{header, HeaderValue, Method},
    Router,
};
use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};

pub use appresult::{AppError, AppResult};
pub use config::Config;

use live::{MessageRelay, PresenceChannel, SessionStore};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub presence: PresenceChannel,
    pub relay: MessageRelay,
}

impl AppState {
    /// `sessions` is owned by the caller, which clears it at shutdown.
    pub fn new(db_pool: SqlitePool, sessions: SessionStore) -> Self {
        Self {
            db_pool,
            presence: PresenceChannel::new(sessions.clone()),
            relay: MessageRelay::new(sessions),
        }
    }
}

pub fn app(state: AppState, config: &Config) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(config.production)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::days(config.session_ttl_days)));

    let mut router = Router::new()
        .nest("/api/auth", auth::router())
        .nest("/api/messages", messages::router())
        .merge(live::router());

    if config.production {
        router = router.fallback_service(res::client_assets(&config.client_dist));
    }

    router
        .with_state(state)
        .layer(session_layer)
        .layer(cors(config))
        .layer(TraceLayer::new_for_http())
}

fn cors(config: &Config) -> CorsLayer {
    let Ok(origin) = config.client_origin.parse::<HeaderValue>() else {
        tracing::warn!(origin = %config.client_origin, "CLIENT_ORIGIN is not a valid header value, CORS disabled");
        return CorsLayer::new();
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::CONTENT_TYPE])
}
