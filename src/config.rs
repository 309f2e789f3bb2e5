//! Server configuration read from the environment (and `.env`, if present).

use std::path::PathBuf;

use anyhow::Context;

pub const DEFAULT_PORT: u16 = 5001;
pub const DEFAULT_DATABASE_URL: &str = "sqlite://pairchat.db?mode=rwc";
pub const DEFAULT_CLIENT_ORIGIN: &str = "http://localhost:5173";
pub const DEFAULT_CLIENT_DIST: &str = "frontend/dist";
pub const DEFAULT_SESSION_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Origin allowed to call the API with credentials during development.
    pub client_origin: String,
    /// Serve the pre-built client from `client_dist` and mark cookies secure.
    pub production: bool,
    pub client_dist: PathBuf,
    pub session_ttl_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: DEFAULT_DATABASE_URL.to_owned(),
            client_origin: DEFAULT_CLIENT_ORIGIN.to_owned(),
            production: false,
            client_dist: PathBuf::from(DEFAULT_CLIENT_DIST),
            session_ttl_days: DEFAULT_SESSION_TTL_DAYS,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let port = match var("PORT") {
            Some(port) => port.parse().with_context(|| format!("PORT={port} is not a port"))?,
            None => defaults.port,
        };
        let session_ttl_days = match var("SESSION_TTL_DAYS") {
            Some(days) => days
                .parse()
                .with_context(|| format!("SESSION_TTL_DAYS={days} is not a number"))?,
            None => defaults.session_ttl_days,
        };

        Ok(Self {
            port,
            database_url: var("DATABASE_URL").unwrap_or(defaults.database_url),
            client_origin: var("CLIENT_ORIGIN").unwrap_or(defaults.client_origin),
            production: var("APP_ENV").is_some_and(|env| env == "production"),
            client_dist: var("CLIENT_DIST").map(PathBuf::from).unwrap_or(defaults.client_dist),
            session_ttl_days,
        })
    }
}
