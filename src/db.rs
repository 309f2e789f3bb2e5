use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqlitePoolOptions, FromRow, SqlitePool};
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub profile_pic: String,
    pub created_at: i64,

    // unique: id
    // unique: email
    // password_hash lives in the same row but is never selected into this struct
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub text: Option<String>,
    pub image: Option<String>,
    pub created_at: i64,

    // unique: id
}

pub(crate) const USER_COLUMNS: &str = "id,email,full_name,profile_pic,created_at";
pub(crate) const MESSAGE_COLUMNS: &str = "id,sender_id,receiver_id,text,image,created_at";

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY NOT NULL,
        email TEXT NOT NULL UNIQUE,
        full_name TEXT NOT NULL,
        password_hash TEXT NOT NULL,
        profile_pic TEXT NOT NULL DEFAULT '',
        created_at INTEGER NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS messages (
        id TEXT PRIMARY KEY NOT NULL,
        sender_id TEXT NOT NULL REFERENCES users(id),
        receiver_id TEXT NOT NULL REFERENCES users(id),
        text TEXT,
        image TEXT,
        created_at INTEGER NOT NULL
    )"#,
    "CREATE INDEX IF NOT EXISTS messages_pair ON messages (sender_id, receiver_id, created_at)",
];

/// Open the pool and make sure the tables exist.
pub async fn connect(database_url: &str) -> anyhow::Result<SqlitePool> {
    // every connection to `sqlite::memory:` is its own database
    let max_connections = if database_url.contains(":memory:") { 1 } else { 16 };

    let db_pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    migrate(&db_pool).await?;

    Ok(db_pool)
}

pub async fn migrate(db_pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(db_pool).await?;
    }
    Ok(())
}

/// Unix time in milliseconds, the unit of every `created_at` column.
pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
