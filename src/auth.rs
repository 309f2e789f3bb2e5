use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    routing::{get, post, put},
    Router,
};
use rand::seq::IndexedRandom;
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    db::{self, User, USER_COLUMNS},
    session::USER_ID,
    AppError, AppState,
};

mod check;
mod login;
mod logout;
mod password;
mod profile;
mod signup;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup::signup))
        .route("/login", post(login::login))
        .route("/logout", post(logout::logout))
        .route("/check", get(check::check_auth))
        .route("/update-profile", put(profile::update_profile))
}

/// The user behind the request's session cookie. Rejects with 401 when
/// there is no session or its user no longer exists.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    SqlitePool: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(status, message)| AppError::new(status, message))?;

        let Some(user_id) = session.get::<String>(USER_ID).await? else {
            return Err(AppError::unauthorized("Unauthorized - No session"));
        };

        let db_pool = SqlitePool::from_ref(state);
        let Some(user) = find_user(&db_pool, &user_id).await? else {
            return Err(AppError::unauthorized("Unauthorized - User not found"));
        };

        Ok(CurrentUser(user))
    }
}

pub async fn find_user(db_pool: &SqlitePool, user_id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id=?"))
        .bind(user_id)
        .fetch_optional(db_pool)
        .await
}

fn random_alias() -> String {
    let adjectives = [
        "Quick", "Lazy", "Mysterious", "Jolly", "Brave", "Silent", "Witty", "Fierce",
        "Clever", "Gentle", "Wild", "Calm", "Bold", "Shy", "Proud", "Happy",
        "Eager", "Fancy", "Rusty", "Golden", "Silver", "Bright", "Dark", "Lucky",
    ];
    let nouns = [
        "Fox", "Bear", "Eagle", "Wolf", "Dragon", "Tiger", "Lion", "Owl", "Rabbit",
        "Falcon", "Hawk", "Shark", "Panda", "Kitten", "Puppy", "Phoenix", "Griffin",
        "Unicorn", "Turtle", "Dolphin", "Whale", "Elephant", "Giraffe", "Zebra",
    ];

    let mut rng = rand::rng();
    format!(
        "{} {}",
        adjectives.choose(&mut rng).unwrap_or(&"Nameless"),
        nouns.choose(&mut rng).unwrap_or(&"User"),
    )
}

/// Insert a user row. A blank `full_name` gets a generated alias.
pub(crate) async fn create_user(
    db_pool: &SqlitePool,
    full_name: Option<&str>,
    email: &str,
    password_hash: &str,
) -> Result<User, sqlx::Error> {
    let full_name = match full_name.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_owned(),
        _ => random_alias(),
    };

    let user = User {
        id: Uuid::now_v7().to_string(),
        email: email.to_owned(),
        full_name,
        profile_pic: String::new(),
        created_at: db::now_millis(),
    };

    tracing::info!(user_id = %user.id, full_name = %user.full_name, "adding user");
    sqlx::query("INSERT INTO users (id,email,full_name,password_hash,profile_pic,created_at) VALUES (?,?,?,?,?,?)")
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(password_hash)
        .bind(&user.profile_pic)
        .bind(user.created_at)
        .execute(db_pool)
        .await?;

    Ok(user)
}
