use std::{fmt, sync::Arc};

use anyhow::{anyhow, Context};
use reqwest::{
    cookie::{CookieStore, Jar},
    header::HeaderValue,
    StatusCode, Url,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::db::{Message, User};

/// A non-2xx answer from the server, carrying its `message` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.status)
    }
}

impl std::error::Error for ApiError {}

/// HTTP client for the chat API. Keeps the session cookie in its own jar,
/// which the live socket reuses for its handshake.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    jar: Arc<Jar>,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url).with_context(|| format!("bad base url {base_url}"))?;
        let jar = Arc::new(Jar::default());
        let http = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .build()?;

        Ok(Self { http, jar, base_url })
    }

    fn url(&self, path: &str) -> anyhow::Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// `ws://` (or `wss://`) address of the live channel.
    pub fn live_url(&self) -> anyhow::Result<Url> {
        let mut url = self.url("/ws")?;
        let scheme = if self.base_url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|()| anyhow!("cannot turn {} into a websocket url", self.base_url))?;
        Ok(url)
    }

    /// Cookies the jar would send to the server, for the websocket handshake.
    pub fn cookie_header(&self) -> Option<HeaderValue> {
        self.jar.cookies(&self.base_url)
    }

    pub async fn signup(&self, full_name: Option<&str>, email: &str, password: &str) -> anyhow::Result<User> {
        let body = json!({ "fullName": full_name, "email": email, "password": password });
        decode(self.http.post(self.url("/api/auth/signup")?).json(&body).send().await?).await
    }

    pub async fn login(&self, email: &str, password: &str) -> anyhow::Result<User> {
        let body = json!({ "email": email, "password": password });
        decode(self.http.post(self.url("/api/auth/login")?).json(&body).send().await?).await
    }

    pub async fn logout(&self) -> anyhow::Result<()> {
        let _: Value = decode(self.http.post(self.url("/api/auth/logout")?).send().await?).await?;
        Ok(())
    }

    pub async fn check(&self) -> anyhow::Result<User> {
        decode(self.http.get(self.url("/api/auth/check")?).send().await?).await
    }

    pub async fn update_profile(&self, profile_pic: Option<&str>, full_name: Option<&str>) -> anyhow::Result<User> {
        let body = json!({ "profilePic": profile_pic, "fullName": full_name });
        decode(self.http.put(self.url("/api/auth/update-profile")?).json(&body).send().await?).await
    }

    pub async fn users(&self) -> anyhow::Result<Vec<User>> {
        decode(self.http.get(self.url("/api/messages/users")?).send().await?).await
    }

    pub async fn messages(&self, user_id: &str) -> anyhow::Result<Vec<Message>> {
        decode(self.http.get(self.url(&format!("/api/messages/{user_id}"))?).send().await?).await
    }

    pub async fn send_message(
        &self,
        user_id: &str,
        text: Option<&str>,
        image: Option<&str>,
    ) -> anyhow::Result<Message> {
        let body = json!({ "text": text, "image": image });
        let url = self.url(&format!("/api/messages/send/{user_id}"))?;
        decode(self.http.post(url).json(&body).send().await?).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> anyhow::Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let message = response
        .json::<Value>()
        .await
        .ok()
        .and_then(|body| body.get("message")?.as_str().map(str::to_owned))
        .unwrap_or_else(|| status.to_string());

    Err(ApiError { status, message }.into())
}
