#![allow(dead_code)]

use std::time::Duration;

use pairchat::{app, client::ApiClient, db, db::User, live::SessionStore, AppState, Config};
use tokio::sync::oneshot;

pub struct TestServer {
    pub base_url: String,
    pub sessions: SessionStore,
    shutdown: Option<oneshot::Sender<()>>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

pub async fn start_server() -> TestServer {
    let db_pool = db::connect("sqlite::memory:").await.expect("in-memory db");
    let sessions = SessionStore::new();
    let app = app(AppState::new(db_pool, sessions.clone()), &Config::default());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (shutdown, shutdown_rx) = oneshot::channel();

    let server = axum::serve(listener, app).with_graceful_shutdown(async {
        let _ = shutdown_rx.await;
    });
    tokio::spawn(async move {
        let _ = server.await;
    });

    TestServer {
        base_url: format!("http://{addr}"),
        sessions,
        shutdown: Some(shutdown),
    }
}

impl TestServer {
    /// A fresh client signed up (and so logged in) as `name`.
    pub async fn user(&self, name: &str) -> (ApiClient, User) {
        let api = ApiClient::new(&self.base_url).expect("client");
        let user = api
            .signup(Some(name), &format!("{name}@example.com"), "password123")
            .await
            .expect("signup");
        (api, user)
    }
}

/// Poll `check` until it holds or two seconds pass.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}
