use anyhow::Context;
use pairchat::{app, db, live::SessionStore, AppState, Config};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pairchat=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let db_pool = db::connect(&config.database_url)
        .await
        .with_context(|| format!("failed to open {}", config.database_url))?;

    let sessions = SessionStore::new();
    let app = app(AppState::new(db_pool.clone(), sessions.clone()), &config);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!("server running on port {}", config.port);
    if config.production {
        tracing::info!("serving client from {}", config.client_dist.display());
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sessions.clear();
    db_pool.close().await;
    tracing::info!("bye");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {err}");
        std::future::pending::<()>().await;
    }
}
