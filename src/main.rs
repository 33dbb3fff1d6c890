use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use forum::auth::session::SessionStore;
use forum::config::{Cli, Config};
use forum::state::AppState;
use forum::{db, routes, tls};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Ensure uploads directory exists
    std::fs::create_dir_all(config.uploads_path())?;

    // Initialize database
    let pool = db::create_pool(&config.db_path())?;
    db::run_migrations(&pool)?;

    let state = AppState::new(pool, config.clone());
    spawn_session_purge(
        state.sessions.clone(),
        Duration::from_secs(config.auth.purge_interval_minutes.max(1) * 60),
    );

    for (name, provider) in [("Google", &config.oauth.google), ("GitHub", &config.oauth.github)] {
        if !provider.is_enabled() {
            tracing::info!("{} sign-in disabled (no client id configured)", name);
        }
    }

    let app = routes::app(state);
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    if config.tls.enabled {
        let (cert_path, key_path) = config.tls_paths();
        tls::ensure_cert(&cert_path, &key_path)?;
        let rustls = tls::load_rustls_config(&cert_path, &key_path).await?;

        tracing::info!("Listening on https://{}", addr);
        axum_server::bind_rustls(addr, rustls)
            .serve(app.into_make_service())
            .await?;
    } else {
        tracing::info!("Listening on http://{}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;
    }

    Ok(())
}

/// Periodically delete expired session rows.
fn spawn_session_purge(sessions: SessionStore, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let store = sessions.clone();
            match tokio::task::spawn_blocking(move || store.purge_expired()).await {
                Ok(Ok(0)) => {}
                Ok(Ok(n)) => tracing::info!("Purged {} expired sessions", n),
                Ok(Err(e)) => tracing::error!("Session purge failed: {}", e),
                Err(e) => tracing::error!("Session purge task panicked: {}", e),
            }
        }
    });
}
