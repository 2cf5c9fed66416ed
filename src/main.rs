use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use wellhub::ai::GeminiClient;
use wellhub::auth::session;
use wellhub::config::{Cli, Config};
use wellhub::db;
use wellhub::media::MediaStore;
use wellhub::routes;
use wellhub::state::AppState;

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
    let data_dir = Config::data_dir(&cli)?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data directory {}", data_dir.display()))?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Initialize database
    let pool = db::create_pool(&config.db_path())?;
    db::run_migrations(&pool)?;
    {
        let conn = pool.get()?;
        let purged = session::purge_expired(&conn)?;
        if purged > 0 {
            tracing::info!("Purged {} expired sessions", purged);
        }
    }

    let media = MediaStore::open(config.uploads_path())
        .with_context(|| format!("opening media store {}", config.uploads_path().display()))?;

    let ai = GeminiClient::new(&config.ai)?;
    if config.ai.api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY is not set; AI recommendations will be unavailable");
    }

    let state = AppState {
        db: pool,
        config: config.clone(),
        media,
        ai: Arc::new(ai),
    };
    let app = routes::router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
