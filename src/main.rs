use maze_vault::config::Config;
use maze_vault::db::VaultStorage;
use maze_vault::router::{MazeState, maze_router};
use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        listen_addr = %cfg.basic.listen_addr,
        database_url = %cfg.basic.database_url,
        loglevel = %cfg.basic.loglevel,
        admin_enabled = cfg.admin_enabled(),
        breach_lookup = cfg.breach.api_key.is_some(),
        trust_user_id_header = cfg.security.trust_user_id_header
    );
    if !cfg.admin_enabled() {
        warn!("security.admin_key is empty; admin endpoints are disabled");
    }
    if cfg.security.trust_user_id_header {
        warn!("X-User-ID header authentication is enabled; use only behind a trusted proxy");
    }

    let storage =
        VaultStorage::connect(&cfg.basic.database_url, cfg.basic.max_connections).await?;

    let addr = cfg.basic.listen_addr.clone();
    let state = MazeState::new(storage, cfg)?;
    let app = maze_router(state);

    let listener = TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
