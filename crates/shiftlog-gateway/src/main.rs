use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use shiftlog_core::config::ShiftlogConfig;
use shiftlog_core::SystemClock;
use shiftlog_store::WorkStore;
use tracing::info;

mod app;
mod auth;
mod http;

#[derive(Debug, Parser)]
#[command(name = "shiftlog-gateway", version, about = "Personal work-time tracker HTTP gateway")]
struct Args {
    /// Path to shiftlog.toml (defaults to $SHIFTLOG_CONFIG, then ~/.shiftlog/shiftlog.toml)
    #[arg(long)]
    config: Option<String>,
    /// Override the bind address
    #[arg(long)]
    bind: Option<String>,
    /// Override the listen port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shiftlog_gateway=info,tower_http=debug".into()),
        )
        .init();

    let args = Args::parse();

    // load config: --config > SHIFTLOG_CONFIG env > ~/.shiftlog/shiftlog.toml
    let config_path = args.config.or_else(|| std::env::var("SHIFTLOG_CONFIG").ok());
    let mut config = ShiftlogConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        ShiftlogConfig::default()
    });
    if let Some(bind) = args.bind {
        config.gateway.bind = bind;
    }
    if let Some(port) = args.port {
        config.gateway.port = port;
    }

    let db_path = config.database.path.clone();
    ensure_parent_dir(&db_path);
    info!(path = %db_path, "opening SQLite database");
    let store = WorkStore::open(&db_path)?;
    info!("database migrations complete");

    let identity = auth::from_config(&config.auth);
    info!(mode = identity.name(), "identity provider ready");

    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;
    let state = Arc::new(app::AppState::new(config, store, Arc::new(SystemClock), identity));
    let router = app::build_router(state);

    info!("Shiftlog gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

/// Create the database's parent directory if it does not exist yet.
fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!(dir = %parent.display(), error = %e, "could not create database directory");
            }
        }
    }
}
