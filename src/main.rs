use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use task_manager_api::config::AppConfig;
use task_manager_api::database::{DatabaseManager, MemoryStore, PgStore, Store};
use task_manager_api::{app, AppState};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StoreKind {
    Postgres,
    Memory,
}

#[derive(Parser)]
#[command(name = "task-manager-api")]
#[command(about = "Multi-user task tracking API server")]
#[command(version)]
struct Args {
    #[arg(long, value_enum, default_value = "postgres", help = "Storage backend")]
    store: StoreKind,

    #[arg(long, help = "Listen port (overrides TASK_API_PORT / PORT)")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!("Starting Task Manager API in {:?} mode", config.environment);

    let store: Arc<dyn Store> = match args.store {
        StoreKind::Postgres => {
            let pool = DatabaseManager::connect(&config.database)
                .await
                .context("failed to connect to PostgreSQL")?;
            Arc::new(PgStore::new(pool))
        }
        StoreKind::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let port = args.port.unwrap_or(config.server.port);
    let state = AppState::new(config, store).context("failed to initialise credential store")?;

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Task Manager API listening on http://{}", bind_addr);

    axum::serve(listener, app(state)).await.context("server error")?;
    Ok(())
}
