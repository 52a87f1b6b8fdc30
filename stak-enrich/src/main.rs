//! stak-enrich - Profile enrichment service
//!
//! Serves the enrichment HTTP API and drains the background enrichment queue.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use stak_common::config::{default_config_path, load_toml_config, resolve_root_folder};
use stak_enrich::config::{resolve_llm_api_key, EnrichmentSettings};
use stak_enrich::db::SqliteEnrichmentStore;
use stak_enrich::services::{ChatCompletionClient, EnrichmentOrchestrator, EnrichmentQueue, MatchScorer};
use stak_enrich::AppState;

/// Database file name inside the root folder
const DATABASE_FILE: &str = "stak.db";

/// Command-line arguments for stak-enrich
#[derive(Parser, Debug)]
#[command(name = "stak-enrich")]
#[command(about = "Profile enrichment service for STAK Sync")]
#[command(version)]
struct Args {
    /// Root folder holding the database
    #[arg(short, long)]
    root_folder: Option<String>,

    /// TOML config file (default: ~/.config/stak/config.toml)
    #[arg(short, long, env = "STAK_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on (overrides bind_address in TOML)
    #[arg(short, long, env = "STAK_BIND_ADDRESS")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().or_else(default_config_path);
    let toml_config = match &config_path {
        Some(path) => load_toml_config(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Default::default(),
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&toml_config.logging.level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting stak-enrich (profile enrichment) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &config_path {
        info!("Config: {}", path.display());
    }

    let settings = EnrichmentSettings::from_toml(&toml_config).context("Invalid [enrichment] config")?;

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), "STAK_ROOT", Some(&toml_config));
    let db_path = root_folder.join(DATABASE_FILE);
    info!("Database: {}", db_path.display());

    let db_pool = stak_common::db::init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    let api_key = match resolve_llm_api_key(&db_pool, &toml_config).await {
        Ok(key) => Some(key),
        Err(e) => {
            warn!("{}", e);
            warn!("Continuing without an LLM API key; requests are sent unauthenticated");
            None
        }
    };

    let generator = Arc::new(
        ChatCompletionClient::from_config(&toml_config.llm, api_key)
            .context("Failed to build LLM client")?,
    );
    info!(model = %toml_config.llm.model, base_url = %toml_config.llm.base_url, "LLM client ready");

    let store = Arc::new(SqliteEnrichmentStore::new(db_pool.clone()));
    let orchestrator = Arc::new(EnrichmentOrchestrator::new(store, generator.clone(), &settings));
    let (queue, worker) = EnrichmentQueue::start(orchestrator, settings.queue_capacity);
    let match_scorer = Arc::new(MatchScorer::new(db_pool.clone(), generator));

    let state = AppState::new(db_pool, queue, match_scorer);
    let app = stak_enrich::build_router(state);

    let bind_address = args.bind.unwrap_or_else(|| toml_config.bind_address.clone());
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_address))?;
    info!("Listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Router state held the last queue handle; the worker drains and exits
    if let Err(e) = worker.await {
        warn!("Enrichment worker ended abnormally: {}", e);
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
