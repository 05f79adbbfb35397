//! # Courier: periodic outbound message dispatcher
//!
//! Usage:
//!   courier                          # Start with ~/.courier/config.toml
//!   courier --config ./courier.toml  # Custom config file
//!   courier --port 9000 --verbose    # Override port, debug logging

use anyhow::Result;
use clap::Parser;
use courier_core::config::CourierConfig;
use courier_core::traits::{DeliveryClient, MessageStore};
use courier_gateway::AppState;
use courier_scheduler::{
    BatchExecutor, BatchSettings, Scheduler, SchedulerSettings, SqliteMessageStore, WebhookClient,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "courier",
    version,
    about = "📨 Courier: periodic webhook message dispatcher"
)]
struct Cli {
    /// Config file (default: $COURIER_CONFIG or ~/.courier/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// HTTP port, overrides config and PORT
    #[arg(short, long)]
    port: Option<u16>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn expand_path(p: &str) -> String {
    shellexpand::tilde(p).to_string()
}

fn env_config_path() -> Option<String> {
    std::env::var("COURIER_CONFIG").ok().filter(|p| !p.is_empty())
}

fn load_config(cli: &Cli) -> Result<CourierConfig> {
    let explicit = cli.config.clone().or_else(env_config_path);

    let mut config = match explicit {
        Some(path) => {
            let path = PathBuf::from(expand_path(&path));
            tracing::info!("📄 Loading config from {}", path.display());
            CourierConfig::load_from(&path)?
        }
        None => CourierConfig::load()?,
    };

    config.apply_env_overrides();
    if let Some(port) = cli.port {
        config.gateway.port = port;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "courier=debug,tower_http=debug"
    } else {
        "courier=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let config = load_config(&cli)?;

    // Open message store
    let db_path = PathBuf::from(expand_path(&config.database.path));
    let store: Arc<dyn MessageStore> = Arc::new(SqliteMessageStore::open(&db_path)?);
    tracing::info!("💾 Message store: {}", db_path.display());

    // Wire delivery pipeline
    let webhook = WebhookClient::from_config(&config.webhook)?;
    tracing::info!("📮 Webhook endpoint: {}", webhook.url());
    let client: Arc<dyn DeliveryClient> = Arc::new(webhook);
    let batch_settings = BatchSettings::from_config(&config.scheduler);
    let executor = BatchExecutor::new(store.clone(), client, batch_settings);
    let scheduler_settings = SchedulerSettings::from_config(&config);
    let scheduler = Arc::new(Scheduler::new(Arc::new(executor), scheduler_settings));
    tracing::info!(
        "📦 Batch size {}, char limit {}",
        batch_settings.max_per_tick,
        batch_settings.char_limit
    );

    if config.scheduler.autostart {
        scheduler.start().await;
    }

    let state = AppState {
        gateway_config: config.gateway.clone(),
        scheduler: scheduler.clone(),
        store,
        char_limit: batch_settings.char_limit,
        start_time: std::time::Instant::now(),
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
        tracing::info!("👋 Shutdown requested");
    };

    let served = courier_gateway::start(state, shutdown).await;

    // No tick may be left in flight once we exit
    scheduler.stop().await;
    served
}
