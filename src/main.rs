use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use wellness_gateway::config::{self, Config};
use wellness_gateway::{build_orchestrator, http};

#[derive(Parser, Debug)]
#[command(name = "wellness-gateway", about = "Indicator-enriched chat gateway")]
struct Cli {
    /// Path to the TOML config file (defaults to $WELLNESS_GATEWAY_CONFIG or wellness_gateway.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen port, overrides REST_PORT
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // subscriber first so configuration warnings are not dropped
    Config::load_env_files();
    tracing_subscriber::fmt()
        .with_env_filter(config::log_filter(|key| std::env::var(key).ok()))
        .init();

    let mut config = Config::load(cli.config.as_deref()).map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    info!(
        "Starting wellness-gateway: model={}, data_dir={}",
        config.generation.model,
        config.data.dir.display()
    );

    let orchestrator = build_orchestrator(&config).map_err(|e| {
        eprintln!("Failed to initialize pipeline: {:#}", e);
        e
    })?;
    info!(
        "Datasets available for topics: {:?}",
        orchestrator.datasets().topics()
    );

    let state = http::HttpState::new(Arc::new(orchestrator));
    http::start_http_server(&config, state).await
}
