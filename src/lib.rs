pub mod classifier;
pub mod clients;
pub mod config;
pub mod error;
pub mod geo;
pub mod http;
pub mod orchestrator;
pub mod prompts;
pub mod trend;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use crate::classifier::IndicatorClassifier;
use crate::clients::GeminiClient;
use crate::config::Config;
use crate::geo::IpInfoResolver;
use crate::orchestrator::RequestOrchestrator;
use crate::trend::DatasetCatalog;

/// Build the production pipeline from configuration.
///
/// Every failure here is a startup error: missing API key, a dataset that
/// cannot be parsed, or an HTTP client that cannot be constructed.
pub fn build_orchestrator(config: &Config) -> Result<RequestOrchestrator> {
    let api_key = config.api_key().context("GEMINI_API_KEY not set")?;

    let datasets = DatasetCatalog::discover(&config.data.dir, config.data.cache_max)
        .context("Failed to load datasets")?;
    let geo = IpInfoResolver::from_config(&config.geo)?;
    let generator = GeminiClient::from_config(&config.generation, api_key)?;

    Ok(RequestOrchestrator::new(
        IndicatorClassifier::default(),
        Arc::new(geo),
        Arc::new(datasets),
        Arc::new(generator),
        Duration::from_millis(config.generation.timeout_ms),
    ))
}
