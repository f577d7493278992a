//! Print the prompt the gateway would send for a message, without calling
//! ipinfo or Gemini.
//!
//! cargo run --bin prompt_preview -- --country India "/education I want to learn to read"

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use wellness_gateway::classifier::IndicatorClassifier;
use wellness_gateway::geo::countries::country_name;
use wellness_gateway::prompts::{compose_enriched_prompt, compose_guidance, split_topic_and_query};
use wellness_gateway::trend::DatasetCatalog;

#[derive(Parser, Debug)]
#[command(name = "prompt_preview")]
struct Args {
    /// Chat message, optionally starting with /health, /career or /education
    message: String,

    /// Country name as it appears in the datasets
    #[arg(long, conflicts_with = "code")]
    country: Option<String>,

    /// Two-letter country code, mapped the same way as geolocation results
    #[arg(long)]
    code: Option<String>,

    /// Dataset directory
    #[arg(long, env = "WG_DATA_DIR", default_value = "world_bank_data")]
    data_dir: PathBuf,
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let country = match (&args.country, &args.code) {
        (Some(name), _) => Some(name.clone()),
        (None, Some(code)) => country_name(code).map(str::to_string),
        (None, None) => None,
    };

    let (topic, query) = split_topic_and_query(&args.message);
    let guidance = compose_guidance(topic, query);
    let classifier = IndicatorClassifier::default();
    let hit = classifier.classify_with_trigger(&args.message);

    println!("🧭 topic: {}", topic);
    println!("🌍 country: {}", country.as_deref().unwrap_or("Unknown"));
    match &hit {
        Some(hit) => {
            println!(
                "📊 indicator: {} (rule #{}, trigger {:?})",
                hit.indicator, hit.rule_index, hit.trigger
            );
            if let Some(rule) = classifier.rules().get(hit.rule_index) {
                println!("   rule triggers ({:?}): {}", rule.mode, rule.triggers.join(", "));
            }
        }
        None => println!("📊 indicator: none"),
    }

    let prompt = match (&hit, &country) {
        (Some(hit), Some(country)) => {
            let catalog = DatasetCatalog::discover(&args.data_dir, 0)?;
            let trend = catalog.trend(topic, hit.indicator, country)?;
            println!("📈 trend points: {}", trend.len());
            compose_enriched_prompt(&guidance, country, hit.indicator, &trend)
        }
        _ => guidance,
    };

    println!("\n----- prompt -----\n{}", prompt);
    Ok(())
}
