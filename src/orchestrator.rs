//! Per-request pipeline: resolve → classify → extract → compose → generate

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::classifier::IndicatorClassifier;
use crate::clients::Generator;
use crate::error::{GatewayError, Result};
use crate::geo::{CountryResolver, country_label};
use crate::prompts::{Topic, compose_enriched_prompt, compose_guidance, split_topic_and_query};
use crate::trend::{DatasetCatalog, Trend};

/// Everything derived for one message; built and dropped per request
#[derive(Debug, Clone)]
pub struct PromptContext {
    pub topic: Topic,
    pub country: Option<String>,
    pub indicator: Option<String>,
    pub trend: Trend,
    /// Text handed to the model
    pub prompt: String,
}

impl PromptContext {
    pub fn is_enriched(&self) -> bool {
        !self.trend.is_empty()
    }
}

pub struct RequestOrchestrator {
    classifier: IndicatorClassifier,
    geo: Arc<dyn CountryResolver>,
    datasets: Arc<DatasetCatalog>,
    generator: Arc<dyn Generator>,
    generation_timeout: Duration,
}

impl RequestOrchestrator {
    pub fn new(
        classifier: IndicatorClassifier,
        geo: Arc<dyn CountryResolver>,
        datasets: Arc<DatasetCatalog>,
        generator: Arc<dyn Generator>,
        generation_timeout: Duration,
    ) -> Self {
        Self {
            classifier,
            geo,
            datasets,
            generator,
            generation_timeout,
        }
    }

    pub fn datasets(&self) -> &DatasetCatalog {
        &self.datasets
    }

    pub fn model(&self) -> &str {
        self.generator.model()
    }

    /// Build the prompt for `message` without calling the model.
    pub async fn prepare(&self, message: &str, address: &str) -> Result<PromptContext> {
        let (topic, query) = split_topic_and_query(message);

        let country = self.geo.resolve_country(address).await;
        info!(
            address,
            country = country_label(country.as_deref()),
            topic = %topic,
            "resolved caller"
        );

        let guidance = compose_guidance(topic, query);

        // classification runs over the whole message, command included
        let indicator = self.classifier.classify_with_trigger(message).map(|hit| {
            debug!(indicator = hit.indicator, trigger = hit.trigger, rule = hit.rule_index, "indicator matched");
            hit.indicator.to_string()
        });

        let trend = match (&indicator, &country) {
            (Some(indicator), Some(country)) => {
                let datasets = self.datasets.clone();
                let (indicator, country) = (indicator.clone(), country.clone());
                tokio::task::spawn_blocking(move || datasets.trend(topic, &indicator, &country))
                    .await??
            }
            _ => Trend::default(),
        };

        let prompt = match &indicator {
            Some(name) if !trend.is_empty() => {
                info!(indicator = %name, points = trend.len(), "enriching prompt with trend");
                compose_enriched_prompt(&guidance, country_label(country.as_deref()), name, &trend)
            }
            _ => guidance,
        };

        Ok(PromptContext {
            topic,
            country,
            indicator,
            trend,
            prompt,
        })
    }

    /// Run the pipeline and return the model's reply text.
    ///
    /// The reply is the first text part of the first candidate, or an empty
    /// string when the model returned none.
    pub async fn handle(&self, message: &str, address: &str) -> Result<String> {
        let context = self.prepare(message, address).await?;
        debug!(
            topic = %context.topic,
            enriched = context.is_enriched(),
            prompt_chars = context.prompt.len(),
            "prompt ready"
        );

        let response = tokio::time::timeout(
            self.generation_timeout,
            self.generator.generate(&context.prompt),
        )
        .await
        .map_err(|_| GatewayError::Timeout {
            operation: format!("{} generateContent", self.generator.model()),
            timeout_ms: self.generation_timeout.as_millis() as u64,
        })??;

        let reply = response.first_text().unwrap_or_default().to_string();
        if reply.is_empty() {
            debug!("model returned no text part");
        }
        Ok(reply)
    }
}
