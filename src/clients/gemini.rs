//! Gemini REST client (`models/{model}:generateContent`)

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::clients::traits::{GenerateContentResponse, Generator};
use crate::config::GenerationConfig;
use crate::error::{GatewayError, Result};

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Clone, Debug)]
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    timeout_ms: u64,
}

impl GeminiClient {
    pub fn new(endpoint: &str, model: &str, api_key: &str, timeout_ms: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| GatewayError::Config {
                message: format!("Failed to create Gemini client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            timeout_ms,
        })
    }

    pub fn from_config(config: &GenerationConfig, api_key: &str) -> Result<Self> {
        Self::new(&config.endpoint, &config.model, api_key, config.timeout_ms)
    }

    pub fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    /// Transport failures are upstream errors, except running out of time.
    fn request_error(&self, err: reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            GatewayError::Timeout {
                operation: format!("{} generateContent", self.model),
                timeout_ms: self.timeout_ms,
            }
        } else {
            GatewayError::from(err)
        }
    }
}

#[async_trait]
impl Generator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<GenerateContentResponse> {
        debug!(model = %self.model, chars = prompt.len(), "calling Gemini");

        let body = json!({
            "contents": [
                {"role": "user", "parts": [{"text": prompt}]}
            ]
        });

        let resp = self
            .client
            .post(self.url())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        // Check response status before parsing
        let status = resp.status();
        if !status.is_success() {
            let text = resp
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            return Err(GatewayError::Generation {
                message: format!(
                    "Gemini returned {}: {}",
                    status.as_u16(),
                    truncate_snippet(text.trim(), 300)
                ),
            });
        }

        resp.json::<GenerateContentResponse>().await.map_err(|e| {
            if e.is_timeout() {
                self.request_error(e)
            } else {
                GatewayError::Generation {
                    message: format!("Failed to parse Gemini response: {}", e),
                }
            }
        })
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn truncate_snippet(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{}…", truncated)
}
