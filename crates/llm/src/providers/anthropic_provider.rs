use super::{ChatProvider, LlmRequest, LlmResponse, ProviderHealth, ProviderId, TokenUsage};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
// Anthropic tends to be slower than the OpenAI-compatible endpoints.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(90);

/// Adapter for the Anthropic messages API.
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl AnthropicProvider {
    pub fn new(api_key: String, model: String, base_url: Option<String>) -> Result<Self> {
        if api_key.is_empty() {
            return Err(anyhow!("Anthropic API key cannot be empty"));
        }

        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            api_key,
            model,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    fn build_request(&self, request: &LlmRequest, max_tokens: u32) -> MessagesRequest {
        MessagesRequest {
            model: self.model.clone(),
            max_tokens,
            system: request.system_prompt.clone(),
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: request.prompt.clone(),
            }],
            temperature: request.temperature,
        }
    }
}

#[async_trait]
impl ChatProvider for AnthropicProvider {
    fn id(&self) -> ProviderId {
        ProviderId::new("anthropic", &self.model)
    }

    async fn health_check(&self) -> Result<ProviderHealth> {
        let start = Instant::now();
        let probe = self.build_request(&LlmRequest::new("ping"), 1);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&probe)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                let elapsed = start.elapsed();
                if elapsed > Duration::from_secs(15) {
                    info!(
                        "Anthropic health check: DEGRADED (slow response: {:?})",
                        elapsed
                    );
                    Ok(ProviderHealth::Degraded)
                } else {
                    debug!("Anthropic health check: HEALTHY ({:?})", elapsed);
                    Ok(ProviderHealth::Healthy)
                }
            }
            Ok(resp) => {
                error!("Anthropic health check failed: status {}", resp.status());
                Ok(ProviderHealth::Unavailable)
            }
            Err(e) => {
                error!("Anthropic health check failed: {}", e);
                Ok(ProviderHealth::Unavailable)
            }
        }
    }

    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        let start = Instant::now();
        let payload = self.build_request(&request, request.max_tokens.unwrap_or(1024));

        debug!(
            "Sending completion request to Anthropic (model: {})",
            self.model
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Anthropic API error ({}): {}", status, error_text);
            return Err(anyhow!("Anthropic API error ({}): {}", status, error_text));
        }

        let messages_response: MessagesResponse = response.json().await?;
        let elapsed = start.elapsed();

        let content_block = messages_response
            .content
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Empty response from Anthropic"))?;

        let usage = messages_response
            .usage
            .map(|u| TokenUsage::new(u.input_tokens, u.output_tokens))
            .unwrap_or_else(|| TokenUsage::estimate(&request.prompt, &content_block.text));

        info!(
            "Received Anthropic response ({:?}): {} tokens",
            elapsed, usage.total_tokens
        );

        Ok(LlmResponse {
            content: content_block.text,
            usage,
            model: self.model.clone(),
            response_time: elapsed,
        })
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_creation() {
        let provider = AnthropicProvider::new(
            "test-api-key".to_string(),
            "claude-3-5-haiku-20241022".to_string(),
            None,
        )
        .expect("provider should build");

        assert_eq!(provider.id().provider_type, "anthropic");
        assert_eq!(provider.endpoint(), "https://api.anthropic.com/v1/messages");
    }

    #[test]
    fn test_empty_api_key_rejected() {
        let result =
            AnthropicProvider::new(String::new(), "claude-3-5-haiku-20241022".to_string(), None);
        assert!(result.is_err());
    }
}
