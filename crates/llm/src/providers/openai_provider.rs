use super::{ChatProvider, LlmRequest, LlmResponse, ProviderHealth, ProviderId, TokenUsage};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Adapter for the OpenAI chat-completions API and compatible endpoints.
#[derive(Debug, Clone)]
pub struct OpenAIProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl OpenAIProvider {
    pub fn new(api_key: String, model: String, base_url: Option<String>) -> Result<Self> {
        if api_key.is_empty() {
            return Err(anyhow!("OpenAI API key cannot be empty"));
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
        format!("{}/chat/completions", self.base_url)
    }

    fn build_request(&self, request: &LlmRequest) -> ChatCompletionRequest {
        let mut messages = Vec::new();
        if let Some(system_prompt) = &request.system_prompt {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system_prompt.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });

        ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }
}

#[async_trait]
impl ChatProvider for OpenAIProvider {
    fn id(&self) -> ProviderId {
        ProviderId::new("openai", &self.model)
    }

    async fn health_check(&self) -> Result<ProviderHealth> {
        let start = Instant::now();
        let probe = self.build_request(&LlmRequest::new("ping").with_parameters(Some(1), Some(0.0)));

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&probe)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                let elapsed = start.elapsed();
                if elapsed > Duration::from_secs(10) {
                    info!("OpenAI health check: DEGRADED (slow response: {:?})", elapsed);
                    Ok(ProviderHealth::Degraded)
                } else {
                    debug!("OpenAI health check: HEALTHY ({:?})", elapsed);
                    Ok(ProviderHealth::Healthy)
                }
            }
            Ok(resp) => {
                error!("OpenAI health check failed: status {}", resp.status());
                Ok(ProviderHealth::Unavailable)
            }
            Err(e) => {
                error!("OpenAI health check failed: {}", e);
                Ok(ProviderHealth::Unavailable)
            }
        }
    }

    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        let start = Instant::now();
        let payload = self.build_request(&request);

        debug!("Sending completion request to OpenAI (model: {})", self.model);

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("OpenAI API error ({}): {}", status, error_text);
            return Err(anyhow!("OpenAI API error ({}): {}", status, error_text));
        }

        let completion: ChatCompletionResponse = response.json().await?;
        let elapsed = start.elapsed();

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Empty response from OpenAI"))?;

        let usage = completion
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_else(|| TokenUsage::estimate(&request.prompt, &choice.message.content));

        info!(
            "Received OpenAI response ({:?}): {} tokens",
            elapsed, usage.total_tokens
        );

        Ok(LlmResponse {
            content: choice.message.content,
            usage,
            model: self.model.clone(),
            response_time: elapsed,
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_creation() {
        let provider = OpenAIProvider::new(
            "test-api-key".to_string(),
            "gpt-4o-mini".to_string(),
            None,
        )
        .expect("provider should build");

        assert_eq!(provider.id().provider_type, "openai");
        assert_eq!(provider.id().model, "gpt-4o-mini");
        assert_eq!(provider.endpoint(), "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn test_empty_api_key_rejected() {
        let result = OpenAIProvider::new(String::new(), "gpt-4o-mini".to_string(), None);
        assert!(result.is_err());
    }

    #[test]
    fn test_custom_base_url_normalized() {
        let provider = OpenAIProvider::new(
            "key".to_string(),
            "gpt-4o-mini".to_string(),
            Some("http://localhost:8080/v1/".to_string()),
        )
        .expect("provider should build");
        assert_eq!(provider.endpoint(), "http://localhost:8080/v1/chat/completions");
    }
}
