use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod anthropic_provider;
pub mod local_provider;
pub mod openai_provider;

pub use anthropic_provider::AnthropicProvider;
pub use local_provider::LocalProvider;
pub use openai_provider::OpenAIProvider;

/// Request object for completion backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl LlmRequest {
    pub fn new(prompt: &str) -> Self {
        Self {
            prompt: prompt.to_string(),
            system_prompt: None,
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: &str) -> Self {
        self.system_prompt = Some(system_prompt.to_string());
        self
    }

    pub fn with_parameters(mut self, max_tokens: Option<u32>, temperature: Option<f32>) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }
}

/// Response object from completion backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    pub usage: TokenUsage,
    pub model: String,
    pub response_time: Duration,
}

/// Token usage statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }

    /// Rough fallback when a backend omits usage accounting.
    pub fn estimate(prompt: &str, completion: &str) -> Self {
        Self::new(prompt.len() as u32 / 4, completion.len() as u32 / 4)
    }
}

/// Backend health as observed by a lightweight probe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProviderHealth {
    Healthy,
    Degraded,
    Unavailable,
}

/// Provider identification.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderId {
    pub provider_type: String,
    pub model: String,
}

impl ProviderId {
    pub fn new(provider_type: &str, model: &str) -> Self {
        Self {
            provider_type: provider_type.to_string(),
            model: model.to_string(),
        }
    }
}

/// The narrow completion capability every generative backend is reduced to.
/// Transport failures surface as errors; the retry layer is the only
/// consumer that observes them directly.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Unique identifier for this provider instance.
    fn id(&self) -> ProviderId;

    /// Probe backend availability with a minimal request.
    async fn health_check(&self) -> Result<ProviderHealth>;

    /// Execute one completion request.
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse>;

    /// Human-readable name.
    fn name(&self) -> String {
        let id = self.id();
        format!("{} ({})", id.provider_type, id.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = LlmRequest::new("hello")
            .with_system_prompt("be terse")
            .with_parameters(Some(256), Some(0.3));
        assert_eq!(request.prompt, "hello");
        assert_eq!(request.system_prompt.as_deref(), Some("be terse"));
        assert_eq!(request.max_tokens, Some(256));
        assert_eq!(request.temperature, Some(0.3));
    }

    #[test]
    fn test_token_usage_totals() {
        let usage = TokenUsage::new(120, 30);
        assert_eq!(usage.total_tokens, 150);
    }
}
