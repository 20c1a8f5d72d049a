use super::{ChatProvider, LlmRequest, LlmResponse, ProviderHealth, ProviderId, TokenUsage};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

// Local inference servers load models lazily; the first request can be slow.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Adapter for local OpenAI-compatible inference servers (Ollama,
/// LM Studio, llama.cpp server and friends).
#[derive(Debug, Clone)]
pub struct LocalProvider {
    base_url: String,
    model: String,
    kind: String,
    client: Client,
}

impl LocalProvider {
    pub fn new(base_url: String, model: String, kind: String) -> Result<Self> {
        if base_url.is_empty() {
            return Err(anyhow!("Local provider URL cannot be empty"));
        }

        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            base_url: normalize_base_url(&base_url),
            model,
            kind,
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }
}

/// Accept URLs with or without a trailing slash or `/v1` suffix.
fn normalize_base_url(url: &str) -> String {
    let mut base = url.trim_end_matches('/');
    if let Some(stripped) = base.strip_suffix("/v1") {
        base = stripped;
    }
    base.to_string()
}

#[async_trait]
impl ChatProvider for LocalProvider {
    fn id(&self) -> ProviderId {
        ProviderId::new(&self.kind, &self.model)
    }

    async fn health_check(&self) -> Result<ProviderHealth> {
        // Listing models is cheap and does not force a model load.
        let response = self
            .client
            .get(format!("{}/v1/models", self.base_url))
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                debug!("Local provider {} reachable at {}", self.kind, self.base_url);
                Ok(ProviderHealth::Healthy)
            }
            Ok(resp) => {
                error!(
                    "Local provider health check failed: status {}",
                    resp.status()
                );
                Ok(ProviderHealth::Unavailable)
            }
            Err(e) => {
                error!("Local provider health check failed: {}", e);
                Ok(ProviderHealth::Unavailable)
            }
        }
    }

    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        let start = Instant::now();

        let mut messages = Vec::new();
        if let Some(system_prompt) = &request.system_prompt {
            messages.push(LocalMessage {
                role: "system".to_string(),
                content: system_prompt.clone(),
            });
        }
        messages.push(LocalMessage {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });

        let payload = LocalChatRequest {
            model: self.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        debug!(
            "Sending completion request to local backend {} (model: {})",
            self.base_url, self.model
        );

        let response = self.client.post(self.endpoint()).json(&payload).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Local backend error ({}): {}", status, error_text);
            return Err(anyhow!("Local backend error ({}): {}", status, error_text));
        }

        let completion: LocalChatResponse = response.json().await?;
        let elapsed = start.elapsed();

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Empty response from local backend"))?;

        let usage = TokenUsage::estimate(&request.prompt, &choice.message.content);

        info!("Received local backend response ({:?})", elapsed);

        Ok(LlmResponse {
            content: choice.message.content,
            usage,
            model: self.model.clone(),
            response_time: elapsed,
        })
    }
}

#[derive(Debug, Serialize)]
struct LocalChatRequest {
    model: String,
    messages: Vec<LocalMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LocalMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct LocalChatResponse {
    choices: Vec<LocalChoice>,
}

#[derive(Debug, Deserialize)]
struct LocalChoice {
    message: LocalMessage,
}
