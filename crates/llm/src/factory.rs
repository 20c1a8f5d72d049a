//! Provider construction: a name-keyed registry of constructors plus an
//! explicit, caller-owned TTL cache. No process-wide singletons; whoever
//! needs caching owns the [`ProviderCache`] and passes it around.

use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::providers::{AnthropicProvider, ChatProvider, LocalProvider, OpenAIProvider};

const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-haiku-20241022";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";
const DEFAULT_LMSTUDIO_URL: &str = "http://localhost:1234";
const DEFAULT_LMSTUDIO_MODEL: &str = "local-model";

/// Settings for constructing one provider instance.
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    /// Registry key: `openai`, `anthropic`, `ollama`, `lmstudio`, `local`.
    pub provider: String,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

impl ProviderSettings {
    pub fn new(provider: &str) -> Self {
        Self {
            provider: provider.to_string(),
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url;
        self
    }

    /// Cache key: provider name plus effective model.
    fn cache_key(&self) -> String {
        format!(
            "{}:{}",
            self.provider,
            self.model.as_deref().unwrap_or("default")
        )
    }
}

type ProviderCtor = fn(&ProviderSettings) -> Result<Arc<dyn ChatProvider>>;

/// Map of constructors keyed by provider name.
pub struct ProviderRegistry {
    ctors: HashMap<String, ProviderCtor>,
}

impl ProviderRegistry {
    /// Registry pre-populated with the built-in backends.
    pub fn with_defaults() -> Self {
        let mut registry = Self {
            ctors: HashMap::new(),
        };
        registry.register("openai", build_openai);
        registry.register("anthropic", build_anthropic);
        registry.register("ollama", build_ollama);
        registry.register("lmstudio", build_lmstudio);
        registry.register("local", build_lmstudio);
        registry
    }

    pub fn register(&mut self, name: &str, ctor: ProviderCtor) {
        self.ctors.insert(name.to_string(), ctor);
    }

    pub fn create(&self, settings: &ProviderSettings) -> Result<Arc<dyn ChatProvider>> {
        let ctor = self.ctors.get(&settings.provider).ok_or_else(|| {
            anyhow!(
                "Unknown provider '{}'. Known providers: {}",
                settings.provider,
                self.known().join(", ")
            )
        })?;
        ctor(settings)
    }

    pub fn known(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.ctors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn build_openai(settings: &ProviderSettings) -> Result<Arc<dyn ChatProvider>> {
    let api_key = settings
        .api_key
        .clone()
        .ok_or_else(|| anyhow!("OpenAI API key is required"))?;
    let model = settings
        .model
        .clone()
        .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());
    Ok(Arc::new(OpenAIProvider::new(
        api_key,
        model,
        settings.base_url.clone(),
    )?))
}

fn build_anthropic(settings: &ProviderSettings) -> Result<Arc<dyn ChatProvider>> {
    let api_key = settings
        .api_key
        .clone()
        .ok_or_else(|| anyhow!("Anthropic API key is required"))?;
    let model = settings
        .model
        .clone()
        .unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string());
    Ok(Arc::new(AnthropicProvider::new(
        api_key,
        model,
        settings.base_url.clone(),
    )?))
}

fn build_ollama(settings: &ProviderSettings) -> Result<Arc<dyn ChatProvider>> {
    let base_url = settings
        .base_url
        .clone()
        .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
    let model = settings
        .model
        .clone()
        .unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string());
    Ok(Arc::new(LocalProvider::new(
        base_url,
        model,
        "ollama".to_string(),
    )?))
}

fn build_lmstudio(settings: &ProviderSettings) -> Result<Arc<dyn ChatProvider>> {
    let base_url = settings
        .base_url
        .clone()
        .unwrap_or_else(|| DEFAULT_LMSTUDIO_URL.to_string());
    let model = settings
        .model
        .clone()
        .unwrap_or_else(|| DEFAULT_LMSTUDIO_MODEL.to_string());
    Ok(Arc::new(LocalProvider::new(
        base_url,
        model,
        settings.provider.clone(),
    )?))
}

/// Explicit instance cache with per-entry expiry. Owned by the caller and
/// passed into lookups; constructing a provider rebuilds an HTTP client,
/// which is worth avoiding within one process lifetime.
pub struct ProviderCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

struct CacheEntry {
    provider: Arc<dyn ChatProvider>,
    created_at: Instant,
}

impl ProviderCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return a cached instance when one is still fresh, otherwise build a
    /// new one through the registry and remember it.
    pub fn get_or_create(
        &self,
        registry: &ProviderRegistry,
        settings: &ProviderSettings,
    ) -> Result<Arc<dyn ChatProvider>> {
        let key = settings.cache_key();
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow!("Provider cache lock poisoned"))?;

        if let Some(entry) = entries.get(&key) {
            if entry.created_at.elapsed() < self.ttl {
                debug!("Provider cache hit for {}", key);
                return Ok(Arc::clone(&entry.provider));
            }
            debug!("Provider cache entry for {} expired", key);
        }

        let provider = registry.create(settings)?;
        entries.insert(
            key,
            CacheEntry {
                provider: Arc::clone(&provider),
                created_at: Instant::now(),
            },
        );
        Ok(provider)
    }
}
