//! Generative backend for PR title suggestions.
//!
//! The crate is split into the narrow completion capability and its concrete
//! adapters ([`providers`]), the retry framework wrapping every backend call
//! ([`retry`]), the best-effort JSON recovery for unreliable model output
//! ([`recovery`]), the suggestion pipeline that turns a PR snapshot into a
//! [`suggest::TitleGenerationResponse`] ([`suggest`]), and the name-keyed
//! provider registry with its externally owned TTL cache ([`factory`]).

pub mod factory;
pub mod providers;
pub mod recovery;
pub mod retry;
pub mod suggest;

pub use factory::{ProviderCache, ProviderRegistry, ProviderSettings};
pub use providers::{
    AnthropicProvider, ChatProvider, LlmRequest, LlmResponse, LocalProvider, OpenAIProvider,
    ProviderHealth, ProviderId, TokenUsage,
};
pub use recovery::{extract_json, strip_code_fence};
pub use retry::{execute_with_retry, RetryConfig};
pub use suggest::{
    GenerationOptions, TitleGenerationRequest, TitleGenerationResponse, TitleGenerator,
    TitleSuggester,
};
