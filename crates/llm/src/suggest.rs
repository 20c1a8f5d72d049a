//! Suggestion pipeline: build the prompt/response contract, call the
//! completion backend with retries, and parse whatever text comes back
//! into a [`TitleGenerationResponse`] — falling back through JSON recovery
//! and line scanning so the contract is honored even when the model output
//! is garbage.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use conventional::ValidationOptions;

use crate::providers::{ChatProvider, LlmRequest, ProviderHealth};
use crate::recovery::{extract_json, strip_code_fence};
use crate::retry::{execute_with_retry, RetryConfig};

const MAX_BODY_EXCERPT_CHARS: usize = 1000;
const MAX_CHANGED_FILES: usize = 20;
const MAX_SUGGESTION_LINE_LENGTH: usize = 100;
const COMPLETION_MAX_TOKENS: u32 = 512;
const COMPLETION_TEMPERATURE: f32 = 0.3;
const DEFAULT_CONFIDENCE: f32 = 0.8;
const FALLBACK_CONFIDENCE: f32 = 0.5;

/// Per-call generation policy, mirrored into the system instruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub allowed_types: Vec<String>,
    pub require_scope: bool,
    pub max_length: usize,
    /// Ask the model to answer in the language the title is written in.
    pub match_language: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        let validation = ValidationOptions::default();
        Self {
            allowed_types: validation.allowed_types,
            require_scope: validation.require_scope,
            max_length: validation.max_length,
            match_language: true,
        }
    }
}

impl GenerationOptions {
    pub fn as_validation_options(&self) -> ValidationOptions {
        ValidationOptions::default()
            .with_allowed_types(self.allowed_types.clone())
            .with_require_scope(self.require_scope)
            .with_max_length(self.max_length)
    }
}

/// Everything the pipeline knows about one PR.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleGenerationRequest {
    pub original_title: String,
    pub body: Option<String>,
    pub changed_files: Vec<String>,
    pub options: GenerationOptions,
}

impl TitleGenerationRequest {
    pub fn new(original_title: &str) -> Self {
        Self {
            original_title: original_title.to_string(),
            body: None,
            changed_files: Vec::new(),
            options: GenerationOptions::default(),
        }
    }

    pub fn with_body(mut self, body: Option<String>) -> Self {
        self.body = body;
        self
    }

    pub fn with_changed_files(mut self, changed_files: Vec<String>) -> Self {
        self.changed_files = changed_files;
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }
}

/// The contract the pipeline always produces, even on internal parse
/// failure (degraded confidence, explanatory reasoning).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleGenerationResponse {
    pub suggestions: Vec<String>,
    pub reasoning: String,
    pub confidence: f32,
}

/// Capability the orchestrator consumes.
#[async_trait]
pub trait TitleGenerator: Send + Sync {
    async fn generate_title(
        &self,
        request: &TitleGenerationRequest,
    ) -> Result<TitleGenerationResponse>;

    async fn is_healthy(&self) -> bool;
}

/// Pipeline wiring a completion backend to the [`TitleGenerator`] contract.
pub struct TitleSuggester {
    provider: Arc<dyn ChatProvider>,
    retry: RetryConfig,
}

impl TitleSuggester {
    pub fn new(provider: Arc<dyn ChatProvider>) -> Self {
        Self {
            provider,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn build_system_prompt(options: &GenerationOptions) -> String {
        let scope_rule = if options.require_scope {
            "Every suggestion MUST include a scope in parentheses."
        } else {
            "Include a scope in parentheses when the change clearly targets one area."
        };
        let language_rule = if options.match_language {
            "\nWrite the description in the same language as the original title."
        } else {
            ""
        };

        format!(
            "You are an assistant that rewrites pull request titles into the \
             Conventional Commits format `type(scope): description`.\n\
             Allowed types: {}.\n\
             {}\n\
             Keep each title at most {} characters.{}\n\
             Respond ONLY with a JSON object of the shape:\n\
             {{\"suggestions\": [\"...\"], \"reasoning\": \"...\", \"confidence\": 0.0}}",
            options.allowed_types.join(", "),
            scope_rule,
            options.max_length,
            language_rule
        )
    }

    fn build_user_prompt(request: &TitleGenerationRequest) -> String {
        let mut prompt = format!("Original PR title: \"{}\"\n", request.original_title);

        if let Some(body) = &request.body {
            let excerpt: String = body.chars().take(MAX_BODY_EXCERPT_CHARS).collect();
            if !excerpt.trim().is_empty() {
                prompt.push_str("\nPR description:\n");
                prompt.push_str(excerpt.trim());
                prompt.push('\n');
            }
        }

        if !request.changed_files.is_empty() {
            prompt.push_str("\nChanged files:\n");
            for file in request.changed_files.iter().take(MAX_CHANGED_FILES) {
                prompt.push_str("- ");
                prompt.push_str(file);
                prompt.push('\n');
            }
            if request.changed_files.len() > MAX_CHANGED_FILES {
                prompt.push_str(&format!(
                    "... and {} more\n",
                    request.changed_files.len() - MAX_CHANGED_FILES
                ));
            }
        }

        prompt.push_str("\nPropose up to 3 compliant titles.");
        prompt
    }

    /// Parse the raw model answer, degrading from structured JSON through
    /// recovery to line scanning. Never fails.
    fn parse_response(raw: &str, request: &TitleGenerationRequest) -> TitleGenerationResponse {
        let stripped = strip_code_fence(raw);

        if let Ok(parsed) = serde_json::from_str::<RawModelResponse>(stripped) {
            if let Some(response) = Self::coerce(parsed) {
                return response;
            }
        }

        let recovered = extract_json(raw);
        if let Ok(parsed) = serde_json::from_str::<RawModelResponse>(&recovered) {
            if let Some(response) = Self::coerce(parsed) {
                debug!("Structured response recovered from malformed model output");
                return response;
            }
        }

        warn!("Model output was not structured JSON; falling back to line scanning");
        Self::line_scan(raw, request)
    }

    /// Wrap a bare-string suggestion payload, apply defaults, clamp
    /// confidence. Returns `None` when no usable suggestion survives.
    fn coerce(parsed: RawModelResponse) -> Option<TitleGenerationResponse> {
        let suggestions: Vec<String> = parsed
            .suggestions
            .map(|s| s.into_vec())
            .unwrap_or_default()
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if suggestions.is_empty() {
            return None;
        }

        Some(TitleGenerationResponse {
            suggestions,
            reasoning: parsed
                .reasoning
                .unwrap_or_else(|| "No reasoning provided".to_string()),
            confidence: parsed.confidence.unwrap_or(DEFAULT_CONFIDENCE).clamp(0.0, 1.0),
        })
    }

    /// Keep any line that looks like a compliant header; when nothing
    /// matches, synthesize a heuristic candidate from the original title.
    fn line_scan(raw: &str, request: &TitleGenerationRequest) -> TitleGenerationResponse {
        let mut suggestions: Vec<String> = raw
            .lines()
            .map(clean_line)
            .filter(|line| {
                !line.is_empty()
                    && line.chars().count() <= MAX_SUGGESTION_LINE_LENGTH
                    && conventional::parse(line).is_some()
            })
            .map(|line| line.to_string())
            .collect();

        let reasoning = if suggestions.is_empty() {
            suggestions = conventional::generate_suggestions(
                &request.original_title,
                &request.options.as_validation_options(),
            );
            "Model response could not be parsed; synthesized a heuristic suggestion instead"
                .to_string()
        } else {
            "Model response could not be parsed as JSON; suggestions were scanned from raw text"
                .to_string()
        };

        TitleGenerationResponse {
            suggestions,
            reasoning,
            confidence: FALLBACK_CONFIDENCE,
        }
    }
}

/// Strip list markers and inline code ticks a model puts around titles.
fn clean_line(line: &str) -> &str {
    let mut cleaned = line.trim();
    cleaned = cleaned.trim_start_matches(|c: char| {
        c.is_ascii_digit() || c == '.' || c == ')' || c == '-' || c == '*' || c == ' '
    });
    cleaned.trim_matches('`').trim()
}

#[async_trait]
impl TitleGenerator for TitleSuggester {
    async fn generate_title(
        &self,
        request: &TitleGenerationRequest,
    ) -> Result<TitleGenerationResponse> {
        let system_prompt = Self::build_system_prompt(&request.options);
        let user_prompt = Self::build_user_prompt(request);
        let llm_request = LlmRequest::new(&user_prompt)
            .with_system_prompt(&system_prompt)
            .with_parameters(Some(COMPLETION_MAX_TOKENS), Some(COMPLETION_TEMPERATURE));

        let provider = Arc::clone(&self.provider);
        let content = execute_with_retry(&self.retry, || {
            let provider = Arc::clone(&provider);
            let llm_request = llm_request.clone();
            Box::pin(async move { provider.complete(llm_request).await.map(|r| r.content) })
        })
        .await?;

        Ok(Self::parse_response(&content, request))
    }

    async fn is_healthy(&self) -> bool {
        matches!(
            self.provider.health_check().await,
            Ok(ProviderHealth::Healthy) | Ok(ProviderHealth::Degraded)
        )
    }
}

/// Loose deserialization target for whatever the model sent back.
#[derive(Debug, Deserialize)]
struct RawModelResponse {
    suggestions: Option<OneOrMany>,
    reasoning: Option<String>,
    confidence: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> TitleGenerationRequest {
        TitleGenerationRequest::new("Added pagination support")
    }

    #[test]
    fn test_parse_structured_response() {
        let raw = r#"{"suggestions": ["feat(api): add pagination"], "reasoning": "new endpoint", "confidence": 0.9}"#;
        let response = TitleSuggester::parse_response(raw, &request());
        assert_eq!(response.suggestions, vec!["feat(api): add pagination"]);
        assert_eq!(response.reasoning, "new endpoint");
        assert!((response.confidence - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn test_bare_string_suggestion_wrapped() {
        let raw = r#"{"suggestions": "feat: add pagination"}"#;
        let response = TitleSuggester::parse_response(raw, &request());
        assert_eq!(response.suggestions, vec!["feat: add pagination"]);
        assert_eq!(response.reasoning, "No reasoning provided");
        assert!((response.confidence - DEFAULT_CONFIDENCE).abs() < f32::EPSILON);
    }

    #[test]
    fn test_confidence_clamped() {
        let raw = r#"{"suggestions": ["feat: add pagination"], "confidence": 3.5}"#;
        let response = TitleSuggester::parse_response(raw, &request());
        assert!((response.confidence - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_fenced_response_with_prose_recovered() {
        let raw = "```json\n{\"suggestions\": [\"fix: correct timeout\"], \"reasoning\": \"x\", \"confidence\": 0.7}\n```\nLet me know if you need more options!";
        let response = TitleSuggester::parse_response(raw, &request());
        assert_eq!(response.suggestions, vec!["fix: correct timeout"]);
        assert!((response.confidence - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn test_line_scan_fallback() {
        let raw = "Here are my ideas:\n1. `feat(api): add pagination`\n2. feat: support pagination\nThanks!";
        let response = TitleSuggester::parse_response(raw, &request());
        assert_eq!(
            response.suggestions,
            vec!["feat(api): add pagination", "feat: support pagination"]
        );
        assert!((response.confidence - FALLBACK_CONFIDENCE).abs() < f32::EPSILON);
        assert!(response.reasoning.contains("scanned"));
    }

    #[test]
    fn test_line_scan_skips_overlong_lines() {
        let overlong = format!("feat: {}", "x".repeat(120));
        let raw = format!("{overlong}\nfix: short one");
        let response = TitleSuggester::parse_response(&raw, &request());
        assert_eq!(response.suggestions, vec!["fix: short one"]);
    }

    #[test]
    fn test_unusable_output_synthesizes_candidate() {
        let raw = "I am sorry, I cannot help with that.";
        let response = TitleSuggester::parse_response(raw, &request());
        assert_eq!(response.suggestions, vec!["feat: added pagination support"]);
        assert!((response.confidence - FALLBACK_CONFIDENCE).abs() < f32::EPSILON);
        assert!(response.reasoning.contains("heuristic"));
    }

    #[test]
    fn test_empty_suggestion_list_degrades_to_line_scan() {
        let raw = r#"{"suggestions": [], "reasoning": "nothing", "confidence": 0.9}"#;
        let response = TitleSuggester::parse_response(raw, &request());
        assert!(!response.suggestions.is_empty());
        assert!((response.confidence - FALLBACK_CONFIDENCE).abs() < f32::EPSILON);
    }

    #[test]
    fn test_system_prompt_embeds_policy() {
        let options = GenerationOptions {
            allowed_types: vec!["feat".to_string(), "fix".to_string()],
            require_scope: true,
            max_length: 60,
            match_language: false,
        };
        let prompt = TitleSuggester::build_system_prompt(&options);
        assert!(prompt.contains("feat, fix"));
        assert!(prompt.contains("MUST include a scope"));
        assert!(prompt.contains("60 characters"));
        assert!(!prompt.contains("same language"));
    }

    #[test]
    fn test_user_prompt_caps_changed_files() {
        let files: Vec<String> = (0..30).map(|i| format!("src/file_{i}.rs")).collect();
        let req = request().with_changed_files(files);
        let prompt = TitleSuggester::build_user_prompt(&req);
        assert!(prompt.contains("src/file_19.rs"));
        assert!(!prompt.contains("src/file_20.rs"));
        assert!(prompt.contains("... and 10 more"));
    }

    #[test]
    fn test_user_prompt_caps_body_excerpt() {
        let req = request().with_body(Some("word ".repeat(1000)));
        let prompt = TitleSuggester::build_user_prompt(&req);
        assert!(prompt.len() < 1200);
    }
}
