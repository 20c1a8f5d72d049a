//! Environment-driven configuration.
//!
//! Every knob is readable both as a GitHub-Action input (`INPUT_MAX-LENGTH`
//! or `INPUT_MAX_LENGTH`) and as a plain environment variable
//! (`MAX_LENGTH`), so the binary works identically inside an action step
//! and on a developer machine with a `.env` file. Configuration problems
//! are raised here, before any processing starts.

use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use conventional::ValidationOptions;
use llm::{ProviderSettings, RetryConfig};
use orchestrator::{ActionMode, ProcessOptions};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Required configuration '{0}' is missing")]
    Missing(&'static str),

    #[error("Invalid value for '{name}': {message}")]
    Invalid { name: &'static str, message: String },
}

/// Everything the `run` command needs, resolved up front.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub token: String,
    pub repository: String,
    pub api_base: Option<String>,
    pub pr_number: Option<u64>,
    pub provider: ProviderSettings,
    pub options: ProcessOptions,
    pub retry: RetryConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let token = input("github-token").ok_or(ConfigError::Missing("github-token"))?;
        let repository =
            input("github-repository").ok_or(ConfigError::Missing("github-repository"))?;

        let provider_name = input("provider").unwrap_or_else(|| "openai".to_string());
        let api_key = input("api-key").or_else(|| provider_specific_key(&provider_name));
        let provider = ProviderSettings::new(&provider_name)
            .with_api_key(api_key)
            .with_model(input("model"))
            .with_base_url(input("base-url"));

        let mut validation = ValidationOptions::default();
        if let Some(types) = input("allowed-types") {
            let types: Vec<String> = types
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
            if types.is_empty() {
                return Err(ConfigError::Invalid {
                    name: "allowed-types",
                    message: "the list must contain at least one type".to_string(),
                });
            }
            validation.allowed_types = types;
        }
        validation.require_scope = parse_or("require-scope", validation.require_scope)?;
        validation.max_length = parse_or("max-length", validation.max_length)?;
        validation.min_description_length =
            parse_or("min-description-length", validation.min_description_length)?;

        let mode = match input("mode") {
            Some(raw) => ActionMode::from_str(&raw).map_err(|message| ConfigError::Invalid {
                name: "mode",
                message,
            })?,
            None => ActionMode::Suggest,
        };

        let options = ProcessOptions {
            mode,
            skip_if_compliant: parse_or("skip-if-conventional", true)?,
            skip_drafts: parse_or("skip-drafts", true)?,
            comment_template: input("comment-template"),
            validation,
            match_language: parse_or("match-language", true)?,
        };

        let retry = RetryConfig::new()
            .with_max_retries(parse_or("max-retries", 3)?)
            .with_base_delay(Duration::from_millis(parse_or("retry-delay-ms", 1000)?));

        Ok(Self {
            token,
            repository,
            api_base: input("github-api-url"),
            pr_number: resolve_pr_number()?,
            provider,
            options,
            retry,
        })
    }
}

/// Read one logical input, trying the action-style `INPUT_` names first
/// and the plain environment name last. Blank values count as unset.
fn input(name: &'static str) -> Option<String> {
    let upper = name.to_uppercase();
    let underscored = upper.replace('-', "_");
    [
        format!("INPUT_{upper}"),
        format!("INPUT_{underscored}"),
        underscored,
    ]
    .iter()
    .find_map(|key| env_var(key))
}

fn env_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn provider_specific_key(provider: &str) -> Option<String> {
    match provider {
        "openai" => env_var("OPENAI_API_KEY"),
        "anthropic" => env_var("ANTHROPIC_API_KEY"),
        _ => None,
    }
}

fn parse_or<T: ParseableFlag>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match input(name) {
        None => Ok(default),
        Some(raw) => T::parse_flag(&raw).ok_or_else(|| ConfigError::Invalid {
            name,
            message: format!("could not parse '{raw}'"),
        }),
    }
}

/// Unified parsing for the few value shapes inputs take; booleans accept
/// the usual yes/no spellings actions produce.
trait ParseableFlag: Sized {
    fn parse_flag(raw: &str) -> Option<Self>;
}

impl ParseableFlag for bool {
    fn parse_flag(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => Some(true),
            "false" | "no" | "0" | "off" => Some(false),
            _ => None,
        }
    }
}

impl ParseableFlag for usize {
    fn parse_flag(raw: &str) -> Option<Self> {
        raw.parse().ok()
    }
}

impl ParseableFlag for u32 {
    fn parse_flag(raw: &str) -> Option<Self> {
        raw.parse().ok()
    }
}

impl ParseableFlag for u64 {
    fn parse_flag(raw: &str) -> Option<Self> {
        raw.parse().ok()
    }
}

/// The PR number comes from an explicit input, or is derived from the
/// `GITHUB_REF` of a pull_request event (`refs/pull/<n>/merge`).
fn resolve_pr_number() -> Result<Option<u64>, ConfigError> {
    if let Some(raw) = input("pr-number") {
        return raw
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                name: "pr-number",
                message: format!("could not parse '{raw}'"),
            });
    }

    if let Some(git_ref) = env_var("GITHUB_REF") {
        let parts: Vec<&str> = git_ref.split('/').collect();
        if let ["refs", "pull", number, ..] = parts.as_slice() {
            if let Ok(number) = number.parse() {
                return Ok(Some(number));
            }
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ALL_KEYS: &[&str] = &[
        "INPUT_GITHUB-TOKEN",
        "INPUT_GITHUB_TOKEN",
        "GITHUB_TOKEN",
        "INPUT_GITHUB-REPOSITORY",
        "INPUT_GITHUB_REPOSITORY",
        "GITHUB_REPOSITORY",
        "INPUT_PROVIDER",
        "PROVIDER",
        "INPUT_API-KEY",
        "INPUT_API_KEY",
        "API_KEY",
        "OPENAI_API_KEY",
        "ANTHROPIC_API_KEY",
        "INPUT_MODEL",
        "MODEL",
        "INPUT_BASE-URL",
        "BASE_URL",
        "INPUT_MODE",
        "MODE",
        "INPUT_ALLOWED-TYPES",
        "ALLOWED_TYPES",
        "INPUT_REQUIRE-SCOPE",
        "REQUIRE_SCOPE",
        "INPUT_MAX-LENGTH",
        "MAX_LENGTH",
        "INPUT_MIN-DESCRIPTION-LENGTH",
        "MIN_DESCRIPTION_LENGTH",
        "INPUT_SKIP-IF-CONVENTIONAL",
        "SKIP_IF_CONVENTIONAL",
        "INPUT_SKIP-DRAFTS",
        "SKIP_DRAFTS",
        "INPUT_COMMENT-TEMPLATE",
        "COMMENT_TEMPLATE",
        "INPUT_MATCH-LANGUAGE",
        "MATCH_LANGUAGE",
        "INPUT_MAX-RETRIES",
        "MAX_RETRIES",
        "INPUT_RETRY-DELAY-MS",
        "RETRY_DELAY_MS",
        "INPUT_PR-NUMBER",
        "INPUT_PR_NUMBER",
        "PR_NUMBER",
        "GITHUB_REF",
        "INPUT_GITHUB-API-URL",
        "GITHUB_API_URL",
    ];

    fn clean_env() {
        for key in ALL_KEYS {
            env::remove_var(key);
        }
        env::set_var("GITHUB_TOKEN", "test-token");
        env::set_var("GITHUB_REPOSITORY", "octo/repo");
        env::set_var("OPENAI_API_KEY", "test-openai-key");
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clean_env();
        let config = AppConfig::from_env().expect("config should load");

        assert_eq!(config.token, "test-token");
        assert_eq!(config.repository, "octo/repo");
        assert_eq!(config.provider.provider, "openai");
        assert_eq!(config.provider.api_key.as_deref(), Some("test-openai-key"));
        assert_eq!(config.options.mode, ActionMode::Suggest);
        assert!(config.options.skip_if_compliant);
        assert_eq!(config.options.validation.max_length, 72);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.pr_number, None);
    }

    #[test]
    #[serial]
    fn test_missing_token_is_config_error() {
        clean_env();
        env::remove_var("GITHUB_TOKEN");
        let error = AppConfig::from_env().expect_err("should fail");
        assert!(error.to_string().contains("github-token"));
    }

    #[test]
    #[serial]
    fn test_action_inputs_override_plain_names() {
        clean_env();
        env::set_var("INPUT_MODE", "auto");
        env::set_var("INPUT_MAX-LENGTH", "60");
        env::set_var("INPUT_ALLOWED-TYPES", "feat, fix , chore");
        env::set_var("INPUT_REQUIRE-SCOPE", "yes");

        let config = AppConfig::from_env().expect("config should load");
        assert_eq!(config.options.mode, ActionMode::Auto);
        assert_eq!(config.options.validation.max_length, 60);
        assert_eq!(
            config.options.validation.allowed_types,
            vec!["feat", "fix", "chore"]
        );
        assert!(config.options.validation.require_scope);
    }

    #[test]
    #[serial]
    fn test_invalid_mode_rejected() {
        clean_env();
        env::set_var("MODE", "rampage");
        let error = AppConfig::from_env().expect_err("should fail");
        assert!(error.to_string().contains("mode"));
    }

    #[test]
    #[serial]
    fn test_invalid_boolean_rejected() {
        clean_env();
        env::set_var("SKIP_DRAFTS", "maybe");
        let error = AppConfig::from_env().expect_err("should fail");
        assert!(error.to_string().contains("skip-drafts"));
    }

    #[test]
    #[serial]
    fn test_pr_number_from_github_ref() {
        clean_env();
        env::set_var("GITHUB_REF", "refs/pull/123/merge");
        let config = AppConfig::from_env().expect("config should load");
        assert_eq!(config.pr_number, Some(123));
    }

    #[test]
    #[serial]
    fn test_explicit_pr_number_wins() {
        clean_env();
        env::set_var("GITHUB_REF", "refs/pull/123/merge");
        env::set_var("PR_NUMBER", "77");
        let config = AppConfig::from_env().expect("config should load");
        assert_eq!(config.pr_number, Some(77));
    }

    #[test]
    #[serial]
    fn test_anthropic_key_resolved_for_anthropic_provider() {
        clean_env();
        env::remove_var("OPENAI_API_KEY");
        env::set_var("PROVIDER", "anthropic");
        env::set_var("ANTHROPIC_API_KEY", "test-anthropic-key");

        let config = AppConfig::from_env().expect("config should load");
        assert_eq!(config.provider.provider, "anthropic");
        assert_eq!(
            config.provider.api_key.as_deref(),
            Some("test-anthropic-key")
        );
    }
}
