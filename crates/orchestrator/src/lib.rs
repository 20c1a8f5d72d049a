//! Processing orchestrator: the state machine that decides skip / generate /
//! act for one PR invocation and produces a single immutable
//! [`ProcessingResult`].
//!
//! `Idle → Evaluating → (Skipped | Generating → Acting → {Updated |
//! Commented}) | Failed`. At most one mutating host call happens per
//! invocation, and every anticipated failure is converted into result data
//! at this boundary; nothing escapes as an error.

pub mod comment;

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use conventional::{validate, ValidationOptions};
use github::{PrInfo, SourceHost};
use llm::{GenerationOptions, TitleGenerationRequest, TitleGenerator};

/// Remediation policy: rewrite the title directly, or post a comment with
/// candidates instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionMode {
    Auto,
    Suggest,
}

impl FromStr for ActionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ActionMode::Auto),
            "suggest" => Ok(ActionMode::Suggest),
            other => Err(format!("Unknown mode '{other}', expected 'auto' or 'suggest'")),
        }
    }
}

/// The terminal action recorded in a [`ProcessingResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionTaken {
    Updated,
    Commented,
    Skipped,
    Error,
}

impl ActionTaken {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionTaken::Updated => "updated",
            ActionTaken::Commented => "commented",
            ActionTaken::Skipped => "skipped",
            ActionTaken::Error => "error",
        }
    }
}

/// Per-run processing policy.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    pub mode: ActionMode,
    pub skip_if_compliant: bool,
    pub skip_drafts: bool,
    pub comment_template: Option<String>,
    pub validation: ValidationOptions,
    pub match_language: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            mode: ActionMode::Suggest,
            skip_if_compliant: true,
            skip_drafts: true,
            comment_template: None,
            validation: ValidationOptions::default(),
            match_language: true,
        }
    }
}

impl ProcessOptions {
    fn generation_options(&self) -> GenerationOptions {
        GenerationOptions {
            allowed_types: self.validation.allowed_types.clone(),
            require_scope: self.validation.require_scope,
            max_length: self.validation.max_length,
            match_language: self.match_language,
        }
    }
}

/// Terminal outcome of one invocation. Built once per branch, never
/// mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub is_conventional: bool,
    pub suggestions: Vec<String>,
    pub reasoning: String,
    pub action_taken: ActionTaken,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ProcessingResult {
    fn skipped(is_conventional: bool, reasoning: &str) -> Self {
        Self {
            is_conventional,
            suggestions: Vec::new(),
            reasoning: reasoning.to_string(),
            action_taken: ActionTaken::Skipped,
            error_message: None,
        }
    }

    /// A failure with nothing else to report. Public because callers also
    /// need it for failures that happen before the state machine runs
    /// (e.g. the PR snapshot could not be fetched).
    pub fn failure(is_conventional: bool, message: String) -> Self {
        Self {
            is_conventional,
            suggestions: Vec::new(),
            reasoning: String::new(),
            action_taken: ActionTaken::Error,
            error_message: Some(message),
        }
    }

    /// Failure after suggestions were already computed: keep them so the
    /// caller is not forced to regenerate.
    fn error_with_suggestions(
        is_conventional: bool,
        suggestions: Vec<String>,
        reasoning: String,
        message: String,
    ) -> Self {
        Self {
            is_conventional,
            suggestions,
            reasoning,
            action_taken: ActionTaken::Error,
            error_message: Some(message),
        }
    }
}

/// The top-level processor. Construct one per invocation; instances hold
/// no cross-invocation state.
pub struct TitleProcessor {
    host: Arc<dyn SourceHost>,
    generator: Arc<dyn TitleGenerator>,
    options: ProcessOptions,
}

impl TitleProcessor {
    pub fn new(
        host: Arc<dyn SourceHost>,
        generator: Arc<dyn TitleGenerator>,
        options: ProcessOptions,
    ) -> Self {
        Self {
            host,
            generator,
            options,
        }
    }

    /// Fetch the PR snapshot and run the state machine for it.
    pub async fn process(&self, pr_number: u64) -> ProcessingResult {
        let pr = match self.host.get_pr_info(pr_number).await {
            Ok(pr) => pr,
            Err(e) => {
                return ProcessingResult::failure(false, format!("Failed to fetch PR: {e:#}"))
            }
        };
        self.process_pr(&pr).await
    }

    /// Run the state machine for an already-fetched snapshot. Always
    /// returns a well-formed result; anticipated failures become
    /// `action_taken = error`.
    pub async fn process_pr(&self, pr: &PrInfo) -> ProcessingResult {
        let validation = validate(&pr.title, &self.options.validation);

        if self.options.skip_drafts && pr.draft {
            info!("PR #{} is a draft; skipping", pr.number);
            return ProcessingResult::skipped(validation.is_valid, "PR is a draft");
        }

        if validation.is_valid && self.options.skip_if_compliant {
            info!("Title of PR #{} is already compliant; skipping", pr.number);
            return ProcessingResult::skipped(
                true,
                "Title already follows the Conventional Commits format",
            );
        }

        debug!(
            "Title of PR #{} needs work: {:?}",
            pr.number, validation.errors
        );

        let request = TitleGenerationRequest::new(&pr.title)
            .with_body(pr.body.clone())
            .with_changed_files(pr.changed_files.clone())
            .with_options(self.options.generation_options());

        let response = match self.generator.generate_title(&request).await {
            Ok(response) => response,
            Err(e) => {
                return ProcessingResult::failure(
                    validation.is_valid,
                    format!("Title generation failed: {e:#}"),
                )
            }
        };

        if response.suggestions.is_empty() {
            return ProcessingResult::failure(
                validation.is_valid,
                "The generator returned no suggestions".to_string(),
            );
        }

        match self.effective_mode().await {
            ActionMode::Auto => self.apply_update(pr, validation.is_valid, response).await,
            ActionMode::Suggest => self.post_comment(pr, validation.is_valid, response).await,
        }
    }

    /// Auto mode needs write permission; downgrade to suggest mode when the
    /// host says there is none. Decided once per run.
    async fn effective_mode(&self) -> ActionMode {
        if self.options.mode != ActionMode::Auto {
            return self.options.mode;
        }
        match self.host.check_write_permission().await {
            Ok(true) => ActionMode::Auto,
            Ok(false) => {
                warn!("No write permission; falling back to suggest mode");
                ActionMode::Suggest
            }
            Err(e) => {
                warn!("Permission check failed ({e:#}); falling back to suggest mode");
                ActionMode::Suggest
            }
        }
    }

    async fn apply_update(
        &self,
        pr: &PrInfo,
        is_conventional: bool,
        response: llm::TitleGenerationResponse,
    ) -> ProcessingResult {
        let new_title = &response.suggestions[0];
        match self.host.update_title(pr.number, new_title).await {
            Ok(()) => {
                info!("Updated title of PR #{} to '{}'", pr.number, new_title);
                ProcessingResult {
                    is_conventional,
                    suggestions: response.suggestions,
                    reasoning: response.reasoning,
                    action_taken: ActionTaken::Updated,
                    error_message: None,
                }
            }
            Err(e) => ProcessingResult::error_with_suggestions(
                is_conventional,
                response.suggestions,
                response.reasoning,
                format!("Failed to update title: {e:#}"),
            ),
        }
    }

    async fn post_comment(
        &self,
        pr: &PrInfo,
        is_conventional: bool,
        response: llm::TitleGenerationResponse,
    ) -> ProcessingResult {
        let body = comment::render(
            &pr.title,
            &response.suggestions,
            &response.reasoning,
            self.options.comment_template.as_deref(),
        );
        match self.host.create_comment(pr.number, &body).await {
            Ok(posted) => {
                info!("Posted suggestion comment {} on PR #{}", posted.id, pr.number);
                ProcessingResult {
                    is_conventional,
                    suggestions: response.suggestions,
                    reasoning: response.reasoning,
                    action_taken: ActionTaken::Commented,
                    error_message: None,
                }
            }
            Err(e) => ProcessingResult::error_with_suggestions(
                is_conventional,
                response.suggestions,
                response.reasoning,
                format!("Failed to create comment: {e:#}"),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_mode_parsing() {
        assert_eq!("auto".parse::<ActionMode>().expect("parses"), ActionMode::Auto);
        assert_eq!(
            "Suggest".parse::<ActionMode>().expect("parses"),
            ActionMode::Suggest
        );
        assert!("yolo".parse::<ActionMode>().is_err());
    }

    #[test]
    fn test_action_taken_strings() {
        assert_eq!(ActionTaken::Updated.as_str(), "updated");
        assert_eq!(ActionTaken::Commented.as_str(), "commented");
        assert_eq!(ActionTaken::Skipped.as_str(), "skipped");
        assert_eq!(ActionTaken::Error.as_str(), "error");
    }

    #[test]
    fn test_result_serialization_omits_absent_error() {
        let result = ProcessingResult::skipped(true, "compliant");
        let json = serde_json::to_string(&result).expect("serializes");
        assert!(json.contains("\"action_taken\":\"skipped\""));
        assert!(!json.contains("error_message"));
    }
}
