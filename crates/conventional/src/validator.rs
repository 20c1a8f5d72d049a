use serde::{Deserialize, Serialize};

use crate::parser::{parse, ConventionalCommit};
use crate::suggestions::generate_suggestions;

pub const DEFAULT_ALLOWED_TYPES: &[&str] = &[
    "feat", "fix", "docs", "style", "refactor", "perf", "test", "build", "ci", "chore", "revert",
];

pub const DEFAULT_MAX_LENGTH: usize = 72;
pub const DEFAULT_MIN_DESCRIPTION_LENGTH: usize = 3;

/// Validation policy. Supplied once per run and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOptions {
    pub allowed_types: Vec<String>,
    pub require_scope: bool,
    pub max_length: usize,
    pub min_description_length: usize,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            allowed_types: DEFAULT_ALLOWED_TYPES.iter().map(|t| t.to_string()).collect(),
            require_scope: false,
            max_length: DEFAULT_MAX_LENGTH,
            min_description_length: DEFAULT_MIN_DESCRIPTION_LENGTH,
        }
    }
}

impl ValidationOptions {
    pub fn with_allowed_types(mut self, types: Vec<String>) -> Self {
        self.allowed_types = types;
        self
    }

    pub fn with_require_scope(mut self, require_scope: bool) -> Self {
        self.require_scope = require_scope;
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    /// True when the type token matches the allowed set, case-insensitively.
    pub fn is_type_allowed(&self, commit_type: &str) -> bool {
        self.allowed_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(commit_type))
    }
}

/// Outcome of validating one title against one option set. Pure data;
/// recomputing with the same inputs yields the same result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed: Option<ConventionalCommit>,
}

/// Validate a title, accumulating every rule violation rather than stopping
/// at the first. Suggestions are populated only for invalid titles.
pub fn validate(title: &str, options: &ValidationOptions) -> ValidationResult {
    let parsed = parse(title);

    let mut errors = Vec::new();
    match &parsed {
        None => {
            errors.push("Title does not follow Conventional Commits format".to_string());
        }
        Some(commit) => {
            if !options.is_type_allowed(&commit.commit_type) {
                errors.push(format!(
                    "Type '{}' is not allowed. Allowed types: {}",
                    commit.commit_type,
                    options.allowed_types.join(", ")
                ));
            }
            if options.require_scope && commit.scope.is_none() {
                errors.push("A scope is required but none was provided".to_string());
            }
            let length = title.chars().count();
            if length > options.max_length {
                errors.push(format!(
                    "Title is {} characters long, exceeding the maximum of {}",
                    length, options.max_length
                ));
            }
            if commit.description.chars().count() < options.min_description_length {
                errors.push(format!(
                    "Description must be at least {} characters long",
                    options.min_description_length
                ));
            }
        }
    }

    let is_valid = errors.is_empty();
    let suggestions = if is_valid {
        Vec::new()
    } else {
        generate_suggestions(title, options)
    };

    ValidationResult {
        is_valid,
        errors,
        suggestions,
        parsed,
    }
}

/// Shorthand for callers that only need the verdict.
pub fn is_conventional(title: &str, options: &ValidationOptions) -> bool {
    validate(title, options).is_valid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_title() {
        let result = validate("feat(api): add pagination", &ValidationOptions::default());
        assert!(result.is_valid);
        assert!(result.errors.is_empty());
        assert!(result.suggestions.is_empty());
        assert!(result.parsed.is_some());
    }

    #[test]
    fn test_unstructured_title() {
        let result = validate("Added pagination support", &ValidationOptions::default());
        assert!(!result.is_valid);
        assert_eq!(
            result.errors,
            vec!["Title does not follow Conventional Commits format".to_string()]
        );
        assert!(!result.suggestions.is_empty());
    }

    #[test]
    fn test_type_checked_case_insensitively() {
        let result = validate("FEAT: add pagination", &ValidationOptions::default());
        assert!(result.is_valid);
    }

    #[test]
    fn test_disallowed_type() {
        let result = validate("wip: half done", &ValidationOptions::default());
        assert!(!result.is_valid);
        assert!(result.errors[0].contains("'wip'"));
        assert!(result.errors[0].contains("feat, fix"));
    }

    #[test]
    fn test_violations_accumulate() {
        let options = ValidationOptions::default()
            .with_require_scope(true)
            .with_max_length(20);
        let result = validate("wip: a very long title that keeps going", &options);
        assert!(!result.is_valid);
        // Disallowed type, missing scope, and over-length all reported.
        assert_eq!(result.errors.len(), 3);
    }

    #[test]
    fn test_max_length_error_names_measured_length() {
        let title = format!("feat: {}", "x".repeat(80));
        let result = validate(&title, &ValidationOptions::default());
        assert!(!result.is_valid);
        assert!(result.errors[0].contains(&title.chars().count().to_string()));
    }

    #[test]
    fn test_short_description() {
        let result = validate("fix: ab", &ValidationOptions::default());
        assert!(!result.is_valid);
        assert!(result.errors[0].contains("at least 3 characters"));
    }

    #[test]
    fn test_empty_title() {
        let result = validate("", &ValidationOptions::default());
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.suggestions.len(), 1);
    }

    #[test]
    fn test_validation_is_deterministic() {
        let options = ValidationOptions::default().with_require_scope(true);
        let first = validate("Fixed the thing", &options);
        let second = validate("Fixed the thing", &options);
        assert_eq!(first, second);
    }

    #[test]
    fn test_is_conventional_matches_validate() {
        let options = ValidationOptions::default();
        for title in ["feat: add pagination", "random words", "chore(deps): bump serde"] {
            assert_eq!(
                is_conventional(title, &options),
                validate(title, &options).is_valid
            );
        }
    }
}
