use crate::parser::{parse, ConventionalCommit};
use crate::validator::ValidationOptions;

/// Ordered keyword table for inferring a type from an unstructured title.
/// Scanned case-insensitively, first hit wins.
const TYPE_KEYWORDS: &[(&str, &str)] = &[
    ("fix", "fix"),
    ("bug", "fix"),
    ("add", "feat"),
    ("implement", "feat"),
    ("new", "feat"),
    ("refactor", "refactor"),
    ("test", "test"),
    ("doc", "docs"),
];

const FALLBACK_TYPE: &str = "feat";
const SCOPE_PLACEHOLDER: &str = "scope";
const FALLBACK_DESCRIPTION: &str = "update";

/// Heuristic repair of a non-compliant title. Always returns at least one
/// candidate and never fails, including for the empty string.
pub fn generate_suggestions(title: &str, options: &ValidationOptions) -> Vec<String> {
    let candidate = match parse(title) {
        Some(commit) => repair(&commit, title, options),
        None => infer(title, options),
    };
    vec![candidate]
}

/// The title parses but broke a rule: coerce the type into the allowed set,
/// inject a scope placeholder only when one is required and absent, and
/// truncate the description to fit the length budget.
fn repair(commit: &ConventionalCommit, title: &str, options: &ValidationOptions) -> String {
    let commit_type = coerce_type(&commit.commit_type, title, options);
    let scope = match (&commit.scope, options.require_scope) {
        (Some(scope), _) => Some(scope.clone()),
        (None, true) => Some(SCOPE_PLACEHOLDER.to_string()),
        (None, false) => None,
    };

    let mut prefix = commit_type;
    if let Some(scope) = scope {
        prefix.push('(');
        prefix.push_str(&scope);
        prefix.push(')');
    }
    if commit.breaking {
        prefix.push('!');
    }
    prefix.push_str(": ");

    let description = commit.description.trim();
    assemble(&prefix, description, options.max_length)
}

/// The title does not parse at all: infer a type from the keyword table and
/// reuse the lowercased original as the description.
fn infer(title: &str, options: &ValidationOptions) -> String {
    let cleaned = title.trim().to_lowercase();
    let commit_type = infer_type(&cleaned, options);
    let description = if cleaned.is_empty() {
        FALLBACK_DESCRIPTION
    } else {
        cleaned.as_str()
    };
    assemble(&format!("{commit_type}: "), description, options.max_length)
}

/// Case-fold the type into the allowed set, preserving the set's casing.
/// Types with no case-fold match fall back to keyword inference.
fn coerce_type(commit_type: &str, title: &str, options: &ValidationOptions) -> String {
    options
        .allowed_types
        .iter()
        .find(|t| t.eq_ignore_ascii_case(commit_type))
        .cloned()
        .unwrap_or_else(|| infer_type(&title.to_lowercase(), options))
}

fn infer_type(lowercased_title: &str, options: &ValidationOptions) -> String {
    let inferred = TYPE_KEYWORDS
        .iter()
        .find(|(keyword, _)| lowercased_title.contains(keyword))
        .map(|(_, commit_type)| *commit_type)
        .unwrap_or(FALLBACK_TYPE);

    // The keyword table only emits standard types; honor a restricted
    // allowed set by falling back to its first entry when necessary.
    if options.is_type_allowed(inferred) {
        inferred.to_string()
    } else {
        options
            .allowed_types
            .first()
            .cloned()
            .unwrap_or_else(|| inferred.to_string())
    }
}

/// Join prefix and description, truncating the description so the whole
/// candidate fits `max_length`. The description keeps at least one character
/// so the candidate still parses.
fn assemble(prefix: &str, description: &str, max_length: usize) -> String {
    let prefix_len = prefix.chars().count();
    let budget = max_length.saturating_sub(prefix_len).max(1);
    let truncated: String = description.chars().take(budget).collect();
    let truncated = truncated.trim_end();
    let description = if truncated.is_empty() {
        FALLBACK_DESCRIPTION
    } else {
        truncated
    };
    format!("{prefix}{description}")
}
