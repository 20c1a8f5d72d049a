//! Property tests for the grammar engine: totality, determinism,
//! suggestion non-emptiness, and the valid-title round trip.

use conventional::{generate_suggestions, parse, validate, ValidationOptions};
use proptest::prelude::*;

const ROUND_TRIP_TYPES: &[&str] = &["feat", "fix", "docs", "refactor", "perf", "chore"];

proptest! {
    /// `parse` terminates and never panics for arbitrary input.
    #[test]
    fn parse_is_total(title in "\\PC*") {
        let _ = parse(&title);
    }

    /// Multi-line input with embedded control characters is also safe.
    #[test]
    fn parse_is_total_multiline(lines in proptest::collection::vec("\\PC*", 0..5)) {
        let _ = parse(&lines.join("\n"));
    }

    /// Validation of the same input twice yields identical results.
    #[test]
    fn validation_is_deterministic(title in "\\PC{0,120}") {
        let options = ValidationOptions::default();
        prop_assert_eq!(validate(&title, &options), validate(&title, &options));
    }

    /// At least one repair candidate exists for any input.
    #[test]
    fn suggestions_never_empty(title in "\\PC{0,120}") {
        let suggestions = generate_suggestions(&title, &ValidationOptions::default());
        prop_assert!(!suggestions.is_empty());
        prop_assert!(suggestions.iter().all(|s| !s.is_empty()));
    }

    /// Any title that validates cleanly must parse, and its reassembled
    /// header must validate again under the same options.
    #[test]
    fn valid_titles_round_trip(
        commit_type in proptest::sample::select(ROUND_TRIP_TYPES),
        scope in proptest::option::of("[a-z]{1,8}"),
        breaking in any::<bool>(),
        description in "[a-zA-Z][a-zA-Z ]{2,39}",
    ) {
        let scope_part = scope.map(|s| format!("({s})")).unwrap_or_default();
        let bang = if breaking { "!" } else { "" };
        let title = format!("{commit_type}{scope_part}{bang}: {description}");

        let options = ValidationOptions::default();
        let result = validate(&title, &options);
        prop_assume!(result.is_valid);

        let parsed = parse(&title).expect("valid titles must parse");
        prop_assert!(validate(&parsed.header(), &options).is_valid);
        prop_assert_eq!(parsed.header(), title);
    }

    /// Repair candidates for unstructured one-line titles themselves
    /// validate under the options they were generated for.
    #[test]
    fn repaired_titles_validate(title in "[a-zA-Z][a-zA-Z0-9 ]{0,90}") {
        // Inference reuses the original text as the description, so only
        // titles long enough to clear the minimum description length can
        // produce a fully valid candidate.
        prop_assume!(title.trim().chars().count() >= 3);
        let options = ValidationOptions::default();
        for candidate in generate_suggestions(&title, &options) {
            prop_assert!(validate(&candidate, &options).is_valid, "candidate: {candidate}");
        }
    }
}
