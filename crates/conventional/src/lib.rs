//! Conventional Commits grammar engine.
//!
//! Parses PR titles against the `type(scope)!: description` grammar,
//! validates them against a configurable rule set, and synthesizes repaired
//! candidates for titles that fail validation. Everything in this crate is
//! pure: no I/O, no async, and every function is total over arbitrary
//! string input.

pub mod parser;
pub mod suggestions;
pub mod validator;

pub use parser::{parse, ConventionalCommit};
pub use suggestions::generate_suggestions;
pub use validator::{is_conventional, validate, ValidationOptions, ValidationResult};
