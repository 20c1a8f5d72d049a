//! Action-style key/value outputs.
//!
//! When `GITHUB_OUTPUT` points at a file the outputs are appended there in
//! the runner's format (heredoc syntax for multi-line values); otherwise
//! they go to stdout so local runs stay inspectable.

use anyhow::{Context, Result};
use std::env;
use std::fs::OpenOptions;
use std::io::Write;

use orchestrator::ProcessingResult;

pub fn write_outputs(result: &ProcessingResult, original_title: &str) -> Result<()> {
    let mut pairs = vec![
        ("is-conventional", result.is_conventional.to_string()),
        (
            "suggested-titles",
            serde_json::to_string(&result.suggestions)
                .context("serializing suggested titles")?,
        ),
        ("original-title", original_title.to_string()),
        ("action-taken", result.action_taken.as_str().to_string()),
    ];
    if let Some(message) = &result.error_message {
        pairs.push(("error-message", message.clone()));
    }

    match env::var("GITHUB_OUTPUT") {
        Ok(path) if !path.is_empty() => {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("opening output file {path}"))?;
            for (name, value) in &pairs {
                file.write_all(format_output(name, value).as_bytes())
                    .context("writing output file")?;
            }
        }
        _ => {
            for (name, value) in &pairs {
                print!("{}", format_output(name, value));
            }
        }
    }
    Ok(())
}

/// One `name=value` line, or heredoc syntax when the value spans lines.
fn format_output(name: &str, value: &str) -> String {
    if value.contains('\n') {
        let mut delimiter = "EOF".to_string();
        while value.contains(&delimiter) {
            delimiter.push('_');
        }
        format!("{name}<<{delimiter}\n{value}\n{delimiter}\n")
    } else {
        format!("{name}={value}\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orchestrator::{ActionTaken, ProcessingResult};
    use serial_test::serial;

    fn sample_result() -> ProcessingResult {
        ProcessingResult {
            is_conventional: false,
            suggestions: vec!["feat(api): add pagination".to_string()],
            reasoning: "adds an endpoint".to_string(),
            action_taken: ActionTaken::Updated,
            error_message: None,
        }
    }

    #[test]
    fn test_single_line_format() {
        assert_eq!(format_output("action-taken", "updated"), "action-taken=updated\n");
    }

    #[test]
    fn test_multi_line_uses_heredoc() {
        let formatted = format_output("error-message", "line one\nline two");
        assert_eq!(formatted, "error-message<<EOF\nline one\nline two\nEOF\n");
    }

    #[test]
    fn test_heredoc_delimiter_avoids_collision() {
        let formatted = format_output("error-message", "contains EOF marker\nsecond");
        assert!(formatted.starts_with("error-message<<EOF_\n"));
    }

    #[test]
    #[serial]
    fn test_outputs_appended_to_github_output_file() {
        let file = tempfile::NamedTempFile::new().expect("temp file");
        std::env::set_var("GITHUB_OUTPUT", file.path());

        write_outputs(&sample_result(), "Added pagination").expect("write should succeed");
        std::env::remove_var("GITHUB_OUTPUT");

        let contents = std::fs::read_to_string(file.path()).expect("read back");
        assert!(contents.contains("is-conventional=false\n"));
        assert!(contents.contains("suggested-titles=[\"feat(api): add pagination\"]\n"));
        assert!(contents.contains("original-title=Added pagination\n"));
        assert!(contents.contains("action-taken=updated\n"));
        assert!(!contents.contains("error-message"));
    }

    #[test]
    #[serial]
    fn test_error_message_included_when_present() {
        let file = tempfile::NamedTempFile::new().expect("temp file");
        std::env::set_var("GITHUB_OUTPUT", file.path());

        let result = ProcessingResult::failure(false, "boom".to_string());
        write_outputs(&result, "Added pagination").expect("write should succeed");
        std::env::remove_var("GITHUB_OUTPUT");

        let contents = std::fs::read_to_string(file.path()).expect("read back");
        assert!(contents.contains("error-message=boom\n"));
        assert!(contents.contains("action-taken=error\n"));
    }
}
