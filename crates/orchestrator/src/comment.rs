//! Markdown rendering for the suggestion comment.

const FOOTER: &str = "---\n_To apply a suggestion, edit the PR title directly. \
                      This comment was generated automatically._";

/// Render the comment body. A caller-supplied template may use the
/// `${currentTitle}`, `${suggestions}` and `${reasoning}` placeholders;
/// without one the fixed default layout is used.
pub fn render(
    current_title: &str,
    suggestions: &[String],
    reasoning: &str,
    template: Option<&str>,
) -> String {
    let numbered = numbered_list(suggestions);

    match template {
        Some(template) => template
            .replace("${currentTitle}", current_title)
            .replace("${suggestions}", &numbered)
            .replace("${reasoning}", reasoning),
        None => {
            let mut body = String::new();
            body.push_str("## Conventional Commit Title Suggestions\n\n");
            body.push_str(&format!(
                "The current title **`{current_title}`** does not follow the \
                 [Conventional Commits](https://www.conventionalcommits.org) format. \
                 Here are some compliant alternatives:\n\n"
            ));
            body.push_str(&numbered);
            body.push('\n');
            if !reasoning.trim().is_empty() {
                body.push_str(&format!("\n### Reasoning\n\n{reasoning}\n"));
            }
            body.push('\n');
            body.push_str(FOOTER);
            body
        }
    }
}

fn numbered_list(suggestions: &[String]) -> String {
    suggestions
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. `{}`", i + 1, s))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suggestions() -> Vec<String> {
        vec![
            "feat(api): add pagination".to_string(),
            "feat: support pagination".to_string(),
        ]
    }

    #[test]
    fn test_default_template_structure() {
        let body = render("Added pagination", &suggestions(), "new endpoint", None);
        assert!(body.starts_with("## "));
        assert!(body.contains("**`Added pagination`**"));
        assert!(body.contains("1. `feat(api): add pagination`"));
        assert!(body.contains("2. `feat: support pagination`"));
        assert!(body.contains("### Reasoning\n\nnew endpoint"));
        assert!(body.ends_with("generated automatically._"));
    }

    #[test]
    fn test_empty_reasoning_omits_section() {
        let body = render("Added pagination", &suggestions(), "", None);
        assert!(!body.contains("### Reasoning"));
    }

    #[test]
    fn test_custom_template_substitution() {
        let template = "Title: ${currentTitle}\n${suggestions}\nWhy: ${reasoning}";
        let body = render("Old title", &suggestions(), "because", Some(template));
        assert_eq!(
            body,
            "Title: Old title\n1. `feat(api): add pagination`\n2. `feat: support pagination`\nWhy: because"
        );
    }
}
