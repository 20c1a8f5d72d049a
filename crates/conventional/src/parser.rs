use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    /// Header grammar: `type(scope)!: description`. The type token is
    /// matched permissively here; the allowed-type policy lives in the
    /// validator, not the parser.
    static ref HEADER_RE: Regex = Regex::new(
        r"^(?P<type>\w+)(?:\((?P<scope>[^)]*)\))?(?P<breaking>!)?: (?P<description>.+)$"
    )
    .expect("header grammar regex is valid");
}

const BREAKING_FOOTER_MARKER: &str = "BREAKING CHANGE:";

/// A fully parsed commit header. Only produced by a successful [`parse`];
/// never partially populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConventionalCommit {
    #[serde(rename = "type")]
    pub commit_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub breaking: bool,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
}

impl ConventionalCommit {
    /// Reassemble the header line `type(scope)!: description`.
    pub fn header(&self) -> String {
        let mut header = self.commit_type.clone();
        if let Some(scope) = &self.scope {
            header.push('(');
            header.push_str(scope);
            header.push(')');
        }
        if self.breaking {
            header.push('!');
        }
        header.push_str(": ");
        header.push_str(&self.description);
        header
    }
}

/// Parse a title into a [`ConventionalCommit`].
///
/// Returns `None` when the first line does not match the grammar; callers
/// treat that as "not structured", not as an error. A `BREAKING CHANGE:`
/// marker on any line after the first sets `breaking` even when the header
/// carries no `!`.
pub fn parse(title: &str) -> Option<ConventionalCommit> {
    let mut lines = title.lines();
    let header = lines.next().unwrap_or("");
    let caps = HEADER_RE.captures(header)?;

    let commit_type = caps["type"].to_string();
    let scope = caps
        .name("scope")
        .map(|m| m.as_str().to_string())
        .filter(|s| !s.is_empty());
    let mut breaking = caps.name("breaking").is_some();
    let description = caps["description"].to_string();

    let rest: Vec<&str> = lines.collect();
    let mut body_lines: Vec<&str> = Vec::new();
    let mut footer_lines: Vec<&str> = Vec::new();
    let mut in_footer = false;
    for line in rest {
        if !in_footer && line.trim_start().starts_with(BREAKING_FOOTER_MARKER) {
            breaking = true;
            in_footer = true;
        }
        if in_footer {
            footer_lines.push(line);
        } else {
            body_lines.push(line);
        }
    }

    let join_nonempty = |lines: Vec<&str>| {
        let joined = lines.join("\n");
        let trimmed = joined.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    };

    Some(ConventionalCommit {
        commit_type,
        scope,
        breaking,
        description,
        body: join_nonempty(body_lines),
        footer: join_nonempty(footer_lines),
    })
}
