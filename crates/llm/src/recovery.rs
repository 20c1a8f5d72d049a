//! Best-effort recovery of a JSON payload from unreliable model output.
//!
//! Generative backends truncate on token limits, wrap answers in prose or
//! markdown, or emit near-JSON with trailing commentary. A single strict
//! parse would reject most of that, so recovery runs an ordered pipeline of
//! strategies, each tried only when the previous one failed to produce
//! something parseable:
//!
//! 1. strip a single surrounding code fence
//! 2. strip a leading `const/let/var NAME =` assignment prefix
//! 3. discard prose before the first `{` or `[`
//! 4. tolerant parse (trailing commas and comments accepted) of the rest
//! 5. scan for offsets where brace/bracket nesting returns to zero and try
//!    the candidates longest-first
//! 6. blind truncation over the last 1000 characters
//! 7. give up and hand back the input unchanged

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

lazy_static! {
    static ref ASSIGNMENT_RE: Regex =
        Regex::new(r"^\s*(?:const|let|var)\s+[A-Za-z_$][A-Za-z0-9_$]*\s*=\s*")
            .expect("assignment prefix regex is valid");
}

/// Cost bound for the blind truncation scan.
const TRUNCATION_SCAN_WINDOW: usize = 1000;

/// Recover the most plausible JSON payload from `text`.
///
/// On success the recovered value is re-serialized canonically; when every
/// strategy fails the original input is returned unchanged and the caller
/// decides what "could not recover" means.
pub fn extract_json(text: &str) -> String {
    let mut remaining = strip_code_fence(text);
    remaining = strip_assignment(remaining);
    if let Some(idx) = remaining.find(['{', '[']) {
        remaining = &remaining[idx..];
    }

    if let Some(json) = tolerant_parse(remaining).as_ref().and_then(canonical) {
        return json;
    }
    if let Some(json) = balanced_candidates(remaining) {
        return json;
    }
    if let Some(json) = truncation_scan(remaining) {
        return json;
    }

    text.to_string()
}

/// Strip a single surrounding markdown code fence, with or without a
/// language tag. A fence that only opens (trailing prose after the closing
/// backticks) is left for the later strategies to deal with.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    match rest.trim_end().strip_suffix("```") {
        Some(inner) => inner.trim(),
        None => rest.trim(),
    }
}

/// Strip `const data = … ;` wrappers that models emit when asked for JSON.
fn strip_assignment(text: &str) -> &str {
    match ASSIGNMENT_RE.find(text) {
        Some(m) => text[m.end()..].trim().trim_end_matches(';').trim_end(),
        None => text,
    }
}

/// Parse accepting trailing commas and `//` / `/* */` comments. Strict
/// parse is attempted first so well-formed payloads skip normalization.
fn tolerant_parse(text: &str) -> Option<Value> {
    if text.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str(text) {
        return Some(value);
    }
    serde_json::from_str(&normalize_loose_json(text)).ok()
}

fn canonical(value: &Value) -> Option<String> {
    serde_json::to_string(value).ok()
}

/// Rewrite near-JSON into strict JSON: drop comments and trailing commas.
/// The scanner tracks string-literal state so payload text containing `//`
/// or commas is left alone.
fn normalize_loose_json(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    let mut in_string = false;

    while i < chars.len() {
        let c = chars[i];
        if in_string {
            out.push(c);
            if c == '\\' {
                if let Some(&next) = chars.get(i + 1) {
                    out.push(next);
                    i += 2;
                    continue;
                }
            } else if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
                i += 1;
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                i = skip_line_comment(&chars, i);
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i = skip_block_comment(&chars, i);
            }
            ',' => {
                // Drop the comma when the next significant character closes
                // the surrounding container.
                let mut j = i + 1;
                loop {
                    match chars.get(j) {
                        Some(c2) if c2.is_whitespace() => j += 1,
                        Some('/') if chars.get(j + 1) == Some(&'/') => {
                            j = skip_line_comment(&chars, j);
                        }
                        Some('/') if chars.get(j + 1) == Some(&'*') => {
                            j = skip_block_comment(&chars, j);
                        }
                        _ => break,
                    }
                }
                if !matches!(chars.get(j), Some('}') | Some(']')) {
                    out.push(',');
                }
                i += 1;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

fn skip_line_comment(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() && chars[i] != '\n' {
        i += 1;
    }
    i
}

fn skip_block_comment(chars: &[char], mut i: usize) -> usize {
    i += 2;
    while i + 1 < chars.len() && !(chars[i] == '*' && chars[i + 1] == '/') {
        i += 1;
    }
    (i + 2).min(chars.len())
}

/// Scan for every offset where brace/bracket nesting depth returns to zero,
/// tracking string-literal state so braces inside quoted strings are not
/// counted, then try the candidates longest-first. `{` and `[` are counted
/// uniformly; mixed-bracket truncation is a known heuristic limitation.
fn balanced_candidates(text: &str) -> Option<String> {
    let mut ends = Vec::new();
    let mut depth: i64 = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth -= 1;
                if depth == 0 {
                    ends.push(idx + c.len_utf8());
                }
                if depth < 0 {
                    break;
                }
            }
            _ => {}
        }
    }

    for end in ends.iter().rev() {
        if let Some(json) = tolerant_parse(&text[..*end]).as_ref().and_then(canonical) {
            return Some(json);
        }
    }
    None
}

/// Last resort for payloads whose close brace never arrived: try parsing
/// successively shorter prefixes, one character at a time, bounded to the
/// last [`TRUNCATION_SCAN_WINDOW`] characters.
fn truncation_scan(text: &str) -> Option<String> {
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(idx, _)| idx)
        .chain(std::iter::once(text.len()))
        .collect();
    let total = boundaries.len();
    let floor = total.saturating_sub(TRUNCATION_SCAN_WINDOW);

    for &end in boundaries[floor..total].iter().rev() {
        if end == 0 {
            break;
        }
        if let Some(json) = tolerant_parse(&text[..end]).as_ref().and_then(canonical) {
            return Some(json);
        }
    }
    None
}
