use serde::{Deserialize, Serialize};

/// Snapshot of a pull request as the processing core sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrInfo {
    /// The pull request number.
    pub number: u64,

    /// The title of the pull request.
    pub title: String,

    /// The description/body of the pull request, if any.
    pub body: Option<String>,

    /// Whether the pull request is a draft.
    pub draft: bool,

    /// Paths touched by the pull request.
    pub changed_files: Vec<String>,
}

/// A comment posted on a pull request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    /// The unique identifier of the comment.
    pub id: u64,

    /// The text content of the comment.
    pub body: String,

    /// Link to the comment, when the host provides one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
}
