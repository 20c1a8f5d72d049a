//! Source-host side: the narrow [`SourceHost`] capability the orchestrator
//! consumes, its data models, and the GitHub REST adapter.

pub mod client;
pub mod models;

use anyhow::Result;
use async_trait::async_trait;

pub use client::GitHubClient;
pub use models::{Comment, PrInfo};

/// The operations the processing core needs from a source-control host.
/// Implementations may fail on transport or permission problems; the
/// orchestrator converts those failures into result data at its boundary.
#[async_trait]
pub trait SourceHost: Send + Sync {
    /// Fetch the PR snapshot: title, body, draft flag, changed files.
    async fn get_pr_info(&self, number: u64) -> Result<PrInfo>;

    /// Replace the PR title.
    async fn update_title(&self, number: u64, new_title: &str) -> Result<()>;

    /// Post a comment on the PR.
    async fn create_comment(&self, number: u64, body: &str) -> Result<Comment>;

    /// Whether the configured credentials can write to the repository.
    async fn check_write_permission(&self) -> Result<bool>;
}
