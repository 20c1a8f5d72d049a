use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::models::{Comment, PrInfo};
use crate::SourceHost;

const DEFAULT_API_BASE: &str = "https://api.github.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const FILES_PER_PAGE: u32 = 100;

/// GitHub REST adapter for the [`SourceHost`] capability.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    api_base: String,
    /// `owner/name`.
    repository: String,
}

impl GitHubClient {
    pub fn new(token: &str, repository: &str, api_base: Option<String>) -> Result<Self> {
        if token.is_empty() {
            return Err(anyhow!("GitHub token cannot be empty"));
        }
        if repository.split('/').filter(|part| !part.is_empty()).count() != 2 {
            return Err(anyhow!(
                "Repository must be in 'owner/name' form, got '{}'",
                repository
            ));
        }

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| anyhow!("GitHub token contains invalid header characters"))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("prtitle"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            api_base: api_base
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            repository: repository.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        if path.is_empty() {
            format!("{}/repos/{}", self.api_base, self.repository)
        } else {
            format!("{}/repos/{}/{}", self.api_base, self.repository, path)
        }
    }

    async fn error_for_status(response: reqwest::Response, action: &str) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        error!("GitHub API error while {} ({}): {}", action, status, body);
        Err(anyhow!("GitHub API error while {} ({}): {}", action, status, body))
    }
}

#[async_trait]
impl SourceHost for GitHubClient {
    async fn get_pr_info(&self, number: u64) -> Result<PrInfo> {
        debug!("Fetching PR #{} from {}", number, self.repository);

        let response = self
            .client
            .get(self.url(&format!("pulls/{number}")))
            .send()
            .await?;
        let response = Self::error_for_status(response, "fetching the PR").await?;
        let pr: PullRequestPayload = response.json().await?;

        let files_response = self
            .client
            .get(self.url(&format!("pulls/{number}/files")))
            .query(&[("per_page", FILES_PER_PAGE)])
            .send()
            .await?;
        let files_response =
            Self::error_for_status(files_response, "listing changed files").await?;
        let files: Vec<PullRequestFile> = files_response.json().await?;

        Ok(PrInfo {
            number: pr.number,
            title: pr.title,
            body: pr.body,
            draft: pr.draft.unwrap_or(false),
            changed_files: files.into_iter().map(|f| f.filename).collect(),
        })
    }

    async fn update_title(&self, number: u64, new_title: &str) -> Result<()> {
        info!("Updating title of PR #{} in {}", number, self.repository);

        let response = self
            .client
            .patch(self.url(&format!("pulls/{number}")))
            .json(&json!({ "title": new_title }))
            .send()
            .await?;
        Self::error_for_status(response, "updating the title").await?;
        Ok(())
    }

    async fn create_comment(&self, number: u64, body: &str) -> Result<Comment> {
        info!("Commenting on PR #{} in {}", number, self.repository);

        let response = self
            .client
            .post(self.url(&format!("issues/{number}/comments")))
            .json(&json!({ "body": body }))
            .send()
            .await?;
        let response = Self::error_for_status(response, "creating the comment").await?;
        let comment: Comment = response.json().await?;
        Ok(comment)
    }

    async fn check_write_permission(&self) -> Result<bool> {
        let response = self.client.get(self.url("")).send().await?;
        let response = Self::error_for_status(response, "checking permissions").await?;
        let repo: RepositoryPayload = response.json().await?;

        let can_write = repo
            .permissions
            .map(|p| p.push || p.admin || p.maintain)
            .unwrap_or(false);
        if !can_write {
            warn!(
                "Token has no write permission on {}; updates will be downgraded to comments",
                self.repository
            );
        }
        Ok(can_write)
    }
}

#[derive(Debug, Deserialize)]
struct PullRequestPayload {
    number: u64,
    title: String,
    body: Option<String>,
    draft: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct PullRequestFile {
    filename: String,
}

#[derive(Debug, Deserialize)]
struct RepositoryPayload {
    permissions: Option<RepositoryPermissions>,
}

#[derive(Debug, Deserialize, Default)]
struct RepositoryPermissions {
    #[serde(default)]
    push: bool,
    #[serde(default)]
    admin: bool,
    #[serde(default)]
    maintain: bool,
}
