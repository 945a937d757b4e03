pub mod types;

pub use types::{ChangedFile, PullRequestRef};

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum HostingError {
    #[error("GitHub API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("GitHub API returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// The two hosting-API calls a review run needs.
///
/// Implemented by `GitHubClient` against the REST API and by in-memory fakes in tests.
#[async_trait]
pub trait HostingApi: Send + Sync {
    /// List the files changed by the pull request. Anything but 200 is an error.
    async fn fetch_changed_files(
        &self,
        pr: &PullRequestRef,
    ) -> Result<Vec<ChangedFile>, HostingError>;

    /// Post `body` as an issue comment on the pull request. Only 201 counts as success.
    async fn post_comment(&self, pr: &PullRequestRef, body: &str) -> Result<(), HostingError>;
}

/// Parse a `GITHUB_REPOSITORY` value (`owner/name`) and a PR number into a `PullRequestRef`.
///
/// Returns `None` for anything that is not exactly two non-empty segments.
pub fn parse_repository(repository: &str, number: u64) -> Option<PullRequestRef> {
    let (owner, repo) = repository.trim().split_once('/')?;
    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }
    Some(PullRequestRef {
        owner: owner.to_string(),
        repo: repo.to_string(),
        number,
    })
}

/// GitHub REST client authenticated with a single token.
pub struct GitHubClient {
    client: reqwest::Client,
    api_url: String,
    token: String,
}

impl GitHubClient {
    pub fn new(client: reqwest::Client, api_url: &str, token: &str) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn files_url(&self, pr: &PullRequestRef) -> String {
        format!(
            "{}/repos/{}/{}/pulls/{}/files?per_page=100",
            self.api_url, pr.owner, pr.repo, pr.number
        )
    }

    // Pull requests share the issue-comment namespace.
    fn comments_url(&self, pr: &PullRequestRef) -> String {
        format!(
            "{}/repos/{}/{}/issues/{}/comments",
            self.api_url, pr.owner, pr.repo, pr.number
        )
    }
}

#[async_trait]
impl HostingApi for GitHubClient {
    #[instrument(skip(self), fields(owner = %pr.owner, repo = %pr.repo, pr = pr.number))]
    async fn fetch_changed_files(
        &self,
        pr: &PullRequestRef,
    ) -> Result<Vec<ChangedFile>, HostingError> {
        debug!("fetching changed files from GitHub API");
        let response = self
            .client
            .get(self.files_url(pr))
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(HostingError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let files = response.json::<Vec<ChangedFile>>().await?;
        debug!(files = files.len(), "received changed files");
        Ok(files)
    }

    #[instrument(skip(self, body), fields(owner = %pr.owner, repo = %pr.repo, pr = pr.number, body_bytes = body.len()))]
    async fn post_comment(&self, pr: &PullRequestRef, body: &str) -> Result<(), HostingError> {
        debug!("posting comment to GitHub API");
        let response = self
            .client
            .post(self.comments_url(pr))
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .json(&serde_json::json!({ "body": body }))
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            return Err(HostingError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!("comment created");
        Ok(())
    }
}
