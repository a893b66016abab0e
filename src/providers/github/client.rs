use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::RequestBuilder;

use crate::auth::Token;
use crate::correlate::backends::CodeHosting;
use crate::correlate::types::{CommitInfo, PullRequestInfo};
use crate::error::{Result, TestLensError};
use crate::providers::http::HttpPolicy;

use super::types::{GitHubCommit, GitHubPullRequest};

const BACKEND: &str = "GitHub";
const MEDIA_TYPE: &str = "application/vnd.github+json";

/// GitHub API client for commit and pull request lookups.
pub struct GitHubClient {
    /// HTTP client
    client: reqwest::Client,
    /// Base URL for GitHub API
    base_url: String,
    /// Optional personal access token
    token: Option<Token>,
    policy: HttpPolicy,
}

impl GitHubClient {
    /// Create a new GitHub API client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - GitHub API base URL (e.g., "https://api.github.com")
    /// * `token` - Optional GitHub personal access token
    /// * `policy` - Retry and timeout policy
    ///
    /// # Returns
    ///
    /// A configured GitHub API client.
    pub fn new(base_url: &str, token: Option<Token>, policy: HttpPolicy) -> Result<Self> {
        url::Url::parse(base_url)
            .map_err(|e| TestLensError::Config(format!("Invalid GitHub base URL: {e}")))?;

        Ok(Self {
            client: policy.client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            policy,
        })
    }

    fn request(&self, path: &str) -> RequestBuilder {
        let request = self
            .client
            .get(format!("{}/repos/{path}", self.base_url))
            .header(ACCEPT, MEDIA_TYPE);

        if let Some(token) = &self.token {
            request.bearer_auth(token.as_str())
        } else {
            request
        }
    }
}

#[async_trait]
impl CodeHosting for GitHubClient {
    async fn get_commit(&self, repo: &str, revision: &str) -> Result<CommitInfo> {
        let path = format!("{repo}/commits/{revision}");
        let commit: GitHubCommit = self
            .policy
            .get_json(BACKEND, || self.request(&path))
            .await?;

        Ok(commit.into())
    }

    /// Pull requests associated with a commit, in the order GitHub lists them.
    async fn pull_requests_for_commit(
        &self,
        repo: &str,
        revision: &str,
    ) -> Result<Vec<PullRequestInfo>> {
        let path = format!("{repo}/commits/{revision}/pulls");
        let pulls: Vec<GitHubPullRequest> = self
            .policy
            .get_json(BACKEND, || self.request(&path))
            .await?;

        Ok(pulls.into_iter().map(Into::into).collect())
    }
}
