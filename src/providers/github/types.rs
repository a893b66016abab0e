use serde::Deserialize;

use crate::correlate::types::{CommitInfo, PullRequestInfo};

/// Response of `GET /repos/{owner}/{repo}/commits/{sha}`.
#[derive(Debug, Deserialize)]
pub struct GitHubCommit {
    pub sha: String,
    pub html_url: String,
    pub commit: GitHubCommitDetail,
}

#[derive(Debug, Deserialize)]
pub struct GitHubCommitDetail {
    #[serde(default)]
    pub message: String,
}

/// One entry of `GET /repos/{owner}/{repo}/commits/{sha}/pulls`.
#[derive(Debug, Deserialize)]
pub struct GitHubPullRequest {
    pub number: u64,
    pub html_url: String,
    #[serde(default)]
    pub title: String,
}

impl From<GitHubCommit> for CommitInfo {
    fn from(commit: GitHubCommit) -> Self {
        Self {
            sha: commit.sha,
            html_url: commit.html_url,
            message: commit.commit.message,
        }
    }
}

impl From<GitHubPullRequest> for PullRequestInfo {
    fn from(pull: GitHubPullRequest) -> Self {
        Self {
            number: pull.number,
            html_url: pull.html_url,
            title: pull.title,
        }
    }
}
