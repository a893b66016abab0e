use std::collections::HashMap;

use async_trait::async_trait;

use crate::catalog::{CategoryCriteria, PushWindow};
use crate::error::Result;

use super::types::{CommitInfo, Execution, PullRequestInfo, Push};

/// Lists pushes and the job executions inside them.
#[async_trait]
pub trait ExecutionSource: Send + Sync {
    /// Pushes of `project` inside the window, in any order.
    async fn list_pushes(&self, project: &str, window: PushWindow) -> Result<Vec<Push>>;

    /// Executions of one push matching `criteria`, all pages, in backend order.
    async fn list_executions(
        &self,
        project: &str,
        push: &Push,
        criteria: &CategoryCriteria,
    ) -> Result<Vec<Execution>>;

    async fn log_urls(&self, project: &str, execution_id: u64) -> Result<Vec<String>>;
}

/// Bytes of an artifact as they came off the wire.
#[derive(Debug, Clone, Default)]
pub struct RawArtifact {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
}

/// Task definitions and artifacts.
#[async_trait]
pub trait TaskBackend: Send + Sync {
    /// `Ok(None)` when the backend reports the artifact does not exist.
    async fn resolve_artifact_location(
        &self,
        task_id: &str,
        retry_id: u32,
        name: &str,
    ) -> Result<Option<String>>;

    async fn fetch_bytes(&self, location: &str) -> Result<RawArtifact>;

    /// The `payload.env` table of the task definition.
    async fn task_environment(&self, task_id: &str) -> Result<HashMap<String, String>>;
}

/// Commit and pull request lookups on the code-hosting service.
#[async_trait]
pub trait CodeHosting: Send + Sync {
    /// `repo` is the `owner/name` slug.
    async fn get_commit(&self, repo: &str, revision: &str) -> Result<CommitInfo>;

    async fn pull_requests_for_commit(
        &self,
        repo: &str,
        revision: &str,
    ) -> Result<Vec<PullRequestInfo>>;
}
