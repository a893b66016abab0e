//! In-memory backends for exercising the pipeline without a network.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::catalog::{CategoryCriteria, PushWindow};
use crate::error::{Result, TestLensError};

use super::backends::{CodeHosting, ExecutionSource, RawArtifact, TaskBackend};
use super::types::{CommitInfo, Execution, PullRequestInfo, Push, Revision};

fn not_found(what: &str) -> TestLensError {
    TestLensError::ApiError {
        status: 404,
        message: format!("{what} not found"),
    }
}

fn server_error() -> TestLensError {
    TestLensError::ApiErrorAfterRetries {
        status: 503,
        retries: 3,
    }
}

pub fn push(id: u64, revision: &str) -> Push {
    Push {
        id,
        revision: revision.to_string(),
        revisions: vec![Revision {
            revision: revision.to_string(),
            author: "dev@example.com".to_string(),
            comments: format!("Push {id}"),
        }],
    }
}

pub fn execution(id: u64, task_id: &str, retry_id: u32, minutes: i64) -> Execution {
    Execution {
        id,
        task_id: task_id.to_string(),
        retry_id,
        start_timestamp: 1_700_000_000,
        end_timestamp: 1_700_000_000 + minutes * 60,
        result: "testfailed".to_string(),
        who: "mobile-bot".to_string(),
        last_modified: "2024-01-01T00:00:00".to_string(),
    }
}

#[derive(Default)]
pub struct FakeExecutionSource {
    pushes: Vec<Push>,
    /// Keyed by push id and job symbol
    executions: HashMap<(u64, String), Vec<Execution>>,
    logs: HashMap<u64, Vec<String>>,
    fail_pushes: bool,
    fail_executions: bool,
    /// Push ids requested from `list_executions`, in call order
    pub requested: Mutex<Vec<u64>>,
}

impl FakeExecutionSource {
    pub fn with_push(mut self, push: Push) -> Self {
        self.pushes.push(push);
        self
    }

    pub fn with_executions(mut self, push_id: u64, symbol: &str, executions: Vec<Execution>) -> Self {
        self.executions
            .insert((push_id, symbol.to_string()), executions);
        self
    }

    pub fn with_logs(mut self, execution_id: u64, urls: &[&str]) -> Self {
        self.logs.insert(
            execution_id,
            urls.iter().map(|u| (*u).to_string()).collect(),
        );
        self
    }

    pub fn failing_pushes(mut self) -> Self {
        self.fail_pushes = true;
        self
    }

    pub fn failing_executions(mut self) -> Self {
        self.fail_executions = true;
        self
    }
}

#[async_trait]
impl ExecutionSource for FakeExecutionSource {
    async fn list_pushes(&self, _project: &str, window: PushWindow) -> Result<Vec<Push>> {
        if self.fail_pushes {
            return Err(server_error());
        }
        Ok(self.pushes.iter().take(window.max_count).cloned().collect())
    }

    async fn list_executions(
        &self,
        _project: &str,
        push: &Push,
        criteria: &CategoryCriteria,
    ) -> Result<Vec<Execution>> {
        if self.fail_executions {
            return Err(server_error());
        }
        if let Ok(mut requested) = self.requested.lock() {
            requested.push(push.id);
        }
        Ok(self
            .executions
            .get(&(push.id, criteria.symbol.clone()))
            .cloned()
            .unwrap_or_default())
    }

    async fn log_urls(&self, _project: &str, execution_id: u64) -> Result<Vec<String>> {
        self.logs
            .get(&execution_id)
            .cloned()
            .ok_or_else(|| not_found("job log"))
    }
}

#[derive(Default)]
pub struct FakeTaskBackend {
    artifacts: HashMap<String, RawArtifact>,
    env: HashMap<String, HashMap<String, String>>,
    fail_artifacts: bool,
}

fn artifact_location(task_id: &str, retry_id: u32, name: &str) -> String {
    format!("fake://{task_id}/{retry_id}/{name}")
}

impl FakeTaskBackend {
    pub fn with_artifact(mut self, task_id: &str, retry_id: u32, name: &str, raw: RawArtifact) -> Self {
        self.artifacts
            .insert(artifact_location(task_id, retry_id, name), raw);
        self
    }

    pub fn with_json(self, task_id: &str, retry_id: u32, name: &str, body: &str) -> Self {
        self.with_artifact(
            task_id,
            retry_id,
            name,
            RawArtifact {
                bytes: body.as_bytes().to_vec(),
                content_type: Some("application/json".to_string()),
                content_encoding: None,
            },
        )
    }

    pub fn with_xml(self, task_id: &str, retry_id: u32, name: &str, body: &str) -> Self {
        self.with_artifact(
            task_id,
            retry_id,
            name,
            RawArtifact {
                bytes: body.as_bytes().to_vec(),
                content_type: Some("application/xml".to_string()),
                content_encoding: None,
            },
        )
    }

    pub fn with_env(mut self, task_id: &str, vars: &[(&str, &str)]) -> Self {
        self.env.insert(
            task_id.to_string(),
            vars.iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        );
        self
    }

    pub fn failing_artifacts(mut self) -> Self {
        self.fail_artifacts = true;
        self
    }
}

#[async_trait]
impl TaskBackend for FakeTaskBackend {
    async fn resolve_artifact_location(
        &self,
        task_id: &str,
        retry_id: u32,
        name: &str,
    ) -> Result<Option<String>> {
        if self.fail_artifacts {
            return Err(server_error());
        }
        let location = artifact_location(task_id, retry_id, name);
        Ok(self.artifacts.contains_key(&location).then_some(location))
    }

    async fn fetch_bytes(&self, location: &str) -> Result<RawArtifact> {
        self.artifacts
            .get(location)
            .cloned()
            .ok_or_else(|| not_found(location))
    }

    async fn task_environment(&self, task_id: &str) -> Result<HashMap<String, String>> {
        self.env
            .get(task_id)
            .cloned()
            .ok_or_else(|| not_found("task"))
    }
}

#[derive(Default)]
pub struct FakeCodeHosting {
    /// Keyed by repository slug and sha
    commits: HashMap<(String, String), CommitInfo>,
    pulls: HashMap<String, Vec<PullRequestInfo>>,
    fail_pulls: bool,
}

impl FakeCodeHosting {
    pub fn with_commit(mut self, repo: &str, commit: CommitInfo) -> Self {
        self.commits
            .insert((repo.to_string(), commit.sha.clone()), commit);
        self
    }

    pub fn with_pulls(mut self, sha: &str, pulls: Vec<PullRequestInfo>) -> Self {
        self.pulls.insert(sha.to_string(), pulls);
        self
    }

    pub fn failing_pulls(mut self) -> Self {
        self.fail_pulls = true;
        self
    }
}

#[async_trait]
impl CodeHosting for FakeCodeHosting {
    async fn get_commit(&self, repo: &str, revision: &str) -> Result<CommitInfo> {
        self.commits
            .get(&(repo.to_string(), revision.to_string()))
            .cloned()
            .ok_or_else(|| TestLensError::ApiError {
                status: 422,
                message: "No commit found for SHA".to_string(),
            })
    }

    async fn pull_requests_for_commit(
        &self,
        _repo: &str,
        revision: &str,
    ) -> Result<Vec<PullRequestInfo>> {
        if self.fail_pulls {
            return Err(server_error());
        }
        Ok(self.pulls.get(revision).cloned().unwrap_or_default())
    }
}
