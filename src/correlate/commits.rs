use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};

use crate::catalog::CorrelationStrategy;
use crate::config::RevisionEnv;
use crate::error::TestLensError;
use crate::records::CommitReference;

use super::backends::{CodeHosting, TaskBackend};
use super::links;
use super::types::Push;

/// Links an execution back to the change it ran for. Never fails; anything
/// that cannot be resolved yields `CommitReference::Unresolved`.
#[async_trait]
pub trait CommitStrategy: Send + Sync {
    async fn correlate(&self, task_id: &str, push: &Push) -> CommitReference;
}

/// Builds the strategy a project was classified with.
pub fn strategy_for(
    strategy: CorrelationStrategy,
    env: RevisionEnv,
    tasks: Arc<dyn TaskBackend>,
    hosting: Arc<dyn CodeHosting>,
) -> Arc<dyn CommitStrategy> {
    match strategy {
        CorrelationStrategy::PullRequest => Arc::new(PullRequestStrategy {
            tasks,
            hosting,
            env,
        }),
        CorrelationStrategy::PlainCommit => Arc::new(PlainCommitStrategy { tasks, env }),
    }
}

struct TaskRevision {
    repository: String,
    revision: String,
}

async fn task_revision(
    tasks: &dyn TaskBackend,
    env: &RevisionEnv,
    task_id: &str,
) -> Option<TaskRevision> {
    let vars = match tasks.task_environment(task_id).await {
        Ok(vars) => vars,
        Err(e) => {
            warn!(task_id = task_id; "Task definition unavailable: {e}");
            return None;
        }
    };

    match (vars.get(&env.repository), vars.get(&env.revision)) {
        (Some(repository), Some(revision)) => Some(TaskRevision {
            repository: repository.clone(),
            revision: revision.clone(),
        }),
        _ => {
            warn!(
                task_id = task_id,
                repository_key = env.repository.as_str(),
                revision_key = env.revision.as_str();
                "Task payload lacks head repository or revision"
            );
            None
        }
    }
}

/// Commit on the code-hosting service, preferring its first pull request.
pub struct PullRequestStrategy {
    tasks: Arc<dyn TaskBackend>,
    hosting: Arc<dyn CodeHosting>,
    env: RevisionEnv,
}

#[async_trait]
impl CommitStrategy for PullRequestStrategy {
    async fn correlate(&self, task_id: &str, _push: &Push) -> CommitReference {
        let Some(TaskRevision {
            repository,
            revision,
        }) = task_revision(self.tasks.as_ref(), &self.env, task_id).await
        else {
            return CommitReference::Unresolved { revision: None };
        };

        let Some(slug) = links::repository_slug(&repository) else {
            warn!(task_id = task_id, repository = repository.as_str(); "Unrecognised repository URL");
            return CommitReference::Unresolved {
                revision: Some(revision),
            };
        };

        let commit = match self.hosting.get_commit(&slug, &revision).await {
            Ok(commit) => commit,
            Err(e) => {
                let err = TestLensError::CommitUnresolved {
                    revision: revision.clone(),
                    message: e.to_string(),
                };
                warn!(task_id = task_id, repo = slug.as_str(); "{err}");
                return CommitReference::Unresolved {
                    revision: Some(revision),
                };
            }
        };

        match self.hosting.pull_requests_for_commit(&slug, &commit.sha).await {
            Ok(pulls) => {
                if let Some(pull) = pulls.into_iter().next() {
                    debug!(revision = commit.sha.as_str(), pull_request = pull.number; "Commit belongs to a pull request");
                    return CommitReference::PullRequest {
                        revision: commit.sha,
                        url: pull.html_url,
                        title: pull.title,
                    };
                }
            }
            Err(e) => {
                warn!(revision = commit.sha.as_str(); "Pull request lookup failed, using the commit itself: {e}");
            }
        }

        CommitReference::PlainCommit {
            revision: commit.sha,
            url: commit.html_url,
            title: Some(commit.message),
        }
    }
}

/// Browse-by-revision link titled with the matching push comment.
pub struct PlainCommitStrategy {
    tasks: Arc<dyn TaskBackend>,
    env: RevisionEnv,
}

#[async_trait]
impl CommitStrategy for PlainCommitStrategy {
    async fn correlate(&self, task_id: &str, push: &Push) -> CommitReference {
        let Some(TaskRevision {
            repository,
            revision,
        }) = task_revision(self.tasks.as_ref(), &self.env, task_id).await
        else {
            return CommitReference::Unresolved { revision: None };
        };

        let Some(url) = links::revision_url(&repository, &revision) else {
            warn!(task_id = task_id, repository = repository.as_str(); "Unrecognised repository URL");
            return CommitReference::Unresolved {
                revision: Some(revision),
            };
        };

        let title = push.comments_for(&revision).map(str::to_string);
        CommitReference::PlainCommit {
            revision,
            url,
            title,
        }
    }
}
