use serde::{Deserialize, Serialize};

/// A batch of commits landed together on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Push {
    pub id: u64,
    pub revision: String,
    #[serde(default)]
    pub revisions: Vec<Revision>,
}

impl Push {
    /// Comment text of the push revision matching `revision`, if any.
    pub fn comments_for(&self, revision: &str) -> Option<&str> {
        self.revisions
            .iter()
            .find(|r| r.revision == revision)
            .map(|r| r.comments.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub revision: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub comments: String,
}

/// One run of one job, identified by task id and retry index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
    /// Dashboard job id
    pub id: u64,
    pub task_id: String,
    #[serde(default)]
    pub retry_id: u32,
    /// Epoch seconds
    pub start_timestamp: i64,
    /// Epoch seconds
    pub end_timestamp: i64,
    pub result: String,
    #[serde(default)]
    pub who: String,
    #[serde(default)]
    pub last_modified: String,
}

impl Execution {
    /// Run length in minutes. A run that ends before it starts counts as 0.
    #[allow(clippy::cast_precision_loss)]
    pub fn duration_minutes(&self) -> f64 {
        (self.end_timestamp - self.start_timestamp).max(0) as f64 / 60.0
    }

    /// Duration rounded to whole minutes.
    #[allow(clippy::cast_possible_truncation)]
    pub fn whole_minutes(&self) -> i64 {
        self.duration_minutes().round() as i64
    }
}

/// A commit as seen by the code-hosting backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub sha: String,
    pub html_url: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestInfo {
    pub number: u64,
    pub html_url: String,
    pub title: String,
}
