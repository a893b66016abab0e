use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// The full result of one run, before it is handed to the output sink.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub project: String,
    pub collected_at: DateTime<Utc>,
    /// Categories with at least one record, in catalog order
    pub categories: Vec<CategoryDataset>,
    /// Categories that produced no records
    pub empty_categories: Vec<String>,
    /// Tests listed as ignored by shard artifacts (only when requested)
    pub disabled_tests: BTreeSet<String>,
}

impl Dataset {
    pub fn total_records(&self) -> usize {
        self.categories.iter().map(|c| c.records.len()).sum()
    }
}

/// One category's records and summary.
///
/// Serializes as `{"<category name>": [records...], "summary": {...}}`.
#[derive(Debug, Clone)]
pub struct CategoryDataset {
    pub name: String,
    pub records: Vec<Record>,
    pub summary: CategorySummary,
}

impl Serialize for CategoryDataset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(&self.name, &self.records)?;
        map.serialize_entry("summary", &self.summary)?;
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    /// Dashboard project the run was made against
    pub repo: String,
    /// Owning sub-project of the category
    pub project: Option<String>,
    pub job_symbol: String,
    pub job_result: String,
    /// Mean duration in minutes, rounded to 2 decimals
    pub job_duration_avg: f64,
    pub outcome_count: usize,
    /// Test names reported more than once across the category
    pub duplicates: BTreeSet<String>,
}

/// One execution joined with its artifacts and originating commit.
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    pub push_id: u64,
    pub task_id: String,
    pub retry_id: u32,
    /// Whole minutes
    pub duration: i64,
    pub author: String,
    pub result: String,
    pub task_html_url: String,
    pub last_modified: String,
    pub task_log: Option<String>,
    pub matrix_general_details: Option<MatrixDetails>,
    pub matrix_outcome_details: Option<Vec<MatrixAxis>>,
    #[serde(flatten)]
    pub commit: CommitReference,
    pub problem_test_details: Vec<TestOutcome>,
    pub pushlog: String,
    #[serde(skip)]
    pub duration_minutes: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeClass {
    Failure,
    Flaky,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub name: String,
    pub result: OutcomeClass,
    pub details: Option<String>,
}

/// General information about a device test matrix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixDetails {
    pub web_link: Option<String>,
    pub gcs_path: Option<String>,
    pub matrix_id: Option<String>,
    #[serde(default)]
    pub is_robo_test: bool,
}

/// Outcome of a matrix on one device configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixAxis {
    #[serde(default)]
    pub device: String,
    #[serde(default)]
    pub outcome: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The change an execution was run for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitReference {
    PullRequest {
        revision: String,
        url: String,
        title: String,
    },
    PlainCommit {
        revision: String,
        url: String,
        title: Option<String>,
    },
    Unresolved {
        revision: Option<String>,
    },
}

impl CommitReference {
    pub fn revision(&self) -> Option<&str> {
        match self {
            Self::PullRequest { revision, .. } | Self::PlainCommit { revision, .. } => {
                Some(revision)
            }
            Self::Unresolved { revision } => revision.as_deref(),
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            Self::PullRequest { url, .. } | Self::PlainCommit { url, .. } => Some(url),
            Self::Unresolved { .. } => None,
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            Self::PullRequest { title, .. } => Some(title),
            Self::PlainCommit { title, .. } => title.as_deref(),
            Self::Unresolved { .. } => None,
        }
    }

    pub fn source(&self) -> Option<&'static str> {
        match self {
            Self::PullRequest { .. } => Some("pull_request"),
            Self::PlainCommit { .. } => Some("commit"),
            Self::Unresolved { .. } => None,
        }
    }
}

#[derive(Serialize)]
struct CommitFields<'a> {
    revision: Option<&'a str>,
    pullreq_html_url: Option<&'a str>,
    pullreq_html_title: Option<&'a str>,
    commit_source: Option<&'static str>,
}

impl Serialize for CommitReference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        CommitFields {
            revision: self.revision(),
            pullreq_html_url: self.url(),
            pullreq_html_title: self.title(),
            commit_source: self.source(),
        }
        .serialize(serializer)
    }
}
