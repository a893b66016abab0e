use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, TestLensError};

/// Configuration file structure for testlens.
///
/// Holds the backend hosts, the push window, the artifact names and the
/// per-project category tables. Configuration files are loaded from the
/// current directory, the platform config directory, or a specified path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Result dashboard (pushes and jobs)
    #[serde(default)]
    pub treeherder: TreeherderConfig,

    /// Task execution backend (task definitions and artifacts)
    #[serde(default)]
    pub taskcluster: TaskclusterConfig,

    /// Code hosting backend for pull-request-backed projects
    #[serde(default)]
    pub github: GitHubConfig,

    /// Push window
    #[serde(default)]
    pub pushes: PushesConfig,

    /// Global job filters
    #[serde(default)]
    pub filters: FiltersConfig,

    /// Artifact logical names mapped to backend artifact paths
    #[serde(default)]
    pub artifacts: ArtifactsConfig,

    /// Commit correlation and report detection settings
    #[serde(default)]
    pub correlation: CorrelationConfig,

    /// HTTP retry and timeout policy
    #[serde(default)]
    pub http: HttpConfig,

    /// Output format preferences
    #[serde(default)]
    pub output: OutputConfig,

    /// Monitored projects, each with its ordered job categories
    #[serde(default)]
    pub projects: IndexMap<String, ProjectConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TreeherderConfig {
    /// Treeherder instance base URL
    #[serde(default = "default_treeherder_host")]
    pub host: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TaskclusterConfig {
    /// Taskcluster root URL
    #[serde(default = "default_taskcluster_host")]
    pub host: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GitHubConfig {
    /// GitHub personal access token
    pub token: Option<String>,

    /// GitHub API base URL
    #[serde(default = "default_github_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PushesConfig {
    /// Number of days back from today to fetch pushes for
    #[serde(default = "default_push_days")]
    pub days: u32,

    /// Maximum number of pushes to fetch
    #[serde(default = "default_push_max_count")]
    pub max_count: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FiltersConfig {
    /// Only consider jobs run by this author
    pub author: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ArtifactsConfig {
    /// Device matrix summary
    #[serde(default = "default_matrix_artifact")]
    pub matrix: String,

    /// Shard list carrying the ignored (disabled) tests
    #[serde(default = "default_shards_artifact")]
    pub shards: String,

    /// Structured test report
    #[serde(default = "default_report_artifact")]
    pub report: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CorrelationConfig {
    /// Projects whose commits are correlated through the push comments
    /// instead of pull requests
    #[serde(default)]
    pub plain_commit_projects: Vec<String>,

    /// Job symbols matching this pattern carry structured test reports
    #[serde(default = "default_report_symbol_pattern")]
    pub report_symbol_pattern: String,

    /// Task payload environment keys for pull-request-backed projects
    #[serde(default = "default_pull_request_env")]
    pub pull_request_env: RevisionEnv,

    /// Task payload environment keys for plain-commit projects
    #[serde(default = "default_plain_commit_env")]
    pub plain_commit_env: RevisionEnv,
}

/// Names of the task payload environment variables holding the head repository and revision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct RevisionEnv {
    pub repository: String,
    pub revision: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HttpConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay_seconds")]
    pub retry_delay_seconds: u64,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Default output format
    #[serde(default)]
    pub format: OutputFormat,

    /// Pretty-print JSON output
    #[serde(default)]
    pub pretty: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Summary,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProjectConfig {
    /// Overrides `filters.author` for this project
    pub author: Option<String>,

    /// Overrides the global push window for this project
    pub pushes: Option<PushesConfig>,

    /// Job categories, processed in file order
    #[serde(default)]
    pub categories: IndexMap<String, CategoryConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CategoryConfig {
    /// Job result to match (e.g. "testfailed", "success")
    pub result: String,

    /// Job type symbol
    pub symbol: String,

    /// Job tier
    pub tier: Option<u8>,

    /// Job group symbol
    pub group_symbol: Option<String>,

    /// Owning sub-project, reported in the summary
    pub project: Option<String>,

    /// Overrides the project author filter for this category
    pub author: Option<String>,

    /// Forces artifact extraction on or off regardless of the symbol pattern
    pub carries_reports: Option<bool>,
}

impl Default for TreeherderConfig {
    fn default() -> Self {
        Self {
            host: default_treeherder_host(),
        }
    }
}

impl Default for TaskclusterConfig {
    fn default() -> Self {
        Self {
            host: default_taskcluster_host(),
        }
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: default_github_base_url(),
        }
    }
}

impl Default for PushesConfig {
    fn default() -> Self {
        Self {
            days: default_push_days(),
            max_count: default_push_max_count(),
        }
    }
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            matrix: default_matrix_artifact(),
            shards: default_shards_artifact(),
            report: default_report_artifact(),
        }
    }
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            plain_commit_projects: Vec::new(),
            report_symbol_pattern: default_report_symbol_pattern(),
            pull_request_env: default_pull_request_env(),
            plain_commit_env: default_plain_commit_env(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_seconds: default_retry_delay_seconds(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

fn default_treeherder_host() -> String {
    "https://treeherder.mozilla.org".to_string()
}

fn default_taskcluster_host() -> String {
    "https://firefox-ci-tc.services.mozilla.com".to_string()
}

fn default_github_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_push_days() -> u32 {
    1
}

fn default_push_max_count() -> usize {
    100
}

fn default_matrix_artifact() -> String {
    "public/results/matrix_ids.json".to_string()
}

fn default_shards_artifact() -> String {
    "public/results/android_shards.json".to_string()
}

fn default_report_artifact() -> String {
    "public/results/FullJUnitReport.xml".to_string()
}

fn default_report_symbol_pattern() -> String {
    "^(ui-|robo|legacy|experimental|smoke)".to_string()
}

fn default_pull_request_env() -> RevisionEnv {
    RevisionEnv {
        repository: "MOBILE_HEAD_REPOSITORY".to_string(),
        revision: "MOBILE_HEAD_REV".to_string(),
    }
}

fn default_plain_commit_env() -> RevisionEnv {
    RevisionEnv {
        repository: "GECKO_HEAD_REPOSITORY".to_string(),
        revision: "GECKO_HEAD_REV".to_string(),
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_seconds() -> u64 {
    5
}

fn default_timeout_seconds() -> u64 {
    60
}

const CANDIDATE_FILES: [&str; 4] = [
    "testlens.toml",
    "testlens.json",
    "testlens.yaml",
    "testlens.yml",
];

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path (must exist)
    /// 2. ./testlens.toml, ./testlens.json, ./testlens.yaml, ./testlens.yml
    /// 3. `<platform config dir>/testlens/testlens.toml`
    ///
    /// Returns default configuration if no file is found. Defaults carry no
    /// projects, so resolving a category catalog against them fails later
    /// with a missing-configuration error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            if !path.exists() {
                return Err(TestLensError::ConfigurationMissing(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            return Self::load_from_path(path);
        }

        let mut candidates: Vec<PathBuf> = CANDIDATE_FILES.iter().map(PathBuf::from).collect();
        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join("testlens").join("testlens.toml"));
        }

        Self::load_from_candidates(&candidates)
    }

    fn load_from_candidates(candidates: &[PathBuf]) -> Result<Self> {
        for candidate in candidates {
            if candidate.exists() {
                return Self::load_from_path(candidate);
            }
        }

        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            TestLensError::ConfigurationMissing(format!(
                "failed to read config file {}: {e}",
                path.display()
            ))
        })?;

        debug!("Loading configuration from {}", path.display());

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        let parsed: std::result::Result<Self, String> = match extension {
            "toml" => toml::from_str(&contents).map_err(|e| e.to_string()),
            "json" => serde_json::from_str(&contents).map_err(|e| e.to_string()),
            "yaml" | "yml" => serde_yaml::from_str(&contents).map_err(|e| e.to_string()),
            _ => {
                // Try TOML first, then JSON, then YAML
                toml::from_str(&contents)
                    .or_else(|_| serde_json::from_str(&contents))
                    .or_else(|_| serde_yaml::from_str(&contents))
                    .map_err(|e| e.to_string())
            }
        };

        parsed.map_err(|e| {
            TestLensError::Config(format!("failed to parse {}: {e}", path.display()))
        })
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("yaml" | "yml") => serde_yaml::to_string(self)?,
            _ => toml::to_string_pretty(self).map_err(|e| TestLensError::Config(e.to_string()))?,
        };

        std::fs::write(path, contents)?;

        Ok(())
    }

    /// A starter configuration with one monitored project.
    pub fn example() -> Self {
        let mut categories = IndexMap::new();
        categories.insert(
            "ui-test-apk-fenix".to_string(),
            CategoryConfig {
                result: "testfailed".to_string(),
                symbol: "ui-test-apk-fenix-arm".to_string(),
                tier: Some(1),
                group_symbol: Some("fenix".to_string()),
                project: Some("fenix".to_string()),
                author: None,
                carries_reports: None,
            },
        );

        let mut projects = IndexMap::new();
        projects.insert(
            "firefox-android".to_string(),
            ProjectConfig {
                author: None,
                pushes: None,
                categories,
            },
        );

        Self {
            correlation: CorrelationConfig {
                plain_commit_projects: vec!["mozilla-central".to_string()],
                ..CorrelationConfig::default()
            },
            projects,
            ..Self::default()
        }
    }
}
