use regex::Regex;
use serde::Serialize;

use crate::config::{Config, RevisionEnv};
use crate::error::{Result, TestLensError};

/// How executions of a project are linked back to the change that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationStrategy {
    /// Commit lookup on the code-hosting backend, preferring its pull request
    PullRequest,
    /// Revision lookup in the push itself, no review concept
    PlainCommit,
}

impl CorrelationStrategy {
    pub fn label(self) -> &'static str {
        match self {
            Self::PullRequest => "pull request",
            Self::PlainCommit => "plain commit",
        }
    }
}

/// Server-side filter applied when listing a category's executions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCriteria {
    pub result: String,
    pub symbol: String,
    pub tier: Option<u8>,
    pub group_symbol: Option<String>,
    pub project: Option<String>,
    pub author: Option<String>,
}

/// A named, configured subset of executions to track.
#[derive(Debug, Clone)]
pub struct Category {
    pub name: String,
    pub criteria: CategoryCriteria,
    /// Whether executions of this category publish matrix and report artifacts
    pub carries_reports: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushWindow {
    pub days: u32,
    pub max_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactNames {
    pub matrix: String,
    pub shards: String,
    pub report: String,
}

/// Everything the pipeline needs to know about one project, resolved once per run.
#[derive(Debug, Clone)]
pub struct CategoryCatalog {
    pub project: String,
    pub window: PushWindow,
    pub artifacts: ArtifactNames,
    pub strategy: CorrelationStrategy,
    pub revision_env: RevisionEnv,
    categories: Vec<Category>,
}

impl CategoryCatalog {
    /// Resolves the catalog for `project` from the loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationMissing` if the project is not configured or has
    /// no categories, and `Config` if the report symbol pattern is invalid.
    pub fn resolve(config: &Config, project: &str) -> Result<Self> {
        let project_config = config.projects.get(project).ok_or_else(|| {
            TestLensError::ConfigurationMissing(format!("no configuration for project '{project}'"))
        })?;

        if project_config.categories.is_empty() {
            return Err(TestLensError::ConfigurationMissing(format!(
                "project '{project}' has no categories"
            )));
        }

        let report_pattern = Regex::new(&config.correlation.report_symbol_pattern).map_err(|e| {
            TestLensError::Config(format!(
                "invalid report symbol pattern '{}': {e}",
                config.correlation.report_symbol_pattern
            ))
        })?;

        let project_author = project_config
            .author
            .clone()
            .or_else(|| config.filters.author.clone());

        let categories = project_config
            .categories
            .iter()
            .map(|(name, category)| Category {
                name: name.clone(),
                carries_reports: category
                    .carries_reports
                    .unwrap_or_else(|| report_pattern.is_match(&category.symbol)),
                criteria: CategoryCriteria {
                    result: category.result.clone(),
                    symbol: category.symbol.clone(),
                    tier: category.tier,
                    group_symbol: category.group_symbol.clone(),
                    project: category.project.clone(),
                    author: category.author.clone().or_else(|| project_author.clone()),
                },
            })
            .collect();

        let pushes = project_config.pushes.as_ref().unwrap_or(&config.pushes);

        let strategy = if config
            .correlation
            .plain_commit_projects
            .iter()
            .any(|p| p.trim() == project)
        {
            CorrelationStrategy::PlainCommit
        } else {
            CorrelationStrategy::PullRequest
        };

        let revision_env = match strategy {
            CorrelationStrategy::PullRequest => config.correlation.pull_request_env.clone(),
            CorrelationStrategy::PlainCommit => config.correlation.plain_commit_env.clone(),
        };

        Ok(Self {
            project: project.to_string(),
            window: PushWindow {
                days: pushes.days,
                max_count: pushes.max_count,
            },
            artifacts: ArtifactNames {
                matrix: config.artifacts.matrix.clone(),
                shards: config.artifacts.shards.clone(),
                report: config.artifacts.report.clone(),
            },
            strategy,
            revision_env,
            categories,
        })
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }
}
