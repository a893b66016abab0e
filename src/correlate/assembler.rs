use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::Utc;
use indexmap::IndexMap;
use log::{debug, info, warn};

use crate::catalog::{Category, CategoryCatalog};
use crate::error::{Result, TestLensError};
use crate::records::{CategoryDataset, Dataset, Record, TestOutcome};

use super::artifacts::{ArtifactFetch, ArtifactResolver};
use super::backends::{CodeHosting, ExecutionSource, TaskBackend};
use super::commits::{strategy_for, CommitStrategy};
use super::links;
use super::matrix::{self, MatrixSummary};
use super::report::{extract_outcomes, TestReport};
use super::summary::summarize;
use super::types::{Execution, Push};

const SOURCE: &str = "execution source";

/// The three backends a run talks to.
pub struct Backends {
    pub executions: Arc<dyn ExecutionSource>,
    pub tasks: Arc<dyn TaskBackend>,
    pub hosting: Arc<dyn CodeHosting>,
}

/// Web hosts used for the links embedded in each record.
#[derive(Debug, Clone)]
pub struct LinkHosts {
    pub dashboard: String,
    pub tasks: String,
}

/// Per-run accumulator handed through every stage of the pipeline.
#[derive(Debug, Default)]
pub struct RunContext {
    categories: Vec<CategoryDataset>,
    empty_categories: Vec<String>,
    disabled_tests: BTreeSet<String>,
}

impl RunContext {
    fn into_dataset(self, project: &str) -> Dataset {
        Dataset {
            project: project.to_string(),
            collected_at: Utc::now(),
            categories: self.categories,
            empty_categories: self.empty_categories,
            disabled_tests: self.disabled_tests,
        }
    }
}

/// Walks categories, pushes and executions, and folds everything into records.
pub struct DatasetAssembler {
    catalog: CategoryCatalog,
    source: Arc<dyn ExecutionSource>,
    artifacts: ArtifactResolver,
    commits: Arc<dyn CommitStrategy>,
    hosts: LinkHosts,
    collect_disabled_tests: bool,
}

impl DatasetAssembler {
    pub fn new(
        catalog: CategoryCatalog,
        backends: Backends,
        hosts: LinkHosts,
        collect_disabled_tests: bool,
    ) -> Self {
        let commits = strategy_for(
            catalog.strategy,
            catalog.revision_env.clone(),
            Arc::clone(&backends.tasks),
            backends.hosting,
        );

        Self {
            artifacts: ArtifactResolver::new(backends.tasks),
            source: backends.executions,
            commits,
            catalog,
            hosts,
            collect_disabled_tests,
        }
    }

    pub fn catalog(&self) -> &CategoryCatalog {
        &self.catalog
    }

    /// Pushes inside the catalog's window, in ascending id order.
    ///
    /// # Errors
    ///
    /// Any listing failure is returned as `UpstreamUnavailable`.
    pub async fn fetch_pushes(&self) -> Result<Vec<Push>> {
        let project = &self.catalog.project;
        info!(
            project = project.as_str(),
            days = self.catalog.window.days,
            max_count = self.catalog.window.max_count;
            "Fetching pushes"
        );

        let mut pushes = self
            .source
            .list_pushes(project, self.catalog.window)
            .await
            .map_err(|e| TestLensError::upstream(SOURCE, project, "push listing", &e))?;

        pushes.sort_by_key(|p| p.id);
        info!(project = project.as_str(), pushes = pushes.len(); "Fetched pushes");
        Ok(pushes)
    }

    /// Builds the dataset for every category of the catalog.
    ///
    /// `on_category` is called with the category name, its index and the
    /// total before each category is processed.
    ///
    /// # Errors
    ///
    /// Only fatal errors are returned; per-execution failures are logged and
    /// the execution is left out.
    pub async fn build_dataset<F>(&self, pushes: &[Push], mut on_category: F) -> Result<Dataset>
    where
        F: FnMut(&str, usize, usize),
    {
        let mut ctx = RunContext::default();
        let total = self.catalog.categories().len();

        for (index, category) in self.catalog.categories().iter().enumerate() {
            on_category(&category.name, index, total);

            let records = self.collect_category(category, pushes, &mut ctx).await?;

            match summarize(&self.catalog.project, category, &records) {
                Some(summary) => {
                    info!(
                        category = category.name.as_str(),
                        records = records.len(),
                        duration_avg = summary.job_duration_avg;
                        "Category collected"
                    );
                    ctx.categories.push(CategoryDataset {
                        name: category.name.clone(),
                        records,
                        summary,
                    });
                }
                None => {
                    info!(category = category.name.as_str(); "No results");
                    ctx.empty_categories.push(category.name.clone());
                }
            }
        }

        Ok(ctx.into_dataset(&self.catalog.project))
    }

    async fn collect_category(
        &self,
        category: &Category,
        pushes: &[Push],
        ctx: &mut RunContext,
    ) -> Result<Vec<Record>> {
        let project = &self.catalog.project;
        let mut highest_retry: HashMap<String, u32> = HashMap::new();
        let mut records: IndexMap<String, Record> = IndexMap::new();

        for push in pushes {
            let executions = self
                .source
                .list_executions(project, push, &category.criteria)
                .await
                .map_err(|e| {
                    TestLensError::upstream(
                        SOURCE,
                        project,
                        format!("category '{}', push {}", category.name, push.id),
                        &e,
                    )
                })?;

            debug!(
                category = category.name.as_str(),
                push_id = push.id,
                executions = executions.len();
                "Listed executions"
            );

            for execution in executions {
                if let Some(&newest) = highest_retry.get(&execution.task_id) {
                    if execution.retry_id <= newest {
                        info!(
                            category = category.name.as_str(),
                            task_id = execution.task_id.as_str(),
                            retry_id = execution.retry_id,
                            newest_retry_id = newest;
                            "Skipping run, a newer run of this task was already seen"
                        );
                        continue;
                    }
                    if records.shift_remove(&execution.task_id).is_some() {
                        info!(
                            category = category.name.as_str(),
                            task_id = execution.task_id.as_str(),
                            retry_id = execution.retry_id,
                            superseded_retry_id = newest;
                            "Replacing record with a newer run"
                        );
                    }
                }
                highest_retry.insert(execution.task_id.clone(), execution.retry_id);

                match self.process(category, push, &execution, ctx).await {
                    Ok(record) => {
                        records.insert(execution.task_id.clone(), record);
                    }
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        warn!(
                            category = category.name.as_str(),
                            task_id = execution.task_id.as_str(),
                            retry_id = execution.retry_id;
                            "Skipping execution: {e}"
                        );
                    }
                }
            }
        }

        Ok(records.into_values().collect())
    }

    async fn process(
        &self,
        category: &Category,
        push: &Push,
        execution: &Execution,
        ctx: &mut RunContext,
    ) -> Result<Record> {
        let task_log = self.task_log(execution).await;

        let mut matrix: Option<MatrixSummary> = None;
        let mut outcomes: Vec<TestOutcome> = Vec::new();

        if category.carries_reports {
            matrix = self.fetch_matrix(execution).await;

            if self.collect_disabled_tests {
                self.collect_ignored_tests(execution, ctx).await;
            }

            let report = self.fetch_report(execution).await?;
            outcomes = extract_outcomes(&report);
            if let Some(matrix) = &matrix {
                outcomes.extend(matrix::robo_outcomes(matrix));
            }
        }

        let commit = self.commits.correlate(&execution.task_id, push).await;
        let pushlog_revision = commit.revision().unwrap_or(&push.revision);
        let pushlog = links::pushlog_url(&self.hosts.dashboard, &self.catalog.project, pushlog_revision);

        let (matrix_general_details, matrix_outcome_details) = match matrix {
            Some(MatrixSummary { general, axes }) => (Some(general), Some(axes)),
            None => (None, None),
        };

        debug!(
            category = category.name.as_str(),
            push_id = push.id,
            task_id = execution.task_id.as_str(),
            retry_id = execution.retry_id,
            outcomes = outcomes.len(),
            commit_source = commit.source().unwrap_or("unresolved");
            "Assembled record"
        );

        Ok(Record {
            push_id: push.id,
            task_id: execution.task_id.clone(),
            retry_id: execution.retry_id,
            duration: execution.whole_minutes(),
            author: execution.who.clone(),
            result: execution.result.clone(),
            task_html_url: links::task_url(&self.hosts.tasks, &execution.task_id),
            last_modified: execution.last_modified.clone(),
            task_log,
            matrix_general_details,
            matrix_outcome_details,
            commit,
            problem_test_details: outcomes,
            pushlog,
            duration_minutes: execution.duration_minutes(),
        })
    }

    async fn task_log(&self, execution: &Execution) -> Option<String> {
        match self.source.log_urls(&self.catalog.project, execution.id).await {
            Ok(urls) if urls.is_empty() => None,
            Ok(urls) => Some(urls.join(" ")),
            Err(e) => {
                warn!(task_id = execution.task_id.as_str(), job_id = execution.id; "Log URLs unavailable: {e}");
                None
            }
        }
    }

    async fn fetch_matrix(&self, execution: &Execution) -> Option<MatrixSummary> {
        let name = &self.catalog.artifacts.matrix;
        let fetched = self
            .artifacts
            .fetch(&execution.task_id, execution.retry_id, name)
            .await
            .and_then(|fetched| match fetched {
                ArtifactFetch::Content(content) => matrix::parse_matrix(name, &content),
                ArtifactFetch::Absent => Ok(None),
            });

        match fetched {
            Ok(matrix) => matrix,
            Err(e) => {
                warn!(task_id = execution.task_id.as_str(), retry_id = execution.retry_id; "Ignoring matrix artifact: {e}");
                None
            }
        }
    }

    async fn collect_ignored_tests(&self, execution: &Execution, ctx: &mut RunContext) {
        let name = &self.catalog.artifacts.shards;
        let fetched = self
            .artifacts
            .fetch(&execution.task_id, execution.retry_id, name)
            .await
            .and_then(|fetched| match fetched {
                ArtifactFetch::Content(content) => matrix::parse_ignored_tests(name, &content),
                ArtifactFetch::Absent => Ok(Vec::new()),
            });

        match fetched {
            Ok(ignored) => ctx.disabled_tests.extend(ignored),
            Err(e) => {
                warn!(task_id = execution.task_id.as_str(), retry_id = execution.retry_id; "Ignoring shard artifact: {e}");
            }
        }
    }

    async fn fetch_report(&self, execution: &Execution) -> Result<TestReport> {
        let name = &self.catalog.artifacts.report;
        match self
            .artifacts
            .fetch(&execution.task_id, execution.retry_id, name)
            .await?
        {
            ArtifactFetch::Content(content) => TestReport::from_content(name, &content),
            ArtifactFetch::Absent => Err(TestLensError::ArtifactUnavailable {
                task_id: execution.task_id.clone(),
                retry_id: execution.retry_id,
                name: name.clone(),
                message: "not published".to_string(),
            }),
        }
    }
}
