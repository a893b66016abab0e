use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::auth::Token;
use crate::catalog::CategoryCatalog;
use crate::config::{Config, OutputFormat};
use crate::correlate::{Backends, DatasetAssembler, LinkHosts};
use crate::output::{
    export_dataset, export_disabled_tests, print_catalog, print_summary, PhaseProgress,
};
use crate::providers::{GitHubClient, HttpPolicy, TaskclusterClient, TreeherderClient};

#[derive(Parser)]
#[command(name = "testlens")]
#[command(author, version, about = "CI test result correlation tool", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML, JSON or YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Write log output to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the correlated test dataset for a project
    Build {
        #[arg(short = 'P', long)]
        project: String,

        /// Write the JSON dataset to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(short, long, default_value_t = false)]
        pretty: bool,

        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Collect the tests listed as ignored by shard artifacts into this file
        #[arg(long)]
        disabled_tests_output: Option<PathBuf>,

        #[arg(short = 't', long, env = "GITHUB_TOKEN", hide_env_values = true)]
        github_token: Option<String>,
    },

    /// Print the resolved job categories of a project
    Categories {
        #[arg(short = 'P', long)]
        project: String,
    },

    /// Write a starter configuration file
    Init {
        #[arg(default_value = "testlens.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

struct BuildOptions<'a> {
    project: &'a str,
    output: Option<&'a Path>,
    pretty: bool,
    format: Option<OutputFormat>,
    disabled_tests_output: Option<&'a Path>,
    github_token: Option<&'a str>,
}

impl Cli {
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    async fn execute_build(&self, options: BuildOptions<'_>) -> Result<()> {
        info!(project = options.project; "Building dataset");

        let config = Config::load(self.config.as_deref())?;
        let catalog = CategoryCatalog::resolve(&config, options.project)?;
        let policy = HttpPolicy::from(&config.http);

        let token = options
            .github_token
            .map(Token::from)
            .or_else(|| config.github.token.as_deref().map(Token::from));

        let backends = Backends {
            executions: Arc::new(TreeherderClient::new(&config.treeherder.host, policy)?),
            tasks: Arc::new(TaskclusterClient::new(&config.taskcluster.host, policy)?),
            hosting: Arc::new(GitHubClient::new(&config.github.base_url, token, policy)?),
        };
        let hosts = LinkHosts {
            dashboard: config.treeherder.host.clone(),
            tasks: config.taskcluster.host.clone(),
        };
        let assembler = DatasetAssembler::new(
            catalog,
            backends,
            hosts,
            options.disabled_tests_output.is_some(),
        );

        let progress = PhaseProgress::start_pushes();
        let pushes = match assembler.fetch_pushes().await {
            Ok(pushes) => pushes,
            Err(e) => {
                progress.abandon();
                return Err(e.into());
            }
        };

        let progress = progress.finish_pushes_start_categories(pushes.len());
        let result = assembler
            .build_dataset(&pushes, |name, index, total| {
                progress.category(name, index, total);
            })
            .await;
        let dataset = match result {
            Ok(dataset) => dataset,
            Err(e) => {
                progress.abandon();
                return Err(e.into());
            }
        };

        let progress = progress.finish_categories_start_output(dataset.total_records());
        let format = options.format.unwrap_or(config.output.format);
        let pretty = options.pretty || config.output.pretty;

        if let Some(path) = options.output {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            export_dataset(&dataset, pretty, &mut file)?;
            info!(path = path.display().to_string().as_str(); "Dataset written");
        }

        match format {
            OutputFormat::Summary => print_summary(&dataset),
            OutputFormat::Json if options.output.is_none() => {
                let stdout = std::io::stdout();
                let mut handle = stdout.lock();
                export_dataset(&dataset, pretty, &mut handle)?;
                handle.flush()?;
            }
            OutputFormat::Json => {}
        }

        if let Some(path) = options.disabled_tests_output {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            export_disabled_tests(&dataset, &mut file)?;
            info!(
                path = path.display().to_string().as_str(),
                tests = dataset.disabled_tests.len();
                "Disabled tests written"
            );
        }

        progress.finish_output();
        Ok(())
    }

    fn execute_categories(&self, project: &str) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;
        let catalog = CategoryCatalog::resolve(&config, project)?;
        print_catalog(&catalog);
        Ok(())
    }

    fn execute_init(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            bail!(
                "{} already exists, pass --force to overwrite it",
                path.display()
            );
        }

        Config::example().save(path)?;
        info!(path = path.display().to_string().as_str(); "Configuration written");
        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Build {
                project,
                output,
                pretty,
                format,
                disabled_tests_output,
                github_token,
            } => {
                self.execute_build(BuildOptions {
                    project,
                    output: output.as_deref(),
                    pretty: *pretty,
                    format: *format,
                    disabled_tests_output: disabled_tests_output.as_deref(),
                    github_token: github_token.as_deref(),
                })
                .await
            }
            Commands::Categories { project } => self.execute_categories(project),
            Commands::Init { path, force } => Self::execute_init(path, *force),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_build_arguments() {
        let cli = Cli::try_parse_from([
            "testlens",
            "build",
            "-P",
            "firefox-android",
            "--format",
            "summary",
            "--disabled-tests-output",
            "disabled.json",
            "--log-file",
            "run.log",
        ])
        .unwrap();

        assert_eq!(cli.log_file(), Some(Path::new("run.log")));
        match cli.command {
            Commands::Build {
                project,
                format,
                disabled_tests_output,
                ..
            } => {
                assert_eq!(project, "firefox-android");
                assert_eq!(format, Some(OutputFormat::Summary));
                assert_eq!(disabled_tests_output, Some(PathBuf::from("disabled.json")));
            }
            _ => panic!("expected build command"),
        }
    }

    #[test]
    fn test_build_requires_project() {
        assert!(Cli::try_parse_from(["testlens", "build"]).is_err());
    }

    #[test]
    fn test_init_writes_loadable_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("testlens.toml");

        Cli::execute_init(&path, false).unwrap();
        let config = Config::load(Some(path.as_path())).unwrap();
        assert!(config.projects.contains_key("firefox-android"));

        assert!(Cli::execute_init(&path, false).is_err());
        assert!(Cli::execute_init(&path, true).is_ok());
    }
}
