use thiserror::Error;

#[derive(Error, Debug)]
pub enum TestLensError {
    #[error("{backend} unavailable for project '{project}' ({context}): {message}")]
    UpstreamUnavailable {
        backend: &'static str,
        project: String,
        context: String,
        message: String,
    },

    #[error("Artifact '{name}' unavailable for task {task_id} run {retry_id}: {message}")]
    ArtifactUnavailable {
        task_id: String,
        retry_id: u32,
        name: String,
        message: String,
    },

    #[error("Artifact '{name}' is malformed: {message}")]
    ArtifactMalformed { name: String, message: String },

    #[error("Artifact '{name}' has unsupported content type '{content_type}'")]
    UnsupportedArtifactType { name: String, content_type: String },

    #[error("Commit {revision} could not be resolved: {message}")]
    CommitUnresolved { revision: String, message: String },

    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("API request failed with status {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("API request failed with status {status} after {retries} retries")]
    ApiErrorAfterRetries { status: u16, retries: u32 },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TestLensError {
    /// Wraps a listing failure so the operator sees which project and scope triggered it.
    pub fn upstream(
        backend: &'static str,
        project: &str,
        context: impl Into<String>,
        source: &TestLensError,
    ) -> Self {
        Self::UpstreamUnavailable {
            backend,
            project: project.to_string(),
            context: context.into(),
            message: source.to_string(),
        }
    }

    /// Fatal errors terminate the run; everything else is local to one execution.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UpstreamUnavailable { .. }
                | Self::ConfigurationMissing(_)
                | Self::Config(_)
                | Self::Io(_)
        )
    }

    /// True when the backend answered "not found" rather than failing.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::ApiError { status, .. } => *status == 404,
            Self::Network(e) => e.status().is_some_and(|s| s.as_u16() == 404),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, TestLensError>;
