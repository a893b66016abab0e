use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

/// The parts of a task definition the correlation step reads.
#[derive(Debug, Deserialize)]
pub struct TaskDefinition {
    #[serde(default)]
    pub payload: TaskPayload,
}

#[derive(Debug, Default, Deserialize)]
pub struct TaskPayload {
    #[serde(default)]
    pub env: HashMap<String, Value>,
}

impl TaskPayload {
    /// Environment values as strings. Non-string values keep their JSON text.
    pub fn env_strings(self) -> HashMap<String, String> {
        self.env
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, value)
            })
            .collect()
    }
}

/// Body returned by the queue when it answers an artifact request with a URL
/// instead of a redirect.
#[derive(Debug, Deserialize)]
pub struct ArtifactLocation {
    pub url: String,
}
