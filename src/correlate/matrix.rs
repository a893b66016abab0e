use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::{Result, TestLensError};
use crate::records::{MatrixAxis, MatrixDetails, OutcomeClass, TestOutcome};

use super::artifacts::ArtifactContent;

/// The device matrix an execution ran on.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixSummary {
    pub general: MatrixDetails,
    pub axes: Vec<MatrixAxis>,
}

#[derive(Deserialize)]
struct MatrixEntry {
    #[serde(flatten)]
    general: MatrixDetails,
    #[serde(default)]
    axes: Vec<MatrixAxis>,
}

#[derive(Deserialize)]
struct ShardEntry {
    #[serde(rename = "junit-ignored", default)]
    ignored: Vec<String>,
}

fn json_object<T: serde::de::DeserializeOwned>(
    artifact: &str,
    content: &ArtifactContent,
) -> Result<IndexMap<String, T>> {
    let ArtifactContent::Json(value) = content else {
        return Err(TestLensError::ArtifactMalformed {
            name: artifact.to_string(),
            message: "expected a JSON object".to_string(),
        });
    };

    IndexMap::<String, T>::deserialize(value).map_err(|e| TestLensError::ArtifactMalformed {
        name: artifact.to_string(),
        message: e.to_string(),
    })
}

/// Reads the matrix artifact. When several matrices are listed the last one wins.
///
/// # Errors
///
/// Returns `ArtifactMalformed` if the content is not an object of matrix entries.
pub fn parse_matrix(artifact: &str, content: &ArtifactContent) -> Result<Option<MatrixSummary>> {
    let entries: IndexMap<String, MatrixEntry> = json_object(artifact, content)?;

    Ok(entries.into_values().last().map(|entry| MatrixSummary {
        general: entry.general,
        axes: entry.axes,
    }))
}

/// One failure per failing device when the matrix is a robo run, which
/// publishes no per-test detail.
pub fn robo_outcomes(matrix: &MatrixSummary) -> Vec<TestOutcome> {
    if !matrix.general.is_robo_test {
        return Vec::new();
    }

    matrix
        .axes
        .iter()
        .filter(|axis| axis.outcome == "failure")
        .map(|axis| TestOutcome {
            name: axis.device.clone(),
            result: OutcomeClass::Failure,
            details: axis.details.clone(),
        })
        .collect()
}

/// Test names every shard lists as ignored.
///
/// # Errors
///
/// Returns `ArtifactMalformed` if the content is not an object of shard entries.
pub fn parse_ignored_tests(artifact: &str, content: &ArtifactContent) -> Result<Vec<String>> {
    let shards: IndexMap<String, ShardEntry> = json_object(artifact, content)?;
    Ok(shards.into_values().flat_map(|s| s.ignored).collect())
}
