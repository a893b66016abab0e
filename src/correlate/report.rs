use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, TestLensError};
use crate::records::{OutcomeClass, TestOutcome};

use super::artifacts::{ArtifactContent, XmlElement};

/// A structured test report, independent of its wire format.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestReport {
    pub suites: Vec<TestSuite>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestSuite {
    pub name: String,
    pub cases: Vec<TestCase>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestCase {
    pub name: String,
    pub classname: String,
    pub flaky: bool,
    pub results: Vec<CaseResult>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseResult {
    pub kind: ResultKind,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    Failure,
    Skipped,
    Other,
}

impl ResultKind {
    fn from_tag(tag: &str) -> Self {
        match tag {
            "failure" => Self::Failure,
            "skipped" => Self::Skipped,
            _ => Self::Other,
        }
    }
}

#[derive(Deserialize)]
struct JsonReport {
    #[serde(default)]
    testsuites: Vec<JsonSuite>,
}

#[derive(Deserialize)]
struct JsonSuite {
    #[serde(default)]
    name: String,
    #[serde(default)]
    testcases: Vec<JsonCase>,
}

#[derive(Deserialize)]
struct JsonCase {
    name: String,
    #[serde(default)]
    classname: String,
    #[serde(default)]
    flaky: Value,
    #[serde(default)]
    results: Vec<JsonResult>,
}

#[derive(Deserialize)]
struct JsonResult {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl TestReport {
    /// Builds a report from a decoded artifact.
    ///
    /// # Errors
    ///
    /// Returns `ArtifactMalformed` if the content does not have the shape of a
    /// test report.
    pub fn from_content(artifact: &str, content: &ArtifactContent) -> Result<Self> {
        match content {
            ArtifactContent::Xml(root) => Self::from_xml(artifact, root),
            ArtifactContent::Json(value) => Self::from_json(artifact, value),
        }
    }

    fn from_xml(artifact: &str, root: &XmlElement) -> Result<Self> {
        if root.name != "testsuites" && root.name != "testsuite" {
            return Err(TestLensError::ArtifactMalformed {
                name: artifact.to_string(),
                message: format!("unexpected root element <{}>", root.name),
            });
        }

        let mut suites = Vec::new();
        collect_xml_suites(root, &mut suites);
        Ok(Self { suites })
    }

    fn from_json(artifact: &str, value: &Value) -> Result<Self> {
        let report = JsonReport::deserialize(value).map_err(|e| TestLensError::ArtifactMalformed {
            name: artifact.to_string(),
            message: e.to_string(),
        })?;

        let suites = report
            .testsuites
            .into_iter()
            .map(|suite| TestSuite {
                name: suite.name,
                cases: suite
                    .testcases
                    .into_iter()
                    .map(|case| TestCase {
                        flaky: is_truthy_value(&case.flaky),
                        name: case.name,
                        classname: case.classname,
                        results: case
                            .results
                            .into_iter()
                            .map(|r| CaseResult {
                                kind: ResultKind::from_tag(&r.kind),
                                text: r.text.filter(|t| !t.is_empty()),
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect();

        Ok(Self { suites })
    }
}

fn collect_xml_suites(element: &XmlElement, suites: &mut Vec<TestSuite>) {
    if element.name == "testsuite" {
        suites.push(TestSuite {
            name: element.attr("name").unwrap_or_default().to_string(),
            cases: element.children_named("testcase").map(xml_case).collect(),
        });
    }

    for child in element.children_named("testsuite") {
        collect_xml_suites(child, suites);
    }
}

fn xml_case(element: &XmlElement) -> TestCase {
    TestCase {
        name: element.attr("name").unwrap_or_default().to_string(),
        classname: element.attr("classname").unwrap_or_default().to_string(),
        flaky: element.attr("flaky").is_some_and(is_truthy),
        results: element
            .children
            .iter()
            .map(|entry| CaseResult {
                kind: ResultKind::from_tag(&entry.name),
                text: Some(entry.text.clone()).filter(|t| !t.is_empty()),
            })
            .collect(),
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}

fn is_truthy_value(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => is_truthy(s),
        _ => false,
    }
}

/// Normalizes a report into failing and flaky outcomes.
///
/// Skipped entries are ignored. Repeated failures of one `classname#name`
/// collapse unless their detail text changes from the last one seen.
pub fn extract_outcomes(report: &TestReport) -> Vec<TestOutcome> {
    let mut last_seen: HashMap<String, Option<String>> = HashMap::new();
    let mut outcomes = Vec::new();

    for case in report.suites.iter().flat_map(|s| &s.cases) {
        for entry in &case.results {
            if entry.kind != ResultKind::Failure {
                continue;
            }

            let result = if case.flaky {
                OutcomeClass::Flaky
            } else {
                OutcomeClass::Failure
            };

            let key = format!("{}#{}", case.classname, case.name);
            let changed = last_seen
                .get(&key)
                .map_or(true, |previous| *previous != entry.text);

            if changed {
                outcomes.push(TestOutcome {
                    name: case.name.clone(),
                    result,
                    details: entry.text.clone(),
                });
            }
            last_seen.insert(key, entry.text.clone());
        }
    }

    outcomes
}
