use std::collections::{BTreeSet, HashMap};

use crate::catalog::Category;
use crate::records::{CategorySummary, Record};

/// Summary statistics for a category, or `None` when it produced no records.
pub fn summarize(repo: &str, category: &Category, records: &[Record]) -> Option<CategorySummary> {
    if records.is_empty() {
        return None;
    }

    #[allow(clippy::cast_precision_loss)]
    let mean = records.iter().map(|r| r.duration_minutes).sum::<f64>() / records.len() as f64;

    Some(CategorySummary {
        repo: repo.to_string(),
        project: category.criteria.project.clone(),
        job_symbol: category.criteria.symbol.clone(),
        job_result: category.criteria.result.clone(),
        job_duration_avg: round_to_hundredths(mean),
        outcome_count: records.len(),
        duplicates: duplicate_test_names(records),
    })
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Test names reported more than once across all records.
pub fn duplicate_test_names(records: &[Record]) -> BTreeSet<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for outcome in records.iter().flat_map(|r| &r.problem_test_details) {
        *counts.entry(outcome.name.as_str()).or_default() += 1;
    }

    counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(name, _)| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CategoryCriteria;
    use crate::records::{CommitReference, OutcomeClass, TestOutcome};

    fn category() -> Category {
        Category {
            name: "ui-tests".to_string(),
            criteria: CategoryCriteria {
                result: "testfailed".to_string(),
                symbol: "ui-test-apk-fenix-arm".to_string(),
                tier: Some(1),
                group_symbol: None,
                project: Some("fenix".to_string()),
                author: None,
            },
            carries_reports: true,
        }
    }

    fn record(minutes: f64, failing: &[&str]) -> Record {
        Record {
            push_id: 1,
            task_id: "t".to_string(),
            retry_id: 0,
            duration: minutes.round() as i64,
            author: "bot".to_string(),
            result: "testfailed".to_string(),
            task_html_url: String::new(),
            last_modified: String::new(),
            task_log: None,
            matrix_general_details: None,
            matrix_outcome_details: None,
            commit: CommitReference::Unresolved { revision: None },
            problem_test_details: failing
                .iter()
                .map(|name| TestOutcome {
                    name: (*name).to_string(),
                    result: OutcomeClass::Failure,
                    details: None,
                })
                .collect(),
            pushlog: String::new(),
            duration_minutes: minutes,
        }
    }

    #[test]
    fn test_empty_category_has_no_summary() {
        assert!(summarize("firefox-android", &category(), &[]).is_none());
    }

    #[test]
    fn test_average_duration_rounded_to_two_decimals() {
        let records = vec![record(10.0, &[]), record(12.5, &[]), record(11.0 + 1.0 / 3.0, &[])];
        let summary = summarize("firefox-android", &category(), &records).unwrap();

        assert!((summary.job_duration_avg - 11.28).abs() < f64::EPSILON);
        assert_eq!(summary.outcome_count, 3);
        assert_eq!(summary.repo, "firefox-android");
        assert_eq!(summary.project.as_deref(), Some("fenix"));
        assert_eq!(summary.job_symbol, "ui-test-apk-fenix-arm");
    }

    #[test]
    fn test_duplicates_are_names_seen_more_than_once() {
        let records = vec![
            record(1.0, &["testA", "testB"]),
            record(1.0, &["testB", "testC"]),
            record(1.0, &["testD", "testD"]),
        ];

        let duplicates = duplicate_test_names(&records);
        let expected: BTreeSet<String> = ["testB", "testD"].iter().map(|s| s.to_string()).collect();
        assert_eq!(duplicates, expected);
    }
}
