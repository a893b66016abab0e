use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use log::debug;
use reqwest::Client;
use url::Url;

use crate::catalog::{CategoryCriteria, PushWindow};
use crate::correlate::backends::ExecutionSource;
use crate::correlate::types::{Execution, Push};
use crate::error::{Result, TestLensError};
use crate::providers::http::HttpPolicy;

use super::types::{JobLogUrl, JobPage, PushPage};

const BACKEND: &str = "Treeherder";
/// Largest page the job endpoint serves
pub(super) const PAGE_SIZE: usize = 2000;

/// Treeherder REST client for pushes, jobs and job logs.
pub struct TreeherderClient {
    client: Client,
    api_url: Url,
    policy: HttpPolicy,
    page_size: usize,
}

impl TreeherderClient {
    pub fn new(host: &str, policy: HttpPolicy) -> Result<Self> {
        let api_url = Url::parse(host)
            .map_err(|e| TestLensError::Config(format!("Invalid Treeherder host: {e}")))?
            .join("api/")
            .map_err(|e| TestLensError::Config(format!("Invalid Treeherder API URL: {e}")))?;

        Ok(Self {
            client: policy.client()?,
            api_url,
            policy,
            page_size: PAGE_SIZE,
        })
    }

    #[cfg(test)]
    fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    fn project_url(&self, project: &str, endpoint: &str) -> Result<Url> {
        self.api_url
            .join(&format!("project/{project}/{endpoint}/"))
            .map_err(|e| TestLensError::Config(format!("Invalid project URL: {e}")))
    }

    async fn pushes_until(
        &self,
        project: &str,
        window: PushWindow,
        today: NaiveDate,
    ) -> Result<Vec<Push>> {
        let url = self.project_url(project, "push")?;
        let start = today - chrono::Duration::days(i64::from(window.days));
        let params = [
            ("count", window.max_count.to_string()),
            ("startdate", start.format("%Y-%m-%d").to_string()),
            ("enddate", today.format("%Y-%m-%d").to_string()),
        ];

        let page: PushPage = self
            .policy
            .get_json(BACKEND, || self.client.get(url.clone()).query(&params))
            .await?;

        Ok(page.results)
    }
}

fn job_filters(push: &Push, criteria: &CategoryCriteria) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("push_id", push.id.to_string()),
        ("job_type_symbol", criteria.symbol.clone()),
        ("result", criteria.result.clone()),
    ];
    if let Some(tier) = criteria.tier {
        params.push(("tier", tier.to_string()));
    }
    if let Some(group) = &criteria.group_symbol {
        params.push(("job_group_symbol", group.clone()));
    }
    if let Some(author) = &criteria.author {
        params.push(("who", author.clone()));
    }
    params
}

#[async_trait]
impl ExecutionSource for TreeherderClient {
    async fn list_pushes(&self, project: &str, window: PushWindow) -> Result<Vec<Push>> {
        self.pushes_until(project, window, Utc::now().date_naive())
            .await
    }

    async fn list_executions(
        &self,
        project: &str,
        push: &Push,
        criteria: &CategoryCriteria,
    ) -> Result<Vec<Execution>> {
        let url = self.project_url(project, "jobs")?;
        let filters = job_filters(push, criteria);

        let mut executions = Vec::new();
        let mut offset = 0;
        loop {
            let paging = [
                ("count", self.page_size.to_string()),
                ("offset", offset.to_string()),
            ];
            let page: JobPage = self
                .policy
                .get_json(BACKEND, || {
                    self.client
                        .get(url.clone())
                        .query(&filters)
                        .query(&paging)
                })
                .await?;

            let fetched = page.results.len();
            executions.extend(page.results);
            debug!(push_id = push.id, offset = offset, fetched = fetched; "Fetched job page");

            if fetched < self.page_size {
                break;
            }
            offset += fetched;
        }

        Ok(executions)
    }

    async fn log_urls(&self, project: &str, execution_id: u64) -> Result<Vec<String>> {
        let url = self.project_url(project, "job-log-url")?;
        let logs: Vec<JobLogUrl> = self
            .policy
            .get_json(BACKEND, || {
                self.client
                    .get(url.clone())
                    .query(&[("job_id", execution_id)])
            })
            .await?;

        Ok(logs.into_iter().map(|log| log.url).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::http::test_policy;
    use mockito::{Matcher, Server};

    fn criteria() -> CategoryCriteria {
        CategoryCriteria {
            result: "testfailed".to_string(),
            symbol: "ui-test-apk-fenix-arm".to_string(),
            tier: Some(1),
            group_symbol: Some("fenix".to_string()),
            project: None,
            author: Some("mobile-bot".to_string()),
        }
    }

    fn push(id: u64) -> Push {
        Push {
            id,
            revision: "abc".to_string(),
            revisions: Vec::new(),
        }
    }

    fn job(id: u64, task_id: &str) -> String {
        format!(
            r#"{{"id": {id}, "task_id": "{task_id}", "retry_id": 0, "start_timestamp": 100,
                "end_timestamp": 700, "result": "testfailed", "who": "mobile-bot",
                "last_modified": "2024-03-01T10:00:00", "job_type_symbol": "ui-test-apk-fenix-arm"}}"#
        )
    }

    #[tokio::test]
    async fn test_list_pushes_uses_window() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/project/firefox-android/push/")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("count".into(), "10".into()),
                Matcher::UrlEncoded("startdate".into(), "2024-02-28".into()),
                Matcher::UrlEncoded("enddate".into(), "2024-03-01".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"meta": {"count": 1}, "results": [{"id": 42, "revision": "tip",
                    "author": "dev@example.com",
                    "revisions": [{"revision": "tip", "author": "dev", "comments": "Bug 1 - x"}]}]}"#,
            )
            .create_async()
            .await;

        let client = TreeherderClient::new(&server.url(), test_policy()).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let pushes = client
            .pushes_until("firefox-android", PushWindow { days: 2, max_count: 10 }, today)
            .await
            .unwrap();

        assert_eq!(pushes.len(), 1);
        assert_eq!(pushes[0].id, 42);
        assert_eq!(pushes[0].comments_for("tip"), Some("Bug 1 - x"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_list_executions_filters_and_paginates() {
        let mut server = Server::new_async().await;
        let filters = || {
            vec![
                Matcher::UrlEncoded("push_id".into(), "100".into()),
                Matcher::UrlEncoded("job_type_symbol".into(), "ui-test-apk-fenix-arm".into()),
                Matcher::UrlEncoded("result".into(), "testfailed".into()),
                Matcher::UrlEncoded("tier".into(), "1".into()),
                Matcher::UrlEncoded("job_group_symbol".into(), "fenix".into()),
                Matcher::UrlEncoded("who".into(), "mobile-bot".into()),
            ]
        };

        let mut first = filters();
        first.push(Matcher::UrlEncoded("offset".into(), "0".into()));
        let first_page = server
            .mock("GET", "/api/project/firefox-android/jobs/")
            .match_query(Matcher::AllOf(first))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(r#"{{"results": [{}, {}]}}"#, job(1, "a"), job(2, "b")))
            .create_async()
            .await;

        let mut second = filters();
        second.push(Matcher::UrlEncoded("offset".into(), "2".into()));
        let second_page = server
            .mock("GET", "/api/project/firefox-android/jobs/")
            .match_query(Matcher::AllOf(second))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(r#"{{"results": [{}]}}"#, job(3, "c")))
            .create_async()
            .await;

        let client = TreeherderClient::new(&server.url(), test_policy())
            .unwrap()
            .with_page_size(2);
        let executions = client
            .list_executions("firefox-android", &push(100), &criteria())
            .await
            .unwrap();

        let tasks: Vec<&str> = executions.iter().map(|e| e.task_id.as_str()).collect();
        assert_eq!(tasks, vec!["a", "b", "c"]);
        assert_eq!(executions[0].whole_minutes(), 10);
        first_page.assert_async().await;
        second_page.assert_async().await;
    }

    #[tokio::test]
    async fn test_log_urls() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/project/firefox-android/job-log-url/")
            .match_query(Matcher::UrlEncoded("job_id".into(), "7".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"id": 1, "job_id": 7, "name": "live_backing_log", "url": "https://logs/live.log"},
                    {"id": 2, "job_id": 7, "name": "errorsummary_json", "url": "https://logs/errors.json"}]"#,
            )
            .create_async()
            .await;

        let client = TreeherderClient::new(&server.url(), test_policy()).unwrap();
        let urls = client.log_urls("firefox-android", 7).await.unwrap();
        assert_eq!(urls, vec!["https://logs/live.log", "https://logs/errors.json"]);
    }

    #[tokio::test]
    async fn test_server_errors_exhaust_retries() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/project/firefox-android/push/")
            .match_query(Matcher::Any)
            .with_status(502)
            .expect(2)
            .create_async()
            .await;

        let client = TreeherderClient::new(&server.url(), test_policy()).unwrap();
        let err = client
            .list_pushes("firefox-android", PushWindow { days: 1, max_count: 5 })
            .await
            .unwrap_err();
        assert!(matches!(err, TestLensError::ApiErrorAfterRetries { status: 502, .. }));
    }

    #[test]
    fn test_optional_filters_are_omitted() {
        let mut bare = criteria();
        bare.tier = None;
        bare.group_symbol = None;
        bare.author = None;

        let keys: Vec<&str> = job_filters(&push(1), &bare).iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["push_id", "job_type_symbol", "result"]);
    }
}
