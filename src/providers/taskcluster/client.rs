use std::collections::HashMap;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_TYPE, LOCATION};
use reqwest::{Client, StatusCode};
use url::Url;

use crate::correlate::backends::{RawArtifact, TaskBackend};
use crate::error::{Result, TestLensError};
use crate::providers::http::{ensure_success, HttpPolicy};

use super::types::{ArtifactLocation, TaskDefinition};

const BACKEND: &str = "Taskcluster";

/// Taskcluster queue client for task definitions and run artifacts.
pub struct TaskclusterClient {
    client: Client,
    /// Used for artifact lookups so the queue's redirect can be read
    lookup_client: Client,
    root_url: String,
    policy: HttpPolicy,
}

impl TaskclusterClient {
    pub fn new(root_url: &str, policy: HttpPolicy) -> Result<Self> {
        Url::parse(root_url)
            .map_err(|e| TestLensError::Config(format!("Invalid Taskcluster host: {e}")))?;

        Ok(Self {
            client: policy.client()?,
            lookup_client: policy.non_redirecting_client()?,
            root_url: root_url.trim_end_matches('/').to_string(),
            policy,
        })
    }

    fn queue_url(&self, path: &str) -> Result<Url> {
        Url::parse(&format!("{}/api/queue/v1/{path}", self.root_url))
            .map_err(|e| TestLensError::Config(format!("Invalid queue URL: {e}")))
    }

    fn artifact_url(&self, task_id: &str, retry_id: u32, name: &str) -> Result<Url> {
        self.queue_url(&format!("task/{task_id}/runs/{retry_id}/artifacts/{name}"))
    }
}

fn header_string(response: &reqwest::Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

#[async_trait]
impl TaskBackend for TaskclusterClient {
    async fn resolve_artifact_location(
        &self,
        task_id: &str,
        retry_id: u32,
        name: &str,
    ) -> Result<Option<String>> {
        let url = self.artifact_url(task_id, retry_id, name)?;
        let response = self
            .policy
            .send(BACKEND, || self.lookup_client.get(url.clone()))
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(task_id = task_id, retry_id = retry_id, artifact = name; "Artifact not published");
            return Ok(None);
        }

        if status.is_redirection() {
            let target = header_string(&response, LOCATION).ok_or_else(|| TestLensError::ApiError {
                status: status.as_u16(),
                message: "redirect without a Location header".to_string(),
            })?;
            let resolved = url
                .join(&target)
                .map(String::from)
                .unwrap_or(target);
            return Ok(Some(resolved));
        }

        let response = ensure_success(response).await?;
        let is_json = header_string(&response, CONTENT_TYPE)
            .is_some_and(|content_type| content_type.contains("json"));
        if is_json {
            if let Ok(location) = response.json::<ArtifactLocation>().await {
                return Ok(Some(location.url));
            }
        }

        // The queue served the artifact itself
        Ok(Some(url.to_string()))
    }

    async fn fetch_bytes(&self, location: &str) -> Result<RawArtifact> {
        let response = self
            .policy
            .send(BACKEND, || {
                self.client
                    .get(location)
                    .header(ACCEPT_ENCODING, "gzip")
            })
            .await?;
        let response = ensure_success(response).await?;

        let content_type = header_string(&response, CONTENT_TYPE);
        let content_encoding = header_string(&response, CONTENT_ENCODING);
        let bytes = response.bytes().await?.to_vec();

        Ok(RawArtifact {
            bytes,
            content_type,
            content_encoding,
        })
    }

    async fn task_environment(&self, task_id: &str) -> Result<HashMap<String, String>> {
        let url = self.queue_url(&format!("task/{task_id}"))?;
        let definition: TaskDefinition = self
            .policy
            .get_json(BACKEND, || self.client.get(url.clone()))
            .await?;

        Ok(definition.payload.env_strings())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::http::test_policy;
    use mockito::Server;
    use tokio_test::assert_ok;

    const MATRIX_PATH: &str = "/api/queue/v1/task/T1/runs/2/artifacts/public/results/matrix_ids.json";

    #[tokio::test]
    async fn test_redirect_becomes_location() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", MATRIX_PATH)
            .with_status(303)
            .with_header("location", "https://storage.example.com/T1/matrix_ids.json")
            .create_async()
            .await;

        let client = TaskclusterClient::new(&server.url(), test_policy()).unwrap();
        let location = client
            .resolve_artifact_location("T1", 2, "public/results/matrix_ids.json")
            .await
            .unwrap();

        assert_eq!(
            location.as_deref(),
            Some("https://storage.example.com/T1/matrix_ids.json")
        );
    }

    #[tokio::test]
    async fn test_missing_artifact_has_no_location() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", MATRIX_PATH)
            .with_status(404)
            .with_body(r#"{"code": "ResourceNotFound"}"#)
            .create_async()
            .await;

        let client = TaskclusterClient::new(&server.url(), test_policy()).unwrap();
        let location = client
            .resolve_artifact_location("T1", 2, "public/results/matrix_ids.json")
            .await
            .unwrap();

        assert!(location.is_none());
    }

    #[tokio::test]
    async fn test_json_answer_carries_url() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", MATRIX_PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"storageType": "s3", "url": "https://storage.example.com/signed"}"#)
            .create_async()
            .await;

        let client = TaskclusterClient::new(&server.url(), test_policy()).unwrap();
        let location = client
            .resolve_artifact_location("T1", 2, "public/results/matrix_ids.json")
            .await
            .unwrap();

        assert_eq!(location.as_deref(), Some("https://storage.example.com/signed"));
    }

    #[tokio::test]
    async fn test_fetch_bytes_keeps_transport_headers() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/blob/report.xml")
            .match_header("accept-encoding", "gzip")
            .with_status(200)
            .with_header("content-type", "application/xml; charset=utf-8")
            .with_header("content-encoding", "gzip")
            .with_body(vec![0x1f_u8, 0x8b, 0x08])
            .create_async()
            .await;

        let client = TaskclusterClient::new(&server.url(), test_policy()).unwrap();
        let raw = assert_ok!(
            client
                .fetch_bytes(&format!("{}/blob/report.xml", server.url()))
                .await
        );

        assert_eq!(raw.bytes, vec![0x1f, 0x8b, 0x08]);
        assert_eq!(raw.content_type.as_deref(), Some("application/xml; charset=utf-8"));
        assert_eq!(raw.content_encoding.as_deref(), Some("gzip"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_task_environment_reads_payload_env() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/queue/v1/task/T1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"taskGroupId": "G", "payload": {"env": {
                    "MOBILE_HEAD_REPOSITORY": "https://github.com/mozilla-mobile/firefox-android",
                    "MOBILE_HEAD_REV": "abc123",
                    "MOZ_SCM_LEVEL": 3}}}"#,
            )
            .create_async()
            .await;

        let client = TaskclusterClient::new(&server.url(), test_policy()).unwrap();
        let env = assert_ok!(client.task_environment("T1").await);

        assert_eq!(env["MOBILE_HEAD_REV"], "abc123");
        assert_eq!(env["MOZ_SCM_LEVEL"], "3");
    }

    #[tokio::test]
    async fn test_task_without_payload_env() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/queue/v1/task/T2")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"payload": {}}"#)
            .create_async()
            .await;

        let client = TaskclusterClient::new(&server.url(), test_policy()).unwrap();
        assert!(client.task_environment("T2").await.unwrap().is_empty());
    }
}
