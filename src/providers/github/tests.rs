use super::*;
use crate::auth::Token;
use crate::correlate::backends::CodeHosting;
use crate::error::TestLensError;
use crate::providers::http::test_policy;
use mockito::{Matcher, Server};

#[test]
fn test_github_client_rejects_invalid_base_url() {
    let result = GitHubClient::new("not a url", None, test_policy());

    assert!(result.is_err());
    assert!(result.err().unwrap().to_string().contains("GitHub base URL"));
}

#[tokio::test]
async fn test_get_commit_sends_token_and_media_type() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/repos/mozilla-mobile/firefox-android/commits/abc123")
        .match_header("authorization", "Bearer test-token")
        .match_header("accept", "application/vnd.github+json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"sha": "abc123def", "html_url": "https://github.com/mozilla-mobile/firefox-android/commit/abc123def",
                "commit": {"message": "Bug 1870000 - Fix toolbar", "author": {"name": "dev"}}}"#,
        )
        .create_async()
        .await;

    let client = GitHubClient::new(
        &server.url(),
        Some(Token::from("test-token")),
        test_policy(),
    )
    .unwrap();
    let commit = client
        .get_commit("mozilla-mobile/firefox-android", "abc123")
        .await
        .unwrap();

    assert_eq!(commit.sha, "abc123def");
    assert_eq!(commit.message, "Bug 1870000 - Fix toolbar");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_anonymous_requests_send_no_authorization() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/repos/owner/repo/commits/abc/pulls")
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("[]")
        .create_async()
        .await;

    let client = GitHubClient::new(&server.url(), None, test_policy()).unwrap();
    let pulls = client.pull_requests_for_commit("owner/repo", "abc").await.unwrap();

    assert!(pulls.is_empty());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_pull_requests_keep_listing_order() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/repos/owner/repo/commits/abc/pulls")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"[{"number": 12, "html_url": "https://github.com/owner/repo/pull/12", "title": "First", "state": "closed"},
                {"number": 15, "html_url": "https://github.com/owner/repo/pull/15", "title": "Second", "state": "open"}]"#,
        )
        .create_async()
        .await;

    let client = GitHubClient::new(&server.url(), None, test_policy()).unwrap();
    let pulls = client.pull_requests_for_commit("owner/repo", "abc").await.unwrap();

    let numbers: Vec<u64> = pulls.iter().map(|p| p.number).collect();
    assert_eq!(numbers, vec![12, 15]);
    assert_eq!(pulls[0].title, "First");
}

#[tokio::test]
async fn test_unknown_commit_is_api_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/repos/owner/repo/commits/missing")
        .with_status(422)
        .with_body(r#"{"message": "No commit found for SHA: missing"}"#)
        .create_async()
        .await;

    let client = GitHubClient::new(&server.url(), None, test_policy()).unwrap();
    let err = client.get_commit("owner/repo", "missing").await.unwrap_err();

    assert!(matches!(err, TestLensError::ApiError { status: 422, .. }));
    assert!(err.to_string().contains("No commit found"));
}
