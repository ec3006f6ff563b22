//! GitHub adapter tests against a mock HTTP server.

use base64::Engine;
use chrono::{TimeZone, Utc};
use mockito::{Matcher, Server};
use stalebot::adapters::github::{GitHubClient, GitHubError, GitHubPlatform, RetryPolicy};
use stalebot::domain::errors::DomainError;
use stalebot::domain::models::{ItemKind, RepoId, CONFIG_PATH};
use stalebot::domain::ports::{IssuePlatform, ItemQuery};

fn client(server: &Server) -> GitHubClient {
    GitHubClient::new("test-token")
        .with_base_url(&server.url())
        .unwrap()
        .with_rate_limit(10_000)
        .with_retry_policy(RetryPolicy::new(3, 10, 100))
}

fn repo() -> RepoId {
    RepoId::new("octo", "widgets")
}

fn issue_json(number: u64, labels: &[&str], pull: bool) -> serde_json::Value {
    let mut issue = serde_json::json!({
        "number": number,
        "title": format!("Item {number}"),
        "state": "open",
        "labels": labels.iter().map(|l| serde_json::json!({ "name": l })).collect::<Vec<_>>(),
        "updated_at": "2024-03-01T00:00:00Z",
    });
    if pull {
        issue["pull_request"] = serde_json::json!({ "url": "https://api.github.com/pulls/1" });
    }
    issue
}

#[tokio::test]
async fn test_get_item_sends_auth_headers() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/repos/octo/widgets/issues/7")
        .match_header("authorization", "Bearer test-token")
        .match_header("accept", "application/vnd.github+json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(issue_json(7, &["wontfix"], true).to_string())
        .create_async()
        .await;

    let platform = GitHubPlatform::new(client(&server));
    let item = platform.get_item(&repo(), 7).await.unwrap();

    assert_eq!(item.kind, ItemKind::PullRequest);
    assert!(item.has_label("wontfix"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_list_open_items_uses_search_and_refilters() {
    let mut server = Server::new_async().await;
    let body = serde_json::json!({
        "total_count": 2,
        "incomplete_results": false,
        "items": [issue_json(1, &[], false), issue_json(2, &["pinned"], false)],
    });
    let mock = server
        .mock("GET", "/search/issues")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded(
                "q".into(),
                "repo:octo/widgets is:open is:issue -label:\"pinned\"".into(),
            ),
            Matcher::UrlEncoded("page".into(), "1".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await;

    let platform = GitHubPlatform::new(client(&server));
    let query = ItemQuery::new(ItemKind::Issue).without_labels(["pinned"]);
    let items = platform.list_open_items(&repo(), &query).await.unwrap();

    // the search index can lag behind label changes
    assert_eq!(items.iter().map(|i| i.number).collect::<Vec<_>>(), vec![1]);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_config_content_is_base64_decoded() {
    let mut server = Server::new_async().await;
    let yaml = "daysUntilStale: 30\nstaleLabel: stale\n";
    let encoded = base64::engine::general_purpose::STANDARD.encode(yaml);
    let mock = server
        .mock("GET", "/repos/octo/widgets/contents/.github/stale.yml")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(serde_json::json!({ "content": encoded, "encoding": "base64" }).to_string())
        .create_async()
        .await;

    let platform = GitHubPlatform::new(client(&server));
    let content = platform.get_config_content(&repo(), CONFIG_PATH).await.unwrap();

    assert_eq!(content.as_deref(), Some(yaml));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_missing_config_is_none() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/repos/octo/widgets/contents/.github/stale.yml")
        .with_status(404)
        .with_body(r#"{"message": "Not Found"}"#)
        .create_async()
        .await;

    let platform = GitHubPlatform::new(client(&server));
    assert!(platform.get_config_content(&repo(), CONFIG_PATH).await.unwrap().is_none());
}

#[tokio::test]
async fn test_removing_absent_label_is_not_an_error() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("DELETE", "/repos/octo/widgets/issues/3/labels/wontfix")
        .with_status(404)
        .with_body(r#"{"message": "Label does not exist"}"#)
        .expect(1)
        .create_async()
        .await;

    let platform = GitHubPlatform::new(client(&server));
    platform.remove_label(&repo(), 3, "wontfix").await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_mutations_send_expected_bodies() {
    let mut server = Server::new_async().await;
    let label = server
        .mock("POST", "/repos/octo/widgets/issues/4/labels")
        .match_body(Matcher::Json(serde_json::json!({ "labels": ["wontfix"] })))
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;
    let comment = server
        .mock("POST", "/repos/octo/widgets/issues/4/comments")
        .match_body(Matcher::Json(serde_json::json!({ "body": "Closing." })))
        .with_status(201)
        .with_body("{}")
        .create_async()
        .await;
    let close = server
        .mock("PATCH", "/repos/octo/widgets/issues/4")
        .match_body(Matcher::Json(serde_json::json!({ "state": "closed" })))
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let platform = GitHubPlatform::new(client(&server));
    platform.add_label(&repo(), 4, "wontfix").await.unwrap();
    platform.create_comment(&repo(), 4, "Closing.").await.unwrap();
    platform.close_item(&repo(), 4).await.unwrap();

    label.assert_async().await;
    comment.assert_async().await;
    close.assert_async().await;
}

#[tokio::test]
async fn test_rate_limited_request_is_retried() {
    let mut server = Server::new_async().await;
    let limited = server
        .mock("GET", "/repos/octo/widgets/issues/5")
        .with_status(429)
        .with_header("retry-after", "0")
        .with_body(r#"{"message": "API rate limit exceeded"}"#)
        .expect(1)
        .create_async()
        .await;
    let ok = server
        .mock("GET", "/repos/octo/widgets/issues/5")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(issue_json(5, &[], false).to_string())
        .expect(1)
        .create_async()
        .await;

    let item = client(&server).get_issue("octo", "widgets", 5).await.unwrap();

    assert_eq!(item.number, 5);
    limited.assert_async().await;
    ok.assert_async().await;
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/repos/octo/widgets/issues/6/comments")
        .with_status(422)
        .with_body(r#"{"message": "Validation Failed"}"#)
        .expect(1)
        .create_async()
        .await;

    let platform = GitHubPlatform::new(client(&server));
    let err = platform.create_comment(&repo(), 6, "hi").await.unwrap_err();

    assert!(matches!(err, DomainError::MutationFailure { number: 6, .. }));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_server_errors_exhaust_retries() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/repos/octo/widgets/issues/8")
        .with_status(502)
        .with_body("bad gateway")
        .expect(4)
        .create_async()
        .await;

    let err = client(&server).get_issue("octo", "widgets", 8).await.unwrap_err();

    assert!(matches!(err, GitHubError::Server { status: 502, .. }));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_label_applied_at_takes_latest_labeled_event() {
    let mut server = Server::new_async().await;
    let events = serde_json::json!([
        { "event": "labeled", "label": { "name": "wontfix" }, "created_at": "2024-01-01T00:00:00Z" },
        { "event": "unlabeled", "label": { "name": "wontfix" }, "created_at": "2024-01-05T00:00:00Z" },
        { "event": "labeled", "label": { "name": "bug" }, "created_at": "2024-02-01T00:00:00Z" },
        { "event": "labeled", "label": { "name": "wontfix" }, "created_at": "2024-03-01T00:00:00Z" },
        { "event": "closed", "created_at": "2024-03-02T00:00:00Z" },
    ]);
    server
        .mock("GET", "/repos/octo/widgets/issues/9/events")
        .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(events.to_string())
        .create_async()
        .await;

    let platform = GitHubPlatform::new(client(&server));
    let at = platform.label_applied_at(&repo(), 9, "wontfix").await.unwrap();

    assert_eq!(at, Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()));
}
