use prowl_core::{FileStatus, GitHubConfig, ProwlError, ReviewComment, ReviewConfig};
use prowl_review::event::read_event;
use prowl_review::github::{GitHubClient, PullRequestSource, ReviewSink};
use prowl_review::pipeline::Pipeline;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> GitHubClient {
    GitHubClient::new(&GitHubConfig {
        token: Some("test-token".into()),
        api_url: server.uri(),
    })
    .unwrap()
}

fn unprocessable() -> ResponseTemplate {
    ResponseTemplate::new(422).set_body_json(json!({
        "message": "Validation Failed",
        "documentation_url": "https://docs.github.com/rest"
    }))
}

#[tokio::test]
async fn fetch_pull_request_sends_token_and_defaults_null_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/a/b/pulls/42"))
        .and(header("Authorization", "token test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "number": 42,
            "title": "Add caching",
            "body": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let pr = client(&server).fetch_pull_request("a", "b", 42).await.unwrap();

    assert_eq!(pr.title, "Add caching");
    assert_eq!(pr.description, "");
    assert_eq!(pr.to_string(), "a/b#42");
}

#[tokio::test]
async fn fetch_pull_request_surfaces_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/a/b/pulls/7"))
        .respond_with(ResponseTemplate::new(404).set_body_string("{\"message\":\"Not Found\"}"))
        .mount(&server)
        .await;

    let err = client(&server)
        .fetch_pull_request("a", "b", 7)
        .await
        .unwrap_err();

    match err {
        ProwlError::Upstream(msg) => {
            assert!(msg.contains("404"));
            assert!(msg.contains("Not Found"));
        }
        other => panic!("expected upstream error, got {other:?}"),
    }
}

#[tokio::test]
async fn list_files_keeps_api_order_and_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/a/b/pulls/42/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"filename": "src/z.rs", "status": "modified", "patch": "@@ -1 +1 @@\n-a\n+b"},
            {"filename": "old.rs", "status": "removed", "patch": "@@ -1 +0,0 @@\n-gone"},
            {"filename": "logo.png", "status": "added"}
        ])))
        .mount(&server)
        .await;

    let files = client(&server).list_files("a", "b", 42).await.unwrap();

    let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["src/z.rs", "old.rs", "logo.png"]);
    assert_eq!(files[1].status, FileStatus::Removed);
    assert!(files[2].patch.is_none());
}

#[tokio::test]
async fn list_files_surfaces_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/a/b/pulls/42/files"))
        .respond_with(ResponseTemplate::new(500).set_body_string("diff service unavailable"))
        .mount(&server)
        .await;

    let err = client(&server).list_files("a", "b", 42).await.unwrap_err();

    match err {
        ProwlError::Upstream(msg) => {
            assert!(msg.contains("500"));
            assert!(msg.contains("diff service unavailable"));
        }
        other => panic!("expected upstream error, got {other:?}"),
    }
}

#[tokio::test]
async fn failed_diff_fetch_creates_no_review() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/a/b/pulls/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"title": "t", "body": "d"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/a/b/pulls/42/files"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/a/b/pulls/42/reviews"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
        .expect(0)
        .mount(&server)
        .await;

    let github = client(&server);
    let config = ReviewConfig::default();
    let result = Pipeline::new(&github, &github, &config)
        .run(&prowl_review::event::PullRequestEvent::new("a", "b", 42))
        .await;

    assert!(matches!(result, Err(ProwlError::Upstream(_))));
}

#[tokio::test]
async fn list_files_rejects_non_array_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/a/b/pulls/42/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"files": []})))
        .mount(&server)
        .await;

    let err = client(&server).list_files("a", "b", 42).await.unwrap_err();

    assert!(matches!(err, ProwlError::ResponseShape(_)));
}

#[tokio::test]
async fn create_review_posts_comment_event_and_returns_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/a/b/pulls/42/reviews"))
        .and(body_json(json!({
            "event": "COMMENT",
            "body": "Automated code review comments"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 9001})))
        .expect(1)
        .mount(&server)
        .await;

    let id = client(&server)
        .create_review("a", "b", 42, "Automated code review comments")
        .await
        .unwrap();

    assert_eq!(id, 9001);
}

#[tokio::test]
async fn create_review_without_id_is_shape_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/a/b/pulls/42/reviews"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"state": "COMMENTED"})))
        .mount(&server)
        .await;

    let err = client(&server)
        .create_review("a", "b", 42, "body")
        .await
        .unwrap_err();

    assert!(matches!(err, ProwlError::ResponseShape(_)));
}

#[tokio::test]
async fn review_comment_carries_path_body_and_line() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/a/b/pulls/42/reviews/5/comments"))
        .and(body_json(json!({
            "path": "src/lib.rs",
            "body": "Check bounds",
            "line": 1
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let comment = ReviewComment {
        path: "src/lib.rs".into(),
        body: "Check bounds".into(),
        line: 1,
    };
    client(&server)
        .create_review_comment("a", "b", 42, 5, &comment)
        .await
        .unwrap();
}

#[tokio::test]
async fn failed_review_creation_makes_no_comment_calls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/a/b/pulls/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"title": "t", "body": "d"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/a/b/pulls/42/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"filename": "a.rs", "status": "modified", "patch": "@@ -1 +1 @@\n-a\n+b"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/a/b/pulls/42/reviews"))
        .respond_with(unprocessable())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/a/b/pulls/42/reviews/1/comments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1})))
        .expect(0)
        .mount(&server)
        .await;

    let github = client(&server);
    let config = ReviewConfig::default();
    let result = Pipeline::new(&github, &github, &config)
        .run(&prowl_review::event::PullRequestEvent::new("a", "b", 42))
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn event_file_to_published_review() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/a/b/pulls/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "title": "Tidy up",
            "body": "Small cleanups"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/a/b/pulls/42/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"filename": "src/main.rs", "status": "modified", "patch": "@@ -1 +1 @@\n-old\n+new"},
            {"filename": "gone.rs", "status": "removed", "patch": "@@ -1 +0,0 @@\n-x"},
            {"filename": "README.md", "status": "added", "patch": "@@ -0,0 +1 @@\n+hello"}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/a/b/pulls/42/reviews"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 11})))
        .expect(1)
        .mount(&server)
        .await;
    // One comment per non-removed file; the second is rejected but still attempted.
    Mock::given(method("POST"))
        .and(path("/repos/a/b/pulls/42/reviews/11/comments"))
        .and(body_json(json!({
            "path": "src/main.rs",
            "body": "@@ -1 +1 @@\n-old\n+new",
            "line": 1
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 100})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/a/b/pulls/42/reviews/11/comments"))
        .and(body_json(json!({
            "path": "README.md",
            "body": "@@ -0,0 +1 @@\n+hello",
            "line": 1
        })))
        .respond_with(unprocessable())
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let event_path = dir.path().join("event.json");
    std::fs::write(
        &event_path,
        r#"{"repository":{"full_name":"a/b","owner":{"login":"a"},"name":"b"},"number":42}"#,
    )
    .unwrap();

    let event = read_event(Some(event_path.as_path())).unwrap();
    let github = client(&server);
    let config = ReviewConfig::default();
    let report = Pipeline::new(&github, &github, &config)
        .run(&event)
        .await
        .unwrap();

    assert_eq!(report.files_changed, 3);
    assert_eq!(report.comments.len(), 2);
    let publish = report.publish.unwrap();
    assert_eq!(publish.review_id, 11);
    assert_eq!(publish.posted, 1);
    assert_eq!(publish.failed.len(), 1);
    assert_eq!(publish.failed[0].path, "README.md");
}
