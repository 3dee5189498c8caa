mod common;

use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sse_body(chunks: &[&str]) -> String {
    let mut body = String::new();
    for chunk in chunks {
        body.push_str(&format!(
            "data: {}\n\n",
            json!({"choices": [{"delta": {"content": chunk}}]})
        ));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

fn start_body() -> Value {
    json!({
        "chatId": "chat-1",
        "messageId": "msg-1",
        "modelId": "test/model",
        "messages": [{"role": "user", "content": "Say hello"}]
    })
}

async fn start_stream(app: &common::TestApp, client: &reqwest::Client, user: &str) -> String {
    let response = client
        .post(app.url("/api/streams"))
        .header("x-user-id", user)
        .json(&start_body())
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(response.status().as_u16(), 201);

    let body: Value = response.json().await.unwrap();
    body["item"]["streamId"].as_str().unwrap().to_string()
}

async fn wait_for_status(app: &common::TestApp, client: &reqwest::Client, stream_id: &str, user: &str) -> Value {
    for _ in 0..50 {
        let body: Value = client
            .get(app.url(&format!("/api/streams/{}/status", stream_id)))
            .header("x-user-id", user)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if body["item"]["status"] != "streaming" {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("stream {} never finished", stream_id);
}

#[tokio::test]
async fn completed_stream_can_be_resumed_by_its_owner_only() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_body(&["Hello", ", ", "world"]), "text/event-stream"),
        )
        .mount(&upstream)
        .await;

    let app = match common::spawn_app_with_upstream(&upstream.uri()).await {
        Some(app) => app,
        None => return,
    };
    let client = reqwest::Client::new();

    let stream_id = start_stream(&app, &client, "u1").await;
    let status = wait_for_status(&app, &client, &stream_id, "u1").await;
    assert_eq!(status["item"]["status"], "completed");
    assert_eq!(status["item"]["content"], "Hello, world");

    let resumed = client
        .get(app.url(&format!("/api/streams/{}/resume", stream_id)))
        .header("x-user-id", "u1")
        .send()
        .await
        .unwrap();
    assert_eq!(resumed.status().as_u16(), 200);
    assert_eq!(resumed.text().await.unwrap(), "Hello, world");

    let other = client
        .get(app.url(&format!("/api/streams/{}/resume", stream_id)))
        .header("x-user-id", "u2")
        .send()
        .await
        .unwrap();
    assert_eq!(other.status().as_u16(), 403);

    let active: Value = client
        .get(app.url("/api/streams"))
        .header("x-user-id", "u1")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(active["list"], json!([]));
}

#[tokio::test]
async fn upstream_failure_is_recorded_on_the_stream() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal failure"))
        .mount(&upstream)
        .await;

    let app = match common::spawn_app_with_upstream(&upstream.uri()).await {
        Some(app) => app,
        None => return,
    };
    let client = reqwest::Client::new();

    let stream_id = start_stream(&app, &client, "u1").await;
    let status = wait_for_status(&app, &client, &stream_id, "u1").await;

    assert_eq!(status["item"]["status"], "error");
    let content = status["item"]["content"].as_str().unwrap();
    assert!(content.starts_with("\n\n[Error: "));
    assert!(content.contains("500"));
}

#[tokio::test]
async fn cancelled_stream_cannot_be_resumed() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(sse_body(&["slow"]), "text/event-stream")
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&upstream)
        .await;

    let app = match common::spawn_app_with_upstream(&upstream.uri()).await {
        Some(app) => app,
        None => return,
    };
    let client = reqwest::Client::new();

    let stream_id = start_stream(&app, &client, "u1").await;

    let cancel = client
        .post(app.url(&format!("/api/streams/{}/cancel", stream_id)))
        .header("x-user-id", "u1")
        .send()
        .await
        .unwrap();
    assert_eq!(cancel.status().as_u16(), 200);

    let resumed = client
        .get(app.url(&format!("/api/streams/{}/resume", stream_id)))
        .header("x-user-id", "u1")
        .send()
        .await
        .unwrap();
    assert_eq!(resumed.status().as_u16(), 410);

    // the late upstream response must not revive the record
    tokio::time::sleep(Duration::from_millis(700)).await;
    let state = app.runtime.manager.get_stream_state(&stream_id).await.unwrap().unwrap();
    assert_eq!(state.status.to_string(), "cancelled");
    assert!(state.content.is_empty());
}

#[tokio::test]
async fn unknown_stream_is_not_found() {
    let upstream = MockServer::start().await;
    let app = match common::spawn_app_with_upstream(&upstream.uri()).await {
        Some(app) => app,
        None => return,
    };
    let client = reqwest::Client::new();

    for uri in ["/api/streams/nope/resume", "/api/streams/nope/status"] {
        let response = client
            .get(app.url(uri))
            .header("x-user-id", "u1")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 404);
    }
}
