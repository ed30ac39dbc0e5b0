// Integration tests
//
// End-to-end through the real router and the real reqwest client:
// request -> validate -> transcript -> upstream -> relay -> NDJSON response
//
// Uses wiremock as the upstream mock, tower::ServiceExt::oneshot for
// in-process HTTP, and config loaded from YAML like the binary does.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bytes::Bytes;
use delta_relay::config::{self, StringSource};
use delta_relay::message::InputLimit;
use delta_relay::proxy::{self, AppState};
use delta_relay::stream::OutputRecord;
use delta_relay::transcript::NoopTranscriptLog;
use delta_relay::upstream::{ReqwestCompletionsClient, UpstreamSettings};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ---------------------------------------------------------------------------
// Infrastructure
// ---------------------------------------------------------------------------

const UPSTREAM_PATH: &str = "/v1/chat/completions";

fn test_yaml(mock_url: &str) -> String {
    format!(
        r#"delta_relay: v1

upstream:
  url: {mock_url}{UPSTREAM_PATH}
  secret: test-secret
  max_response_tokens: 64
  timeout_ms: 300

limits:
  max_input_length: 100

server:
  base_path: /api
"#
    )
}

/// Build the router exactly as main does, with upstream pointed at wiremock.
fn build_app(yaml: &str) -> axum::Router {
    let source = StringSource {
        content: yaml.to_string(),
    };
    let config = config::load_config(&source).expect("test config should parse");

    let settings = UpstreamSettings {
        url: config.upstream.url.clone(),
        secret: config.upstream.secret.clone(),
        max_response_tokens: config.upstream.max_response_tokens,
        timeout_ms: config.upstream.timeout_ms,
    };

    let state = AppState {
        upstream: Arc::new(ReqwestCompletionsClient::new(reqwest::Client::new(), settings)),
        transcripts: Arc::new(NoopTranscriptLog),
        limits: InputLimit {
            max_input_length: config.limits.max_input_length,
        },
        stream_timeout: config.upstream.stream_timeout_ms.map(Duration::from_millis),
    };

    proxy::build_router(state, &config.server.base_path)
}

fn json_request(path_str: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path_str)
        .header("content-type", "application/json")
        .body(Body::from(body.to_owned()))
        .unwrap()
}

async fn body_bytes(resp: axum::response::Response) -> Bytes {
    axum::body::to_bytes(resp.into_body(), 10 * 1024 * 1024)
        .await
        .unwrap()
}

fn sse_frame(content: &str) -> String {
    let chunk = serde_json::json!({ "choices": [{ "delta": { "content": content } }] });
    format!("data: {chunk}\n\n")
}

const HELLO: &str = r#"[{"role":"user","content":"hello"}]"#;

// ---------------------------------------------------------------------------
// Streaming route
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stream_relays_upstream_content_as_ndjson() {
    let mock_server = MockServer::start().await;

    let sse = format!(
        "{}{}data: [DONE]\n\n",
        sse_frame("Hello"),
        sse_frame(", \"world\"")
    );

    Mock::given(method("POST"))
        .and(path(UPSTREAM_PATH))
        .and(header("authorization", "Bearer test-secret"))
        .and(body_partial_json(serde_json::json!({
            "stream": true,
            "max_completion_tokens": 64,
            "messages": [{ "role": "user", "content": "hello" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(sse))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = build_app(&test_yaml(&mock_server.uri()));
    let resp = app
        .oneshot(json_request("/api/completions-stream", HELLO))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "application/x-ndjson"
    );

    let bytes = body_bytes(resp).await;
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.ends_with('\n'), "every record is newline-terminated");

    // Chunk boundaries on the wire are up to the transport; the concatenated
    // deltas are not.
    let content: String = text
        .lines()
        .map(|l| serde_json::from_str::<OutputRecord>(l).unwrap().delta)
        .collect();
    assert_eq!(content, "Hello, \"world\"");
}

#[tokio::test]
async fn stream_with_empty_upstream_body_is_empty() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(UPSTREAM_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let app = build_app(&test_yaml(&mock_server.uri()));
    let resp = app
        .oneshot(json_request("/api/completions-stream", HELLO))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_bytes(resp).await.is_empty());
}

#[tokio::test]
async fn stream_skips_malformed_frames() {
    let mock_server = MockServer::start().await;

    let sse = format!(
        "{}data: {{broken\n\n: keep-alive\n\n{}",
        sse_frame("a"),
        sse_frame("b")
    );

    Mock::given(method("POST"))
        .and(path(UPSTREAM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(sse))
        .mount(&mock_server)
        .await;

    let app = build_app(&test_yaml(&mock_server.uri()));
    let resp = app
        .oneshot(json_request("/api/completions-stream", HELLO))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let text = String::from_utf8(body_bytes(resp).await.to_vec()).unwrap();
    let content: String = text
        .lines()
        .map(|l| serde_json::from_str::<OutputRecord>(l).unwrap().delta)
        .collect();
    assert_eq!(content, "ab");
}

#[tokio::test]
async fn upstream_error_status_returns_500() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(UPSTREAM_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let app = build_app(&test_yaml(&mock_server.uri()));
    let resp = app
        .oneshot(json_request("/api/completions-stream", HELLO))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert!(json["msg"].as_str().unwrap().contains("unknown server error"));
}

// ---------------------------------------------------------------------------
// Non-streaming route
// ---------------------------------------------------------------------------

#[tokio::test]
async fn completion_returns_first_choice_content() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(UPSTREAM_PATH))
        .and(body_partial_json(serde_json::json!({ "stream": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "Hi there." } }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = build_app(&test_yaml(&mock_server.uri()));
    let resp = app
        .oneshot(json_request("/api/completions", HELLO))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(json, serde_json::json!({ "msg": "Hi there." }));
}

#[tokio::test]
async fn completion_timeout_returns_500() {
    let mock_server = MockServer::start().await;

    // Longer than timeout_ms (300ms in config)
    Mock::given(method("POST"))
        .and(path(UPSTREAM_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "choices": [] }))
                .set_delay(Duration::from_millis(1500)),
        )
        .mount(&mock_server)
        .await;

    let app = build_app(&test_yaml(&mock_server.uri()));
    let resp = app
        .oneshot(json_request("/api/completions", HELLO))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn completion_without_content_returns_500() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(UPSTREAM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })))
        .mount(&mock_server)
        .await;

    let app = build_app(&test_yaml(&mock_server.uri()));
    let resp = app
        .oneshot(json_request("/api/completions", HELLO))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

// ---------------------------------------------------------------------------
// Admission
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rejected_requests_never_reach_upstream() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let app = build_app(&test_yaml(&mock_server.uri()));

    let resp = app
        .clone()
        .oneshot(json_request("/api/completions-stream", r#"{"messages":[]}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // 30 chars: under the 100 limit, over the short-context quarter (25).
    let body = format!(r#"[{{"role":"user","content":"{}"}}]"#, "x".repeat(30));
    let resp = app
        .oneshot(json_request("/api/completions-stream?shortContext=true", &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(
        json["msg"],
        "The request body is too long for the given context window."
    );
}

#[tokio::test]
async fn secret_resolved_from_environment() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header("authorization", "Bearer from-env"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": { "content": "ok" } }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    std::env::set_var("DELTA_RELAY_IT_SECRET", "from-env");
    let yaml = test_yaml(&mock_server.uri())
        .replace("secret: test-secret", "secret: ${DELTA_RELAY_IT_SECRET}");

    let resp = build_app(&yaml)
        .oneshot(json_request("/api/completions", HELLO))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
}
