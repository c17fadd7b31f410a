// Relay behavior tests: a real listener in front of a wiremock backend.

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nocdash_proxy::{ProxyState, app};

/// Spawn the proxy on an ephemeral port, pointed at `backend_url`.
async fn spawn_proxy(backend_url: &str, static_dir: Option<&std::path::Path>) -> String {
    let router = app(ProxyState::new(backend_url), static_dir);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    format!("http://{addr}")
}

// Nothing listens on port 9; connections are refused immediately.
const DEAD_BACKEND: &str = "http://127.0.0.1:9";

// ── /health ─────────────────────────────────────────────────────────

#[tokio::test]
async fn health_relays_backend_json() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "healthy",
            "services": { "eu": "connected" }
        })))
        .mount(&backend)
        .await;

    let proxy = spawn_proxy(&backend.uri(), None).await;
    let resp = reqwest::get(format!("{proxy}/health")).await.expect("get");

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.expect("json");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn health_backend_down_is_500_with_error_body() {
    let proxy = spawn_proxy(DEAD_BACKEND, None).await;
    let resp = reqwest::get(format!("{proxy}/health")).await.expect("get");

    assert_eq!(resp.status(), 500);
    let body: serde_json::Value = resp.json().await.expect("json");
    assert!(!body["error"].as_str().expect("error string").is_empty());
}

// ── /api forwarding ─────────────────────────────────────────────────

#[tokio::test]
async fn api_forward_preserves_status_and_body() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/alarms"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "detail": "maintenance window"
        })))
        .mount(&backend)
        .await;

    let proxy = spawn_proxy(&backend.uri(), None).await;
    let resp = reqwest::get(format!("{proxy}/api/alarms")).await.expect("get");

    assert_eq!(resp.status(), 503);
    let body: serde_json::Value = resp.json().await.expect("json");
    assert_eq!(body["detail"], "maintenance window");
}

#[tokio::test]
async fn api_forward_passes_query_method_and_body() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/alarms"))
        .and(query_param("severity", "disaster"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&backend)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/alarms/1/acknowledge"))
        .and(body_json(json!({
            "instance_id": "eu",
            "message": "ack from test"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .expect(1)
        .mount(&backend)
        .await;

    let proxy = spawn_proxy(&backend.uri(), None).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{proxy}/api/alarms?severity=disaster"))
        .send()
        .await
        .expect("get");
    assert_eq!(resp.status(), 200);

    let resp = client
        .post(format!("{proxy}/api/alarms/1/acknowledge"))
        .json(&json!({ "instance_id": "eu", "message": "ack from test" }))
        .send()
        .await
        .expect("post");
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn api_forward_backend_down_is_500_not_a_crash() {
    let proxy = spawn_proxy(DEAD_BACKEND, None).await;
    let client = reqwest::Client::new();

    // Two failed requests in a row: the listener must survive the first.
    for _ in 0..2 {
        let resp = client
            .get(format!("{proxy}/api/alarms"))
            .send()
            .await
            .expect("proxy still up");
        assert_eq!(resp.status(), 500);
    }
}

// ── SSE relay ───────────────────────────────────────────────────────

#[tokio::test]
async fn investigation_stream_relays_frames_in_order() {
    let backend = MockServer::start().await;
    let sse = concat!(
        "data: {\"type\":\"content\",\"text\":\"first\"}\n\n",
        "data: {\"type\":\"content\",\"text\":\"second\"}\n\n",
        "data: {\"type\":\"done\"}\n\n",
    );
    Mock::given(method("GET"))
        .and(path("/api/chat/investigation/inv-1/stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_raw(sse, "text/event-stream"),
        )
        .mount(&backend)
        .await;

    let proxy = spawn_proxy(&backend.uri(), None).await;
    let resp = reqwest::get(format!("{proxy}/api/chat/investigation/inv-1/stream"))
        .await
        .expect("get");

    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("text/event-stream")
    );
    assert_eq!(
        resp.headers()
            .get("cache-control")
            .and_then(|v| v.to_str().ok()),
        Some("no-cache, no-transform")
    );

    // Body arrives intact and in order, then the connection closes.
    let body = resp.text().await.expect("body");
    assert_eq!(body, sse);
}

#[tokio::test]
async fn investigation_stream_backend_down_emits_error_frame() {
    let proxy = spawn_proxy(DEAD_BACKEND, None).await;
    let resp = reqwest::get(format!("{proxy}/api/chat/investigation/inv-1/stream"))
        .await
        .expect("get");

    assert_eq!(resp.status(), 200);
    let body = resp.text().await.expect("body");
    assert!(body.starts_with("data: "), "not an SSE frame: {body}");
    assert!(body.ends_with("\n\n"));

    let payload: serde_json::Value =
        serde_json::from_str(body.trim_start_matches("data: ").trim()).expect("frame json");
    assert_eq!(payload["type"], "error");
    assert!(!payload["message"].as_str().expect("message").is_empty());
}

#[tokio::test]
async fn generic_api_route_switches_to_stream_relay_on_sse_content_type() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events/feed"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_raw("data: {\"type\":\"done\"}\n\n", "text/event-stream"),
        )
        .mount(&backend)
        .await;

    let proxy = spawn_proxy(&backend.uri(), None).await;
    let resp = reqwest::get(format!("{proxy}/api/events/feed"))
        .await
        .expect("get");

    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()
            .get("x-accel-buffering")
            .and_then(|v| v.to_str().ok()),
        Some("no")
    );
    assert_eq!(resp.text().await.expect("body"), "data: {\"type\":\"done\"}\n\n");
}

// ── Static files ────────────────────────────────────────────────────

#[tokio::test]
async fn static_dir_serves_files_with_spa_fallback() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("index.html"), "<html>noc</html>").expect("index");
    std::fs::write(dir.path().join("app.js"), "console.log('noc')").expect("asset");

    let proxy = spawn_proxy(DEAD_BACKEND, Some(dir.path())).await;

    let resp = reqwest::get(format!("{proxy}/app.js")).await.expect("asset");
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.expect("body"), "console.log('noc')");

    // Client-side routes fall back to the app shell.
    let resp = reqwest::get(format!("{proxy}/alarms/deep/link"))
        .await
        .expect("fallback");
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.expect("body"), "<html>noc</html>");
}
