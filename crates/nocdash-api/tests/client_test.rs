// Integration tests for `ApiClient` using wiremock.

use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nocdash_api::types::{AlarmFilters, InstanceStatus, Severity};
use nocdash_api::{ApiClient, Error, StreamEvent};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let client = ApiClient::from_reqwest(&server.uri(), reqwest::Client::new()).unwrap();
    (server, client)
}

fn alarm_json(id: &str, instance_id: &str, severity: &str, code: u8) -> serde_json::Value {
    json!({
        "id": id,
        "instance_id": instance_id,
        "instance_name": format!("Zabbix {instance_id}"),
        "host": "web-01",
        "description": "High CPU utilization",
        "severity": severity,
        "severity_code": code,
        "duration": "1h 4m",
        "acknowledged": false,
        "event_id": "42",
        "is_synthetic": false
    })
}

// ── Happy-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_get_instances() {
    let (server, client) = setup().await;

    let body = json!([
        {
            "id": "zbx-eu",
            "name": "Zabbix EU",
            "status": "connected",
            "version": "6.4.10",
            "problem_counts": { "disaster": 1, "high": 3 }
        },
        {
            "id": "zbx-us",
            "name": "Zabbix US",
            "status": "error",
            "error": "connection refused"
        }
    ]);

    Mock::given(method("GET"))
        .and(path("/api/instances"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let instances = client.get_instances().await.unwrap();

    assert_eq!(instances.len(), 2);
    assert_eq!(instances[0].id, "zbx-eu");
    assert_eq!(instances[0].status, InstanceStatus::Connected);
    assert_eq!(instances[0].problem_counts.unwrap().total(), 4);
    assert_eq!(instances[1].status, InstanceStatus::Error);
    assert_eq!(instances[1].error.as_deref(), Some("connection refused"));
}

#[tokio::test]
async fn test_get_alarms_unfiltered_sends_no_params() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/alarms"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([alarm_json("7001", "zbx-eu", "high", 4)])),
        )
        .mount(&server)
        .await;

    let alarms = client.get_alarms(&AlarmFilters::default()).await.unwrap();

    assert_eq!(alarms.len(), 1);
    assert_eq!(alarms[0].severity, Severity::High);

    // The one recorded request must carry no query string at all.
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url.query(), None);
}

#[tokio::test]
async fn test_get_alarms_repeats_severity_param() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/alarms"))
        .and(query_param("instance_id", "zbx-eu"))
        .and(query_param("acknowledged", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let filters = AlarmFilters {
        instance_id: Some("zbx-eu".into()),
        severities: vec![Severity::Disaster, Severity::High],
        acknowledged: Some(false),
        host: None,
    };
    client.get_alarms(&filters).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let query = requests[0].url.query().unwrap();
    assert!(query.contains("severity=disaster"));
    assert!(query.contains("severity=high"));
    assert!(!query.contains("host="));
}

#[tokio::test]
async fn test_acknowledge_alarm_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/alarms/7001/acknowledge"))
        .and(body_json(json!({
            "instance_id": "zbx-eu",
            "message": "Acknowledged from NOC dashboard"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .mount(&server)
        .await;

    client
        .acknowledge_alarm("7001", "zbx-eu", "Acknowledged from NOC dashboard")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_create_investigation() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/chat/investigation/create"))
        .and(body_json(json!({
            "alarm_id": "7001",
            "instance_id": "zbx-eu"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "investigation_id": "inv-abc123",
            "alarm": alarm_json("7001", "zbx-eu", "high", 4)
        })))
        .mount(&server)
        .await;

    let created = client.create_investigation("7001", "zbx-eu").await.unwrap();
    assert_eq!(created.investigation_id, "inv-abc123");
    assert_eq!(created.alarm["host"], "web-01");
}

#[tokio::test]
async fn test_stream_investigation_events() {
    let (server, client) = setup().await;

    let sse_body = concat!(
        "data: {\"type\":\"content\",\"text\":\"Checking host web-01...\"}\n\n",
        "data: {\"type\":\"content\",\"text\":\" CPU pinned by backup job.\"}\n\n",
        "data: {\"type\":\"done\"}\n\n",
    );

    Mock::given(method("GET"))
        .and(path("/api/chat/investigation/inv-abc123/stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_raw(sse_body, "text/event-stream"),
        )
        .mount(&server)
        .await;

    let mut stream = client.stream_investigation("inv-abc123").await.unwrap();

    let mut transcript = String::new();
    let mut saw_done = false;
    while let Some(event) = stream.next_event().await {
        match event.unwrap() {
            StreamEvent::Content { text } => transcript.push_str(&text),
            StreamEvent::Done => saw_done = true,
            StreamEvent::Error { message } => panic!("unexpected error frame: {message}"),
        }
    }

    assert!(saw_done);
    assert_eq!(transcript, "Checking host web-01... CPU pinned by backup job.");
}

#[tokio::test]
async fn test_get_health() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "healthy",
            "services": { "zbx-eu": "connected", "zbx-us": "connected" }
        })))
        .mount(&server)
        .await;

    let health = client.get_health().await.unwrap();
    assert_eq!(health.services.len(), 2);
}

// ── Error tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_acknowledge_synthetic_alarm_surfaces_detail() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/alarms/synthetic-1/acknowledge"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "detail": "Cannot acknowledge synthetic alarms"
        })))
        .mount(&server)
        .await;

    let result = client
        .acknowledge_alarm("synthetic-1", "zbx-eu", "ack")
        .await;

    match result {
        Err(err @ Error::Backend { .. }) => {
            assert_eq!(err.status(), Some(400));
            // Display must be the backend text verbatim, nothing wrapped
            // around it.
            assert_eq!(err.to_string(), "Cannot acknowledge synthetic alarms");
        }
        other => panic!("expected Backend error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_error_500_without_detail_falls_back_to_status() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = client.get_instances().await;

    match result {
        Err(Error::Backend { status, ref detail }) => {
            assert_eq!(status, 500);
            assert!(detail.contains("500"), "detail was: {detail}");
        }
        other => panic!("expected Backend error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_alarm_payload() {
    let (server, client) = setup().await;

    // Not a list — the old UI silently coerced this to []; the client
    // reports it so callers can decide.
    Mock::given(method("GET"))
        .and(path("/api/alarms"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "alarms": [] })))
        .mount(&server)
        .await;

    let result = client.get_alarms(&AlarmFilters::default()).await;

    match result {
        Err(Error::MalformedResponse { ref body, .. }) => {
            assert!(body.contains("alarms"));
        }
        other => panic!("expected MalformedResponse, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_multibyte_payload_reports_instead_of_panicking() {
    let (server, client) = setup().await;

    // 300 bytes of three-byte characters: the error-path body preview
    // must not slice mid-character.
    Mock::given(method("GET"))
        .and(path("/api/alarms"))
        .respond_with(ResponseTemplate::new(200).set_body_string("€".repeat(100)))
        .mount(&server)
        .await;

    let result = client.get_alarms(&AlarmFilters::default()).await;

    match result {
        Err(Error::MalformedResponse { ref message, .. }) => {
            assert!(message.contains("body preview"));
        }
        other => panic!("expected MalformedResponse, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_stream_investigation_unknown_id() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/chat/investigation/nope/stream"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "detail": "Unknown investigation" })),
        )
        .mount(&server)
        .await;

    let result = client.stream_investigation("nope").await;

    match result {
        Err(Error::Backend { status, ref detail }) => {
            assert_eq!(status, 404);
            assert_eq!(detail, "Unknown investigation");
        }
        other => panic!("expected Backend error, got: {other:?}"),
    }
}
