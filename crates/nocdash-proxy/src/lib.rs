//! Reverse proxy in front of the alarm backend.
//!
//! Serves the built web UI as static files and relays everything under
//! `/api/` (plus `/health`) to the backend. The investigation chat
//! endpoint streams Server-Sent Events; those responses are relayed
//! byte-for-byte as chunks arrive, never buffered, so the browser sees
//! tokens the moment the backend emits them.
//!
//! There is no auth, retry, or rate limiting here — the proxy is a
//! deployment convenience, not a gateway. A failed relay answers that
//! one request with an error and nothing else.

use std::convert::Infallible;
use std::path::Path as FsPath;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::{Path, Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use bytes::Bytes;
use futures_util::StreamExt;
use serde_json::json;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

/// Largest request body the proxy will forward.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Hop-by-hop headers, never forwarded in either direction.
/// `content-length` is recomputed by hyper, `host` by reqwest.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "content-length",
    "host",
];

/// Shared state for all relay handlers.
#[derive(Clone)]
pub struct ProxyState {
    http: reqwest::Client,
    backend_url: String,
}

impl ProxyState {
    pub fn new(backend_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            backend_url: backend_url.trim_end_matches('/').to_owned(),
        }
    }
}

/// Build the proxy router. With a `static_dir`, unmatched routes serve
/// the web UI with a single-page-app fallback to `index.html`.
pub fn app(state: ProxyState, static_dir: Option<&FsPath>) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .route(
            "/api/chat/investigation/{id}/stream",
            get(investigation_stream),
        )
        .route("/api/{*rest}", any(api_forward))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    match static_dir {
        Some(dir) => {
            let spa = ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")));
            router.fallback_service(spa)
        }
        None => router,
    }
}

// ── Handlers ─────────────────────────────────────────────────────────

/// Relay the backend health report.
async fn health(State(state): State<ProxyState>) -> Response {
    let url = format!("{}/health", state.backend_url);
    match state.http.get(&url).send().await {
        Ok(resp) => buffered_response(resp).await,
        Err(e) => backend_down(&e),
    }
}

/// Forward any `/api/...` request: method, query string, and raw body
/// bytes go through untouched. A backend response that is itself an
/// event stream switches to the chunk-by-chunk relay.
async fn api_forward(
    State(state): State<ProxyState>,
    Path(rest): Path<String>,
    req: Request,
) -> Response {
    let query = req
        .uri()
        .query()
        .map(|q| format!("?{q}"))
        .unwrap_or_default();
    let url = format!("{}/api/{rest}{query}", state.backend_url);
    let method = req.method().clone();
    let headers = forwardable_headers(req.headers());

    let body = match to_bytes(req.into_body(), MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return (StatusCode::PAYLOAD_TOO_LARGE, e.to_string()).into_response();
        }
    };

    debug!(%method, %url, "relaying request");
    let outcome = state
        .http
        .request(method, &url)
        .headers(headers)
        .body(body)
        .send()
        .await;

    match outcome {
        Ok(resp) if is_event_stream(resp.headers()) => stream_response(resp),
        Ok(resp) => buffered_response(resp).await,
        Err(e) => backend_down(&e),
    }
}

/// Relay an investigation SSE stream without buffering.
///
/// A relay failure — the backend refusing the connection or dying
/// mid-stream — is reported in-band: one final
/// `data: {"type":"error",...}` frame, then the stream closes. The
/// browser's EventSource sees a terminal event instead of a silent
/// hang.
async fn investigation_stream(State(state): State<ProxyState>, Path(id): Path<String>) -> Response {
    let url = format!("{}/api/chat/investigation/{id}/stream", state.backend_url);

    let relay = async_stream::stream! {
        match state.http.get(&url).send().await {
            Ok(resp) => {
                let mut chunks = resp.bytes_stream();
                while let Some(chunk) = chunks.next().await {
                    match chunk {
                        Ok(bytes) => yield Ok::<Bytes, Infallible>(bytes),
                        Err(e) => {
                            warn!(%id, error = %e, "investigation relay interrupted");
                            yield Ok(error_frame(&e.to_string()));
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                warn!(%id, error = %e, "investigation stream failed to open");
                yield Ok(error_frame(&e.to_string()));
            }
        }
    };

    let mut out = Response::new(Body::from_stream(relay));
    insert_sse_headers(out.headers_mut());
    out
}

// ── Response building ────────────────────────────────────────────────

/// Read the whole backend response and re-emit body + status.
async fn buffered_response(resp: reqwest::Response) -> Response {
    let status = resp.status();
    let headers = forwardable_headers(resp.headers());
    match resp.bytes().await {
        Ok(body) => {
            let mut out = Response::new(Body::from(body));
            *out.status_mut() = status;
            *out.headers_mut() = headers;
            out
        }
        Err(e) => backend_down(&e),
    }
}

/// Relay the backend response as a byte stream with SSE headers.
fn stream_response(resp: reqwest::Response) -> Response {
    let status = resp.status();
    let mut headers = forwardable_headers(resp.headers());
    insert_sse_headers(&mut headers);

    let mut out = Response::new(Body::from_stream(resp.bytes_stream()));
    *out.status_mut() = status;
    *out.headers_mut() = headers;
    out
}

fn backend_down(err: &reqwest::Error) -> Response {
    warn!(error = %err, "backend unreachable");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        json!({ "error": format!("backend unreachable: {err}") }).to_string(),
    )
        .into_response()
}

// ── Helpers ──────────────────────────────────────────────────────────

fn forwardable_headers(headers: &HeaderMap) -> HeaderMap {
    headers
        .iter()
        .filter(|(name, _)| !HOP_BY_HOP.contains(&name.as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

fn is_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/event-stream"))
}

/// Headers that keep intermediaries (nginx in particular) from
/// buffering the stream.
fn insert_sse_headers(headers: &mut HeaderMap) {
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-transform"),
    );
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(
        HeaderName::from_static("x-accel-buffering"),
        HeaderValue::from_static("no"),
    );
}

fn error_frame(message: &str) -> Bytes {
    let payload = json!({ "type": "error", "message": message });
    Bytes::from(format!("data: {payload}\n\n"))
}
