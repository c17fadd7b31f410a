// Hand-crafted async HTTP client for the NOC dashboard backend.
//
// Base path: /  (health at /health, everything else under /api/)
// Auth: none — the backend sits on a trusted network behind the proxy.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::Error;
use crate::stream::InvestigationStream;
use crate::types;

// ── Error response shape from the backend ────────────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    detail: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the alarm aggregation backend.
///
/// Plain JSON REST plus one server-sent-event endpoint for
/// investigation streaming. Cheap to clone; clones share the
/// underlying connection pool.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    /// Client without a total-request timeout, for long-lived SSE
    /// responses that must not be cut off mid-stream.
    stream_http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build a client against `base_url` with default timeouts.
    ///
    /// The request timeout applies to the REST operations only;
    /// [`Self::stream_investigation`] opens a long-lived response and
    /// must not be cut off mid-stream, so it uses a separate
    /// connect-timeout-only path.
    pub fn new(base_url: &str) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        let stream_http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self {
            http,
            stream_http,
            base_url,
        })
    }

    /// Wrap an existing `reqwest::Client` (caller controls timeouts).
    /// The same client is used for streaming responses.
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self {
            stream_http: http.clone(),
            http,
            base_url,
        })
    }

    /// Normalize the base URL to always end in a single `/`.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    /// The normalized base URL this client talks to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Join a relative path (e.g. `"api/alarms"`) onto the base URL.
    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        Self::handle_response(resp).await
    }

    async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url} params={params:?}");

        let resp = self.http.get(url).query(params).send().await?;
        Self::handle_response(resp).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self.http.post(url).json(body).send().await?;
        Self::handle_response(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(|e| {
                let preview = body_preview(&body);
                Error::MalformedResponse {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(Self::parse_error(status, resp).await)
        }
    }

    /// Extract the backend's `{"detail": …}` message, falling back to
    /// the raw body or status line when the shape doesn't match.
    async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        let raw = resp.text().await.unwrap_or_default();

        let detail = match serde_json::from_str::<ErrorResponse>(&raw) {
            Ok(ErrorResponse { detail: Some(d) }) => d,
            _ if raw.is_empty() => status.to_string(),
            _ => raw,
        };

        Error::Backend {
            status: status.as_u16(),
            detail,
        }
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    // ── Health ───────────────────────────────────────────────────────

    pub async fn get_health(&self) -> Result<types::HealthStatus, Error> {
        self.get("health").await
    }

    // ── Instances ────────────────────────────────────────────────────

    pub async fn get_instances(&self) -> Result<Vec<types::Instance>, Error> {
        self.get("api/instances").await
    }

    pub async fn get_instance_status(&self, instance_id: &str) -> Result<types::Instance, Error> {
        self.get(&format!("api/instances/{instance_id}/status"))
            .await
    }

    // ── Alarms ───────────────────────────────────────────────────────

    /// Fetch active alarms. Unset filter fields are omitted from the
    /// query; the `severity` parameter is repeated once per selection.
    pub async fn get_alarms(
        &self,
        filters: &types::AlarmFilters,
    ) -> Result<Vec<types::Alarm>, Error> {
        self.get_with_params("api/alarms", &filters.query_params())
            .await
    }

    pub async fn get_alarm_stats(&self) -> Result<types::AlarmStats, Error> {
        self.get("api/alarms/stats").await
    }

    /// Acknowledge one alarm on its owning instance.
    ///
    /// The backend rejects synthetic alarms with a 400, surfaced here as
    /// [`Error::Backend`] carrying the backend's explanation verbatim.
    pub async fn acknowledge_alarm(
        &self,
        alarm_id: &str,
        instance_id: &str,
        message: &str,
    ) -> Result<(), Error> {
        #[derive(Serialize)]
        struct Body<'a> {
            instance_id: &'a str,
            message: &'a str,
        }

        // Backend replies with an ack receipt we don't need.
        let _: serde_json::Value = self
            .post(
                &format!("api/alarms/{alarm_id}/acknowledge"),
                &Body {
                    instance_id,
                    message,
                },
            )
            .await?;
        Ok(())
    }

    // ── Investigations ───────────────────────────────────────────────

    /// Register an investigation for an alarm, returning the id to pass
    /// to [`Self::stream_investigation`].
    pub async fn create_investigation(
        &self,
        alarm_id: &str,
        instance_id: &str,
    ) -> Result<types::InvestigationCreated, Error> {
        #[derive(Serialize)]
        struct Body<'a> {
            alarm_id: &'a str,
            instance_id: &'a str,
        }

        self.post(
            "api/chat/investigation/create",
            &Body {
                alarm_id,
                instance_id,
            },
        )
        .await
    }

    /// Open the SSE stream for a registered investigation.
    ///
    /// Fails fast on a non-success status; otherwise hands back an
    /// [`InvestigationStream`] that yields parsed events until the
    /// backend sends its terminal frame or the connection drops.
    pub async fn stream_investigation(
        &self,
        investigation_id: &str,
    ) -> Result<InvestigationStream, Error> {
        let url = self.url(&format!("api/chat/investigation/{investigation_id}/stream"))?;
        debug!("GET {url} (sse)");

        // No request timeout: the stream stays open for the whole
        // investigation.
        let resp = self
            .stream_http
            .get(url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Self::parse_error(status, resp).await);
        }

        Ok(InvestigationStream::new(resp.bytes_stream()))
    }
}

/// First ~200 bytes of a response body, cut back to a char boundary so
/// multibyte payloads can't panic the error path.
fn body_preview(body: &str) -> &str {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
