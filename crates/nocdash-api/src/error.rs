use thiserror::Error;

/// Top-level error type for the `nocdash-api` crate.
///
/// Covers transport failures, structured backend errors, and payloads
/// that don't match the documented contract. `nocdash-core` maps these
/// into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Backend ─────────────────────────────────────────────────────
    /// Non-success HTTP status with the backend's `detail` message.
    #[error("{detail}")]
    Backend { status: u16, detail: String },

    // ── Data ────────────────────────────────────────────────────────
    /// Response body didn't match the expected shape. Carries the raw
    /// body so callers can log what the backend actually sent.
    #[error("Malformed response: {message}")]
    MalformedResponse { message: String, body: String },

    // ── Streaming ───────────────────────────────────────────────────
    /// The investigation stream failed mid-relay.
    #[error("Stream error: {0}")]
    Stream(String),
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Stream(_) => true,
            _ => false,
        }
    }

    /// HTTP status of a structured backend error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Backend { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
