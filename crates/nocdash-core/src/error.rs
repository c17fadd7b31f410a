// ── Core error types ──
//
// User-facing errors from nocdash-core. Consumers never see HTTP
// status codes or JSON parse failures directly; the
// `From<nocdash_api::Error>` impl translates transport-layer errors
// into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Backend unreachable: {reason}")]
    BackendUnreachable { reason: String },

    #[error("Backend request timed out")]
    Timeout,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Alarm not found: {instance_id}/{alarm_id}")]
    AlarmNotFound {
        instance_id: String,
        alarm_id: String,
    },

    // ── Operation errors ─────────────────────────────────────────────
    /// Rejected by the backend with an explanation meant for display
    /// (e.g. acknowledging a synthetic alarm). The message is shown to
    /// the operator verbatim.
    #[error("{message}")]
    Rejected { message: String },

    #[error("Investigation failed: {message}")]
    Investigation { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("Backend error: {message}")]
    Api {
        message: String,
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<nocdash_api::Error> for CoreError {
    fn from(err: nocdash_api::Error) -> Self {
        match err {
            nocdash_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::BackendUnreachable {
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            nocdash_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            // Client errors carry an operator-facing explanation from
            // the backend; anything else is a generic API failure.
            nocdash_api::Error::Backend { status, detail } if (400..500).contains(&status) => {
                CoreError::Rejected { message: detail }
            }
            nocdash_api::Error::Backend { status, detail } => CoreError::Api {
                message: detail,
                status: Some(status),
            },
            nocdash_api::Error::MalformedResponse { message, body: _ } => {
                CoreError::Internal(format!("Malformed backend response: {message}"))
            }
            nocdash_api::Error::Stream(message) => CoreError::Investigation { message },
        }
    }
}
