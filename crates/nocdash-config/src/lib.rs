//! Shared configuration for the NOC dashboard binaries.
//!
//! TOML config file + `NOCDASH_*` environment overrides, translation to
//! `nocdash_core::SessionConfig`, and persistence of UI state that
//! survives restarts (alarm filters). The proxy additionally honors the
//! bare `PORT` and `BACKEND_URL` variables its deployment environment
//! has always used.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use nocdash_core::{AlarmFilters, SessionConfig};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration shared by the proxy and the TUI.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Base URL of the alarm aggregation backend.
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Alarm list + stats poll cadence, seconds.
    #[serde(default = "default_poll_secs")]
    pub alarm_poll_secs: u64,

    /// Instance fleet poll cadence, seconds.
    #[serde(default = "default_poll_secs")]
    pub instance_poll_secs: u64,

    /// Backend health poll cadence, seconds.
    #[serde(default = "default_health_poll_secs")]
    pub health_poll_secs: u64,

    /// Message attached to alarm acknowledgements.
    #[serde(default = "default_ack_message")]
    pub ack_message: String,

    #[serde(default)]
    pub proxy: ProxyConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            alarm_poll_secs: default_poll_secs(),
            instance_poll_secs: default_poll_secs(),
            health_poll_secs: default_health_poll_secs(),
            ack_message: default_ack_message(),
            proxy: ProxyConfig::default(),
        }
    }
}

impl Config {
    /// Translate to the core session config.
    pub fn to_session_config(&self) -> SessionConfig {
        SessionConfig {
            backend_url: self.backend_url.clone(),
            alarm_poll_interval: Duration::from_secs(self.alarm_poll_secs),
            instance_poll_interval: Duration::from_secs(self.instance_poll_secs),
            health_poll_interval: Duration::from_secs(self.health_poll_secs),
            ack_message: self.ack_message.clone(),
        }
    }

    /// Validate fields that would otherwise only fail deep inside the
    /// session or the proxy.
    pub fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.backend_url).map_err(|e| ConfigError::Validation {
            field: "backend_url".into(),
            reason: format!("invalid URL '{}': {e}", self.backend_url),
        })?;
        if self.alarm_poll_secs == 0 || self.instance_poll_secs == 0 || self.health_poll_secs == 0 {
            return Err(ConfigError::Validation {
                field: "poll interval".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        Ok(())
    }
}

/// Settings for the reverse proxy binary.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxyConfig {
    /// Listen port.
    #[serde(default = "default_proxy_port")]
    pub port: u16,

    /// Directory holding the built web UI. `None` disables static
    /// serving (API relay only).
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: default_proxy_port(),
            static_dir: None,
        }
    }
}

fn default_backend_url() -> String {
    "http://localhost:13001".into()
}
fn default_poll_secs() -> u64 {
    30
}
fn default_health_poll_secs() -> u64 {
    60
}
fn default_ack_message() -> String {
    "Acknowledged from NOC dashboard".into()
}
fn default_proxy_port() -> u16 {
    13000
}

// ── Config file paths ───────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dir().join("config.toml")
}

/// Persisted UI state (alarm filters) lives next to the config.
pub fn filters_path() -> PathBuf {
    project_dir().join("filters.toml")
}

fn project_dir() -> PathBuf {
    ProjectDirs::from("com", "nocdash", "nocdash")
        .map_or_else(dirs_fallback, |dirs| dirs.config_dir().to_path_buf())
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("nocdash");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config: defaults, then the TOML file, then `NOCDASH_*`
/// environment variables, then the bare `PORT` / `BACKEND_URL`
/// variables the deployment environment sets.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Same as [`load_config`] with an explicit file path (used by tests
/// and `--config` flags).
pub fn load_config_from(path: &std::path::Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("NOCDASH_").split("__"));

    let mut config: Config = figment.extract()?;

    // Bare variables take precedence over everything: they are how the
    // container environment has always pointed the proxy at its backend.
    if let Ok(url) = std::env::var("BACKEND_URL") {
        config.backend_url = url;
    }
    if let Ok(port) = std::env::var("PORT") {
        match port.parse() {
            Ok(p) => config.proxy.port = p,
            Err(_) => {
                return Err(ConfigError::Validation {
                    field: "PORT".into(),
                    reason: format!("not a port number: '{port}'"),
                });
            }
        }
    }

    config.validate()?;
    Ok(config)
}

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    write_toml(&config_path(), cfg)
}

// ── Persisted alarm filters ─────────────────────────────────────────

/// Load the alarm filters saved by a previous run. Missing or
/// unreadable state is an empty filter set, never an error — stale UI
/// state must not block startup.
pub fn load_filters() -> AlarmFilters {
    load_filters_from(&filters_path())
}

pub fn load_filters_from(path: &std::path::Path) -> AlarmFilters {
    match std::fs::read_to_string(path) {
        Ok(raw) => match toml::from_str(&raw) {
            Ok(filters) => filters,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring corrupt filter state");
                AlarmFilters::default()
            }
        },
        Err(_) => AlarmFilters::default(),
    }
}

/// Persist the current alarm filters for the next session.
pub fn save_filters(filters: &AlarmFilters) -> Result<(), ConfigError> {
    write_toml(&filters_path(), filters)
}

pub fn save_filters_to(
    path: &std::path::Path,
    filters: &AlarmFilters,
) -> Result<(), ConfigError> {
    write_toml(path, filters)
}

fn write_toml<T: Serialize>(path: &std::path::Path, value: &T) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(value)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use nocdash_core::Severity;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_deployment_contract() {
        let config = Config::default();
        assert_eq!(config.backend_url, "http://localhost:13001");
        assert_eq!(config.proxy.port, 13000);
        assert_eq!(config.alarm_poll_secs, 30);
    }

    #[test]
    fn toml_file_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                    backend_url = "http://backend.internal:9000"
                    alarm_poll_secs = 10

                    [proxy]
                    port = 8080
                "#,
            )?;

            let config = load_config_from(std::path::Path::new("config.toml")).unwrap();
            assert_eq!(config.backend_url, "http://backend.internal:9000");
            assert_eq!(config.alarm_poll_secs, 10);
            assert_eq!(config.instance_poll_secs, 30);
            assert_eq!(config.proxy.port, 8080);
            Ok(())
        });
    }

    #[test]
    fn bare_env_vars_win() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("config.toml", r#"backend_url = "http://from-file:1""#)?;
            jail.set_env("NOCDASH_BACKEND_URL", "http://from-prefixed:2");
            jail.set_env("BACKEND_URL", "http://from-bare:3");
            jail.set_env("PORT", "4444");

            let config = load_config_from(std::path::Path::new("config.toml")).unwrap();
            assert_eq!(config.backend_url, "http://from-bare:3");
            assert_eq!(config.proxy.port, 4444);
            Ok(())
        });
    }

    #[test]
    fn invalid_backend_url_is_rejected() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("config.toml", r#"backend_url = "not a url""#)?;
            let err = load_config_from(std::path::Path::new("config.toml")).unwrap_err();
            assert!(matches!(err, ConfigError::Validation { .. }));
            Ok(())
        });
    }

    #[test]
    fn filters_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filters.toml");

        let filters = AlarmFilters {
            instance_id: Some("zbx-eu".into()),
            severities: vec![Severity::Disaster, Severity::High],
            acknowledged: Some(false),
            host: None,
        };
        save_filters_to(&path, &filters).unwrap();

        let loaded = load_filters_from(&path);
        assert_eq!(loaded, filters);
    }

    #[test]
    fn missing_or_corrupt_filter_state_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            load_filters_from(&dir.path().join("absent.toml")),
            AlarmFilters::default()
        );

        let path = dir.path().join("garbage.toml");
        std::fs::write(&path, "not [valid toml").unwrap();
        assert_eq!(load_filters_from(&path), AlarmFilters::default());
    }

    #[test]
    fn session_config_translation() {
        let config = Config {
            alarm_poll_secs: 15,
            ..Config::default()
        };
        let session = config.to_session_config();
        assert_eq!(session.alarm_poll_interval, Duration::from_secs(15));
        assert_eq!(session.backend_url, config.backend_url);
    }
}
