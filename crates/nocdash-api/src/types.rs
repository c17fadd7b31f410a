//! Wire types for the backend API.
//!
//! Everything here deserializes straight from the backend's JSON
//! (snake_case fields). `nocdash-core` re-exports these as the domain
//! model — the backend payloads are already the canonical shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Severity ────────────────────────────────────────────────────────

/// Alarm severity, mirroring the Zabbix trigger priority scale.
///
/// Ordering follows the numeric code: `NotClassified` (0) sorts lowest,
/// `Disaster` (5) highest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    NotClassified,
    Information,
    Warning,
    Average,
    High,
    Disaster,
}

impl Severity {
    /// Numeric Zabbix priority code (0-5).
    pub fn code(self) -> u8 {
        match self {
            Self::NotClassified => 0,
            Self::Information => 1,
            Self::Warning => 2,
            Self::Average => 3,
            Self::High => 4,
            Self::Disaster => 5,
        }
    }

    /// The wire name (`"disaster"`, `"high"`, …) used in query parameters.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotClassified => "not_classified",
            Self::Information => "information",
            Self::Warning => "warning",
            Self::Average => "average",
            Self::High => "high",
            Self::Disaster => "disaster",
        }
    }
}

// ── Instances ───────────────────────────────────────────────────────

/// Connection state of a monitoring instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Connected,
    Disconnected,
    Error,
}

/// Per-severity open problem counters for one instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemCounts {
    #[serde(default)]
    pub disaster: u32,
    #[serde(default)]
    pub high: u32,
    #[serde(default)]
    pub average: u32,
    #[serde(default)]
    pub warning: u32,
    #[serde(default)]
    pub information: u32,
}

impl ProblemCounts {
    pub fn total(&self) -> u32 {
        self.disaster + self.high + self.average + self.warning + self.information
    }
}

/// A monitored backend instance. Replaced wholesale on every poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    pub name: String,
    pub status: InstanceStatus,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub problem_counts: Option<ProblemCounts>,
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,
}

// ── Alarms ──────────────────────────────────────────────────────────

/// An active alarm from one instance.
///
/// Uniqueness key is `(instance_id, id)` — alarm ids are only unique
/// within their owning instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alarm {
    pub id: String,
    pub instance_id: String,
    pub instance_name: String,
    pub host: String,
    pub description: String,
    pub severity: Severity,
    pub severity_code: u8,
    /// Human-readable age ("3h 12m") computed by the backend.
    pub duration: String,
    pub acknowledged: bool,
    pub event_id: String,
    /// System-generated (connectivity loss etc.) vs. backend-sourced.
    #[serde(default)]
    pub is_synthetic: bool,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
}

impl Alarm {
    /// Composite key uniquely identifying this alarm across instances.
    pub fn key(&self) -> String {
        format!("{}:{}", self.instance_id, self.id)
    }
}

/// Filter criteria for alarm queries.
///
/// Unset fields are omitted from the request entirely — the backend
/// treats a missing parameter as "no filter". Persisted across sessions
/// by `nocdash-config`; alarm data itself never is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlarmFilters {
    #[serde(default)]
    pub instance_id: Option<String>,
    #[serde(default)]
    pub severities: Vec<Severity>,
    #[serde(default)]
    pub acknowledged: Option<bool>,
    #[serde(default)]
    pub host: Option<String>,
}

impl AlarmFilters {
    pub fn is_empty(&self) -> bool {
        self.instance_id.is_none()
            && self.severities.is_empty()
            && self.acknowledged.is_none()
            && self.host.is_none()
    }

    /// Serialize to query parameters, omitting unset fields.
    pub(crate) fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(ref id) = self.instance_id {
            params.push(("instance_id", id.clone()));
        }
        for sev in &self.severities {
            params.push(("severity", sev.as_str().to_owned()));
        }
        if let Some(ack) = self.acknowledged {
            params.push(("acknowledged", ack.to_string()));
        }
        if let Some(ref host) = self.host {
            params.push(("host", host.clone()));
        }
        params
    }
}

// ── Stats & health ──────────────────────────────────────────────────

/// Per-severity alarm totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    #[serde(default)]
    pub disaster: u32,
    #[serde(default)]
    pub high: u32,
    #[serde(default)]
    pub average: u32,
    #[serde(default)]
    pub warning: u32,
    #[serde(default)]
    pub information: u32,
    #[serde(default)]
    pub not_classified: u32,
}

/// Aggregate alarm statistics from the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlarmStats {
    pub total: u32,
    #[serde(default)]
    pub by_severity: SeverityCounts,
    #[serde(default)]
    pub synthetic: u32,
    #[serde(default)]
    pub zabbix: u32,
    #[serde(default)]
    pub last_poll: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceHealth {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Backend health report (`GET /health`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: ServiceHealth,
    #[serde(default)]
    pub services: std::collections::BTreeMap<String, String>,
    #[serde(default)]
    pub alarm_stats: Option<AlarmStats>,
}

// ── Investigations ──────────────────────────────────────────────────

/// Response from investigation creation: the correlation id plus an
/// opaque snapshot of the alarm the backend recorded.
#[derive(Debug, Clone, Deserialize)]
pub struct InvestigationCreated {
    pub investigation_id: String,
    pub alarm: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering_follows_code() {
        assert!(Severity::Disaster > Severity::High);
        assert!(Severity::High > Severity::Average);
        assert!(Severity::Information > Severity::NotClassified);
        assert_eq!(Severity::Disaster.code(), 5);
        assert_eq!(Severity::NotClassified.code(), 0);
    }

    #[test]
    fn severity_wire_names_round_trip() {
        for sev in [
            Severity::NotClassified,
            Severity::Information,
            Severity::Warning,
            Severity::Average,
            Severity::High,
            Severity::Disaster,
        ] {
            let json = serde_json::to_string(&sev).expect("serialize");
            assert_eq!(json, format!("\"{}\"", sev.as_str()));
            let back: Severity = serde_json::from_str(&json).expect("deserialize");
            assert_eq!(back, sev);
        }
    }

    #[test]
    fn empty_filters_produce_no_params() {
        let filters = AlarmFilters::default();
        assert!(filters.is_empty());
        assert!(filters.query_params().is_empty());
    }

    #[test]
    fn filters_repeat_severity_param() {
        let filters = AlarmFilters {
            severities: vec![Severity::Disaster, Severity::High],
            ..AlarmFilters::default()
        };
        let params = filters.query_params();
        assert_eq!(
            params,
            vec![
                ("severity", "disaster".to_owned()),
                ("severity", "high".to_owned()),
            ]
        );
    }

    #[test]
    fn alarm_key_is_instance_scoped() {
        let alarm: Alarm = serde_json::from_value(serde_json::json!({
            "id": "7001",
            "instance_id": "zbx-eu",
            "instance_name": "Zabbix EU",
            "host": "db-01",
            "description": "Disk nearly full",
            "severity": "high",
            "severity_code": 4,
            "duration": "2h 5m",
            "acknowledged": false,
            "event_id": "9001"
        }))
        .expect("deserialize alarm");
        assert_eq!(alarm.key(), "zbx-eu:7001");
        assert!(!alarm.is_synthetic);
    }
}
