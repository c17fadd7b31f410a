//! Canonical domain model.
//!
//! The backend wire types from `nocdash-api` already match what the UI
//! needs, so they are re-exported unchanged rather than mirrored. Only
//! the investigation chat transcript lives purely client-side; its
//! types are defined in [`crate::store::chat`].

pub use nocdash_api::types::{
    Alarm, AlarmFilters, AlarmStats, HealthStatus, Instance, InstanceStatus, InvestigationCreated,
    ProblemCounts, ServiceHealth, Severity, SeverityCounts,
};

/// Ordering used for alarm lists everywhere in the UI: most severe
/// first, newest within a severity, then instance and id so re-polls
/// don't shuffle rows.
pub fn alarm_display_order(a: &Alarm, b: &Alarm) -> std::cmp::Ordering {
    b.severity
        .cmp(&a.severity)
        .then_with(|| b.started_at.cmp(&a.started_at))
        .then_with(|| a.instance_id.cmp(&b.instance_id))
        .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alarm(id: &str, instance: &str, severity: Severity) -> Alarm {
        Alarm {
            id: id.into(),
            instance_id: instance.into(),
            instance_name: instance.into(),
            host: "h".into(),
            description: "d".into(),
            severity,
            severity_code: severity.code(),
            duration: "1m".into(),
            acknowledged: false,
            event_id: "1".into(),
            is_synthetic: false,
            started_at: None,
        }
    }

    #[test]
    fn display_order_is_severity_desc_then_stable() {
        let mut alarms = vec![
            alarm("2", "b", Severity::Warning),
            alarm("1", "a", Severity::Disaster),
            alarm("3", "a", Severity::Warning),
        ];
        alarms.sort_by(alarm_display_order);

        let ids: Vec<&str> = alarms.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["1", "3", "2"]);
    }
}
