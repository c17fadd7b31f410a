// ── Reactive data store ──
//
// Single source of truth for everything the UI renders: alarms,
// instances, filters, aggregate stats, backend health, and the
// investigation transcript. All reads are lock-free snapshots; all
// change notification is push-based via `watch` channels.

pub mod chat;
mod collection;

use std::sync::Arc;

use tokio::sync::watch;

use crate::model::{
    Alarm, AlarmFilters, AlarmStats, HealthStatus, Instance, alarm_display_order,
};
use crate::stream::EntityStream;
use chat::{ChatState, ChatStore};
use collection::EntityCollection;

/// Reactive storage shared between the session's poll tasks and the UI.
pub struct DataStore {
    /// Active alarms keyed `"{instance_id}:{alarm_id}"`, snapshot kept
    /// in display order (severity descending).
    alarms: EntityCollection<Alarm>,

    /// Monitoring instances keyed by instance id.
    instances: EntityCollection<Instance>,

    /// Current alarm filter criteria. Poll tasks watch this and
    /// re-fetch immediately on change.
    filters: watch::Sender<AlarmFilters>,

    /// Instance selected in the UI (narrows the alarm list), if any.
    selected_instance: watch::Sender<Option<String>>,

    /// Latest aggregate alarm statistics from the backend.
    stats: watch::Sender<Option<AlarmStats>>,

    /// Latest backend health report.
    health: watch::Sender<Option<HealthStatus>>,

    /// Last alarm poll failure, cleared on the next success. Existing
    /// alarm data is kept while this is set.
    poll_error: watch::Sender<Option<String>>,

    pub(crate) chat: ChatStore,
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DataStore {
    pub fn new() -> Self {
        let (filters, _) = watch::channel(AlarmFilters::default());
        let (selected_instance, _) = watch::channel(None);
        let (stats, _) = watch::channel(None);
        let (health, _) = watch::channel(None);
        let (poll_error, _) = watch::channel(None);

        Self {
            alarms: EntityCollection::sorted(alarm_display_order),
            instances: EntityCollection::sorted(|a, b| a.name.cmp(&b.name)),
            filters,
            selected_instance,
            stats,
            health,
            poll_error,
            chat: ChatStore::new(),
        }
    }

    // ── Alarms ───────────────────────────────────────────────────────

    /// Apply a successful alarm poll: replace the collection with the
    /// incoming set and clear any recorded poll error. Subscribers see
    /// one snapshot change, never a transient empty list.
    pub fn apply_alarm_poll(&self, alarms: Vec<Alarm>) {
        self.alarms
            .replace_all(alarms.into_iter().map(|a| (a.key(), a)).collect());
        self.poll_error.send_if_modified(|e| e.take().is_some());
    }

    /// Record a poll failure, keeping whatever alarm data we have.
    pub fn record_poll_error(&self, message: String) {
        self.poll_error.send_modify(|e| *e = Some(message));
    }

    pub fn alarm(&self, instance_id: &str, alarm_id: &str) -> Option<Arc<Alarm>> {
        self.alarms.get(&format!("{instance_id}:{alarm_id}"))
    }

    pub fn alarms_snapshot(&self) -> Arc<Vec<Arc<Alarm>>> {
        self.alarms.snapshot()
    }

    pub fn subscribe_alarms(&self) -> EntityStream<Alarm> {
        EntityStream::new(self.alarms.subscribe())
    }

    pub fn alarm_count(&self) -> usize {
        self.alarms.len()
    }

    pub fn subscribe_poll_error(&self) -> watch::Receiver<Option<String>> {
        self.poll_error.subscribe()
    }

    // ── Filters ──────────────────────────────────────────────────────

    /// Replace the filter criteria. Returns `true` if they changed
    /// (watchers are only woken on a real change).
    pub fn set_filters(&self, filters: AlarmFilters) -> bool {
        self.filters.send_if_modified(|current| {
            if *current == filters {
                false
            } else {
                *current = filters;
                true
            }
        })
    }

    pub fn filters(&self) -> AlarmFilters {
        self.filters.borrow().clone()
    }

    pub fn subscribe_filters(&self) -> watch::Receiver<AlarmFilters> {
        self.filters.subscribe()
    }

    // ── Instances ────────────────────────────────────────────────────

    /// Apply a successful instance poll (wholesale replacement).
    pub fn apply_instance_poll(&self, instances: Vec<Instance>) {
        self.instances
            .replace_all(instances.into_iter().map(|i| (i.id.clone(), i)).collect());

        // Drop the selection if its instance disappeared.
        let selected_gone = self
            .selected_instance
            .borrow()
            .as_ref()
            .is_some_and(|id| self.instances.get(id).is_none());
        if selected_gone {
            self.selected_instance.send_modify(|s| *s = None);
        }
    }

    /// Refresh a single instance in place (targeted status check).
    pub fn upsert_instance(&self, instance: Instance) {
        self.instances.upsert(instance.id.clone(), instance);
    }

    pub fn instance(&self, id: &str) -> Option<Arc<Instance>> {
        self.instances.get(id)
    }

    pub fn instances_snapshot(&self) -> Arc<Vec<Arc<Instance>>> {
        self.instances.snapshot()
    }

    pub fn subscribe_instances(&self) -> EntityStream<Instance> {
        EntityStream::new(self.instances.subscribe())
    }

    /// Select an instance, or clear the selection when `id` is already
    /// selected (click-again-to-deselect). Unknown ids clear too.
    pub fn toggle_selected_instance(&self, id: &str) {
        self.selected_instance.send_modify(|current| {
            if current.as_deref() == Some(id) || self.instances.get(id).is_none() {
                *current = None;
            } else {
                *current = Some(id.to_owned());
            }
        });
    }

    pub fn selected_instance(&self) -> Option<String> {
        self.selected_instance.borrow().clone()
    }

    pub fn subscribe_selected_instance(&self) -> watch::Receiver<Option<String>> {
        self.selected_instance.subscribe()
    }

    // ── Stats & health ───────────────────────────────────────────────

    pub fn set_stats(&self, stats: AlarmStats) {
        self.stats.send_modify(|s| *s = Some(stats));
    }

    pub fn stats(&self) -> Option<AlarmStats> {
        self.stats.borrow().clone()
    }

    pub fn subscribe_stats(&self) -> watch::Receiver<Option<AlarmStats>> {
        self.stats.subscribe()
    }

    pub fn set_health(&self, health: HealthStatus) {
        self.health.send_modify(|h| *h = Some(health));
    }

    pub fn subscribe_health(&self) -> watch::Receiver<Option<HealthStatus>> {
        self.health.subscribe()
    }

    // ── Investigation chat ───────────────────────────────────────────

    pub fn chat_snapshot(&self) -> Arc<ChatState> {
        self.chat.snapshot()
    }

    pub fn subscribe_chat(&self) -> watch::Receiver<Arc<ChatState>> {
        self.chat.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{InstanceStatus, Severity};

    fn alarm(id: &str, instance: &str, severity: Severity, acked: bool) -> Alarm {
        Alarm {
            id: id.into(),
            instance_id: instance.into(),
            instance_name: format!("Zabbix {instance}"),
            host: "web-01".into(),
            description: "High CPU".into(),
            severity,
            severity_code: severity.code(),
            duration: "5m".into(),
            acknowledged: acked,
            event_id: "1".into(),
            is_synthetic: false,
            started_at: None,
        }
    }

    fn instance(id: &str) -> Instance {
        Instance {
            id: id.into(),
            name: format!("Zabbix {id}"),
            status: InstanceStatus::Connected,
            version: None,
            error: None,
            problem_counts: None,
            last_sync: None,
        }
    }

    #[test]
    fn alarm_poll_replaces_and_sorts() {
        let store = DataStore::new();
        store.apply_alarm_poll(vec![
            alarm("1", "eu", Severity::Warning, false),
            alarm("2", "eu", Severity::Disaster, false),
        ]);

        let snap = store.alarms_snapshot();
        assert_eq!(snap[0].severity, Severity::Disaster);

        // Second poll drops alarm 2 — it must disappear.
        store.apply_alarm_poll(vec![alarm("1", "eu", Severity::Warning, false)]);
        assert_eq!(store.alarm_count(), 1);
        assert!(store.alarm("eu", "2").is_none());
    }

    #[test]
    fn same_alarm_id_on_two_instances_coexists() {
        let store = DataStore::new();
        store.apply_alarm_poll(vec![
            alarm("7001", "eu", Severity::High, false),
            alarm("7001", "us", Severity::High, false),
        ]);
        assert_eq!(store.alarm_count(), 2);
        assert!(store.alarm("eu", "7001").is_some());
        assert!(store.alarm("us", "7001").is_some());
    }

    #[test]
    fn poll_error_keeps_existing_alarms() {
        let store = DataStore::new();
        store.apply_alarm_poll(vec![alarm("1", "eu", Severity::High, false)]);

        store.record_poll_error("connection refused".into());
        assert_eq!(store.alarm_count(), 1);
        assert!(store.subscribe_poll_error().borrow().is_some());

        // Next success clears the error.
        store.apply_alarm_poll(vec![alarm("1", "eu", Severity::High, false)]);
        assert!(store.subscribe_poll_error().borrow().is_none());
    }

    #[test]
    fn acknowledged_state_comes_from_polls_only() {
        let store = DataStore::new();
        store.apply_alarm_poll(vec![alarm("1", "eu", Severity::High, false)]);
        assert!(!store.alarm("eu", "1").unwrap().acknowledged);

        // The backend confirms via the next poll.
        store.apply_alarm_poll(vec![alarm("1", "eu", Severity::High, true)]);
        assert!(store.alarm("eu", "1").unwrap().acknowledged);
    }

    #[test]
    fn set_filters_reports_real_changes_only() {
        let store = DataStore::new();
        let filters = AlarmFilters {
            severities: vec![Severity::Disaster],
            ..AlarmFilters::default()
        };

        assert!(store.set_filters(filters.clone()));
        assert!(!store.set_filters(filters));
        assert!(store.set_filters(AlarmFilters::default()));
    }

    #[test]
    fn toggle_instance_selection() {
        let store = DataStore::new();
        store.apply_instance_poll(vec![instance("eu"), instance("us")]);

        store.toggle_selected_instance("eu");
        assert_eq!(store.selected_instance().as_deref(), Some("eu"));

        // Toggling the same id deselects.
        store.toggle_selected_instance("eu");
        assert_eq!(store.selected_instance(), None);

        // Unknown ids never select.
        store.toggle_selected_instance("nope");
        assert_eq!(store.selected_instance(), None);
    }

    #[test]
    fn selection_cleared_when_instance_vanishes() {
        let store = DataStore::new();
        store.apply_instance_poll(vec![instance("eu"), instance("us")]);
        store.toggle_selected_instance("us");

        store.apply_instance_poll(vec![instance("eu")]);
        assert_eq!(store.selected_instance(), None);
    }
}
