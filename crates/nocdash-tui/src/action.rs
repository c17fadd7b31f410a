//! All possible UI actions. Actions are the sole mechanism for state mutation.

use std::sync::Arc;

use nocdash_core::{Alarm, AlarmFilters, AlarmStats, ChatState, HealthStatus, Instance, Severity};

use crate::screen::ScreenId;

/// Notification severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

/// A transient status-bar notification.
#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
}

impl Notification {
    pub fn success(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Success,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Error,
        }
    }

    pub fn info(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Info,
        }
    }
}

/// Every state transition in the TUI is expressed as an Action.
#[derive(Debug, Clone)]
pub enum Action {
    // ── Lifecycle ──────────────────────────────────────────────────
    Quit,
    Tick,
    Render,
    Resize(u16, u16),

    // ── Navigation ────────────────────────────────────────────────
    SwitchScreen(ScreenId),
    GoBack,
    ToggleHelp,

    // ── Data events (from the session's store) ────────────────────
    AlarmsUpdated(Arc<Vec<Arc<Alarm>>>),
    InstancesUpdated(Arc<Vec<Arc<Instance>>>),
    StatsUpdated(Option<AlarmStats>),
    HealthUpdated(Option<HealthStatus>),
    ChatUpdated(Arc<ChatState>),
    PollError(Option<String>),
    SelectedInstanceChanged(Option<String>),
    FiltersUpdated(AlarmFilters),

    // ── Commands (executed against the session) ───────────────────
    /// Toggle the dashboard-wide instance filter (Enter on a card).
    ToggleInstanceFilter(String),
    /// Restrict the alarm list to one severity, or show all.
    SetSeverityFilter(Option<Severity>),
    /// Flip between all alarms and unacknowledged-only.
    ToggleAckFilter,
    ClearFilters,
    AcknowledgeAlarm {
        instance_id: String,
        alarm_id: String,
    },
    Investigate {
        instance_id: String,
        alarm_id: String,
    },

    // ── Notifications ─────────────────────────────────────────────
    Notify(Notification),
}
