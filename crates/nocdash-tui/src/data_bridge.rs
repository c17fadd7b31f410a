//! Data bridge — connects the session's reactive store to TUI actions.
//!
//! Runs as a background task: subscribes to the store's entity streams
//! and watch channels, forwarding every change as an [`Action`] through
//! the TUI's action channel.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use nocdash_core::Session;

use crate::action::Action;

/// Forward store updates into the action channel until cancelled.
///
/// Initial snapshots are pushed up front so the screens have data on
/// their very first render instead of waiting for the next poll.
pub async fn run_data_bridge(
    session: Session,
    action_tx: mpsc::UnboundedSender<Action>,
    cancel: CancellationToken,
) {
    let store = session.store();
    let mut alarms = store.subscribe_alarms();
    let mut instances = store.subscribe_instances();
    let mut stats = store.subscribe_stats();
    let mut health = store.subscribe_health();
    let mut poll_error = store.subscribe_poll_error();
    let mut chat = store.subscribe_chat();
    let mut selected = store.subscribe_selected_instance();
    let mut filters = store.subscribe_filters();

    let _ = action_tx.send(Action::InstancesUpdated(instances.snapshot()));
    let _ = action_tx.send(Action::AlarmsUpdated(alarms.snapshot()));
    let _ = action_tx.send(Action::StatsUpdated(stats.borrow_and_update().clone()));
    let _ = action_tx.send(Action::HealthUpdated(health.borrow_and_update().clone()));

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => break,

            Some(snapshot) = alarms.changed() => {
                let _ = action_tx.send(Action::AlarmsUpdated(snapshot));
            }
            Some(snapshot) = instances.changed() => {
                let _ = action_tx.send(Action::InstancesUpdated(snapshot));
            }
            Ok(()) = stats.changed() => {
                let _ = action_tx.send(Action::StatsUpdated(stats.borrow_and_update().clone()));
            }
            Ok(()) = health.changed() => {
                let _ = action_tx.send(Action::HealthUpdated(health.borrow_and_update().clone()));
            }
            Ok(()) = poll_error.changed() => {
                let _ = action_tx.send(Action::PollError(poll_error.borrow_and_update().clone()));
            }
            Ok(()) = chat.changed() => {
                let _ = action_tx.send(Action::ChatUpdated(chat.borrow_and_update().clone()));
            }
            Ok(()) = selected.changed() => {
                let _ = action_tx.send(Action::SelectedInstanceChanged(
                    selected.borrow_and_update().clone(),
                ));
            }
            Ok(()) = filters.changed() => {
                let _ = action_tx.send(Action::FiltersUpdated(filters.borrow_and_update().clone()));
            }
        }
    }

    debug!("data bridge shut down");
}
