// ── Dashboard session ──
//
// Lifecycle management for one dashboard's connection to the alarm
// backend: initial data load, background polling, acknowledgement,
// and AI investigation streaming into the DataStore.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use nocdash_api::{ApiClient, StreamEvent};

use crate::error::CoreError;
use crate::model::AlarmFilters;
use crate::store::DataStore;
use crate::store::chat::{ChatMessage, ChatRole};

// ── Configuration ────────────────────────────────────────────────────

/// Tunables for a [`Session`]. Defaults match the backend's expected
/// polling cadence.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Base URL of the alarm backend.
    pub backend_url: String,
    /// Alarm list + stats poll cadence.
    pub alarm_poll_interval: Duration,
    /// Instance fleet poll cadence.
    pub instance_poll_interval: Duration,
    /// Backend health poll cadence.
    pub health_poll_interval: Duration,
    /// Message attached to acknowledgements sent to the backend.
    pub ack_message: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:13001".into(),
            alarm_poll_interval: Duration::from_secs(30),
            instance_poll_interval: Duration::from_secs(30),
            health_poll_interval: Duration::from_secs(60),
            ack_message: "Acknowledged from NOC dashboard".into(),
        }
    }
}

// ── Session ──────────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc`. [`start()`](Self::start) performs the
/// initial data load and spawns the background poll tasks;
/// [`shutdown()`](Self::shutdown) cancels and joins them. All state
/// flows into the shared [`DataStore`]; the UI only ever reads from
/// there.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: SessionConfig,
    api: ApiClient,
    store: Arc<DataStore>,
    cancel: CancellationToken,
    /// Child token for the current run — cancelled on shutdown,
    /// replaced on restart.
    cancel_child: Mutex<CancellationToken>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
    /// Token for the in-flight investigation stream; starting a new
    /// investigation cancels the previous one.
    investigation: Mutex<Option<CancellationToken>>,
}

impl Session {
    /// Create a session. Does NOT fetch anything — call
    /// [`start()`](Self::start) to load data and begin polling.
    pub fn new(config: SessionConfig) -> Result<Self, CoreError> {
        let api = ApiClient::new(&config.backend_url)?;
        Ok(Self::with_client(config, api))
    }

    /// Create a session around an existing [`ApiClient`].
    pub fn with_client(config: SessionConfig, api: ApiClient) -> Self {
        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();

        Self {
            inner: Arc::new(SessionInner {
                config,
                api,
                store: Arc::new(DataStore::new()),
                cancel,
                cancel_child: Mutex::new(cancel_child),
                task_handles: Mutex::new(Vec::new()),
                investigation: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<DataStore> {
        &self.inner.store
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Load the initial data snapshot and spawn the poll tasks.
    ///
    /// A backend that is down at startup is not fatal: the failure is
    /// recorded in the store and polling keeps retrying, so the
    /// dashboard comes alive as soon as the backend does.
    pub async fn start(&self) {
        // Fresh child token for this run (supports restart).
        let child = self.inner.cancel.child_token();
        *self.inner.cancel_child.lock().await = child.clone();

        tokio::join!(
            self.refresh_instances(),
            self.refresh_alarms(),
            self.refresh_health(),
        );

        let mut handles = self.inner.task_handles.lock().await;

        {
            let session = self.clone();
            let interval = self.inner.config.alarm_poll_interval;
            let cancel = child.clone();
            // Subscribe before spawning: a set_filters issued right
            // after start() returns must still trigger a refetch.
            let mut filters_rx = self.inner.store.subscribe_filters();
            filters_rx.mark_unchanged();
            handles.push(tokio::spawn(alarm_poll_task(
                session, interval, filters_rx, cancel,
            )));
        }
        {
            let session = self.clone();
            let interval = self.inner.config.instance_poll_interval;
            let cancel = child.clone();
            handles.push(tokio::spawn(instance_poll_task(session, interval, cancel)));
        }
        {
            let session = self.clone();
            let interval = self.inner.config.health_poll_interval;
            let cancel = child.clone();
            handles.push(tokio::spawn(health_poll_task(session, interval, cancel)));
        }

        info!(backend = %self.inner.config.backend_url, "session started");
    }

    /// Cancel background tasks (including any live investigation
    /// stream) and wait for them to finish.
    pub async fn shutdown(&self) {
        self.inner.cancel_child.lock().await.cancel();

        if let Some(token) = self.inner.investigation.lock().await.take() {
            token.cancel();
        }

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("session shut down");
    }

    // ── Refresh operations ───────────────────────────────────────────

    /// Fetch alarms with the current filters plus aggregate stats, and
    /// apply them to the store.
    ///
    /// Failures never clear existing data: transport errors are
    /// recorded for the UI's error banner, and a payload that doesn't
    /// match the alarm contract is treated as an empty list with a
    /// warning rather than poisoning the whole poll loop.
    pub async fn refresh_alarms(&self) {
        let filters = self.inner.store.filters();
        match self.inner.api.get_alarms(&filters).await {
            Ok(alarms) => {
                debug!(count = alarms.len(), "alarm poll complete");
                self.inner.store.apply_alarm_poll(alarms);
            }
            Err(nocdash_api::Error::MalformedResponse { message, .. }) => {
                warn!(%message, "alarm payload malformed, treating as empty");
                self.inner.store.apply_alarm_poll(Vec::new());
            }
            Err(e) => {
                warn!(error = %e, "alarm poll failed, keeping existing data");
                self.inner.store.record_poll_error(e.to_string());
            }
        }

        // Stats ride along with every alarm poll; their failure is
        // independent of the alarm list.
        match self.inner.api.get_alarm_stats().await {
            Ok(stats) => self.inner.store.set_stats(stats),
            Err(e) => debug!(error = %e, "stats fetch failed"),
        }
    }

    /// Fetch the instance fleet and apply it to the store.
    pub async fn refresh_instances(&self) {
        match self.inner.api.get_instances().await {
            Ok(instances) => {
                debug!(count = instances.len(), "instance poll complete");
                self.inner.store.apply_instance_poll(instances);
            }
            Err(e) => warn!(error = %e, "instance poll failed, keeping existing data"),
        }
    }

    /// Re-check a single instance's connection status on demand.
    pub async fn refresh_instance(&self, instance_id: &str) -> Result<(), CoreError> {
        let instance = self.inner.api.get_instance_status(instance_id).await?;
        self.inner.store.upsert_instance(instance);
        Ok(())
    }

    /// Fetch the backend health report.
    pub async fn refresh_health(&self) {
        match self.inner.api.get_health().await {
            Ok(health) => self.inner.store.set_health(health),
            Err(e) => debug!(error = %e, "health fetch failed"),
        }
    }

    // ── Filters ──────────────────────────────────────────────────────

    /// Replace the alarm filters. The poll task watches for this and
    /// re-fetches immediately, so the UI doesn't wait a full interval.
    pub fn set_filters(&self, filters: AlarmFilters) {
        if self.inner.store.set_filters(filters) {
            debug!("alarm filters changed");
        }
    }

    /// Drop all filter criteria (same immediate-refetch semantics).
    pub fn clear_filters(&self) {
        self.set_filters(AlarmFilters::default());
    }

    // ── Acknowledgement ──────────────────────────────────────────────

    /// Acknowledge an alarm on its owning instance.
    ///
    /// The store is never mutated optimistically: on success an
    /// immediate re-poll fetches the backend's view, so the UI only
    /// ever shows confirmed state. Backend rejections (synthetic
    /// alarms, unknown ids) surface as [`CoreError::Rejected`] with the
    /// backend's own message.
    pub async fn acknowledge_alarm(
        &self,
        instance_id: &str,
        alarm_id: &str,
    ) -> Result<(), CoreError> {
        self.inner
            .api
            .acknowledge_alarm(alarm_id, instance_id, &self.inner.config.ack_message)
            .await?;

        info!(%instance_id, %alarm_id, "alarm acknowledged");

        self.refresh_alarms().await;
        Ok(())
    }

    // ── Investigation ────────────────────────────────────────────────

    /// Start an AI investigation for an alarm already in the store.
    ///
    /// Creates the investigation on the backend, resets the chat
    /// transcript, and spawns a task that relays stream events into the
    /// store until the terminal frame. A previous investigation still
    /// streaming is cancelled first. Returns the investigation id.
    pub async fn investigate(
        &self,
        instance_id: &str,
        alarm_id: &str,
    ) -> Result<String, CoreError> {
        let alarm =
            self.inner
                .store
                .alarm(instance_id, alarm_id)
                .ok_or_else(|| CoreError::AlarmNotFound {
                    instance_id: instance_id.to_owned(),
                    alarm_id: alarm_id.to_owned(),
                })?;

        let created = self
            .inner
            .api
            .create_investigation(alarm_id, instance_id)
            .await?;
        let investigation_id = created.investigation_id;

        // One live stream at a time.
        let token = {
            let mut guard = self.inner.investigation.lock().await;
            if let Some(previous) = guard.take() {
                previous.cancel();
            }
            let token = self.inner.cancel_child.lock().await.child_token();
            *guard = Some(token.clone());
            token
        };

        // Fresh transcript: clear → correlate → opening system line.
        let chat = &self.inner.store.chat;
        chat.clear();
        chat.set_investigation_id(Some(investigation_id.clone()));
        chat.add_message(ChatMessage::new(
            ChatRole::System,
            format!("Starting investigation for: {}", alarm.description),
        ));
        chat.set_streaming(true);

        let session = self.clone();
        let id = investigation_id.clone();
        self.inner
            .task_handles
            .lock()
            .await
            .push(tokio::spawn(async move {
                session.run_investigation_stream(&id, token).await;
            }));

        info!(%investigation_id, %instance_id, %alarm_id, "investigation started");
        Ok(investigation_id)
    }

    /// Drive one investigation stream to completion, relaying events
    /// into the chat store.
    async fn run_investigation_stream(&self, investigation_id: &str, cancel: CancellationToken) {
        let chat = &self.inner.store.chat;

        let mut stream = match self.inner.api.stream_investigation(investigation_id).await {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "investigation stream failed to open");
                chat.add_message(ChatMessage::new(
                    ChatRole::System,
                    format!("Investigation failed: {e}"),
                ));
                chat.set_streaming(false);
                return;
            }
        };

        // The first content chunk opens the assistant message; later
        // chunks grow it in place.
        let mut assistant_open = false;

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!(%investigation_id, "investigation stream cancelled");
                    return;
                }
                event = stream.next_event() => {
                    match event {
                        Some(Ok(StreamEvent::Content { text })) => {
                            if assistant_open {
                                chat.append_to_last_message(&text);
                            } else {
                                chat.add_message(ChatMessage::new(ChatRole::Assistant, text));
                                assistant_open = true;
                            }
                        }
                        Some(Ok(StreamEvent::Done)) => break,
                        Some(Ok(StreamEvent::Error { message })) => {
                            chat.add_message(ChatMessage::new(
                                ChatRole::System,
                                format!("Investigation failed: {message}"),
                            ));
                            break;
                        }
                        Some(Err(e)) => {
                            chat.add_message(ChatMessage::new(
                                ChatRole::System,
                                format!("Investigation failed: {e}"),
                            ));
                            break;
                        }
                        // Connection closed without a terminal frame.
                        None => {
                            chat.add_message(ChatMessage::new(
                                ChatRole::System,
                                "Investigation stream ended unexpectedly",
                            ));
                            break;
                        }
                    }
                }
            }
        }
        chat.set_streaming(false);
    }
}

// ── Background tasks ─────────────────────────────────────────────────

/// Poll alarms + stats every `interval`, and immediately whenever the
/// filter criteria change.
async fn alarm_poll_task(
    session: Session,
    interval: Duration,
    mut filters_rx: watch::Receiver<AlarmFilters>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick fires immediately; start() already did that fetch.
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            changed = filters_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                // Filter-triggered fetch restarts the cadence so we
                // don't double-poll right after.
                ticker.reset();
            }
            _ = ticker.tick() => {}
        }
        session.refresh_alarms().await;
    }
    debug!("alarm poll task stopped");
}

/// Poll the instance fleet every `interval`.
async fn instance_poll_task(session: Session, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        session.refresh_instances().await;
    }
    debug!("instance poll task stopped");
}

/// Poll the backend health report every `interval`.
async fn health_poll_task(session: Session, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        session.refresh_health().await;
    }
    debug!("health poll task stopped");
}
