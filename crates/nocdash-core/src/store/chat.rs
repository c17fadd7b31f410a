// ── Investigation chat transcript ──
//
// Client-side state for the AI investigation panel. A single active
// investigation at a time; starting a new one clears the transcript.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use uuid::Uuid;

/// Who produced a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    /// Operator input (reserved for follow-up questions).
    User,
    /// Streamed AI analysis.
    Assistant,
    /// Locally generated status lines ("Starting investigation for: …")
    /// and stream failure notices.
    System,
}

/// One entry in the investigation transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: ChatRole,
    /// Grows in place while the assistant is streaming.
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Full transcript state, published as one value so renders are
/// consistent (messages never race against the streaming flag).
#[derive(Debug, Clone, Default)]
pub struct ChatState {
    /// Backend correlation id of the current investigation, if any.
    pub investigation_id: Option<String>,
    pub messages: Vec<ChatMessage>,
    /// True from investigation start until the terminal stream frame.
    pub streaming: bool,
}

/// Watch-published chat store. All mutations go through [`ChatStore`];
/// the UI only ever holds a receiver.
pub(crate) struct ChatStore {
    state: watch::Sender<Arc<ChatState>>,
}

impl ChatStore {
    pub(crate) fn new() -> Self {
        let (state, _) = watch::channel(Arc::new(ChatState::default()));
        Self { state }
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<ChatState>> {
        self.state.subscribe()
    }

    pub(crate) fn snapshot(&self) -> Arc<ChatState> {
        self.state.borrow().clone()
    }

    pub(crate) fn set_investigation_id(&self, id: Option<String>) {
        self.mutate(|s| s.investigation_id = id);
    }

    pub(crate) fn add_message(&self, message: ChatMessage) {
        self.mutate(|s| s.messages.push(message));
    }

    /// Append streamed text to the trailing message. A no-op on an
    /// empty transcript — chunks arriving after a `clear` are stale.
    pub(crate) fn append_to_last_message(&self, text: &str) {
        self.mutate(|s| {
            if let Some(last) = s.messages.last_mut() {
                last.content.push_str(text);
            }
        });
    }

    pub(crate) fn set_streaming(&self, streaming: bool) {
        self.mutate(|s| s.streaming = streaming);
    }

    /// Reset to idle: no id, no messages, not streaming.
    pub(crate) fn clear(&self) {
        self.state
            .send_modify(|s| *s = Arc::new(ChatState::default()));
    }

    fn mutate<F: FnOnce(&mut ChatState)>(&self, f: F) {
        self.state.send_modify(|s| {
            let mut next = (**s).clone();
            f(&mut next);
            *s = Arc::new(next);
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn append_on_empty_transcript_is_noop() {
        let store = ChatStore::new();
        store.append_to_last_message("stale chunk");
        assert!(store.snapshot().messages.is_empty());
    }

    #[test]
    fn clear_then_start_produces_single_message_transcript() {
        let store = ChatStore::new();
        store.set_investigation_id(Some("inv-0".into()));
        store.add_message(ChatMessage::new(ChatRole::Assistant, "old analysis"));
        store.set_streaming(true);

        store.clear();
        store.set_investigation_id(Some("inv-1".into()));
        store.add_message(ChatMessage::new(
            ChatRole::System,
            "Starting investigation for: High CPU",
        ));

        let state = store.snapshot();
        assert_eq!(state.investigation_id.as_deref(), Some("inv-1"));
        assert_eq!(state.messages.len(), 1);
        assert_eq!(
            state.messages[0].content,
            "Starting investigation for: High CPU"
        );
        assert!(!state.streaming);
    }

    #[test]
    fn chunks_grow_the_trailing_message() {
        let store = ChatStore::new();
        store.add_message(ChatMessage::new(ChatRole::Assistant, "Checking disk"));
        store.append_to_last_message(" usage on db-01.");

        let state = store.snapshot();
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.messages[0].content, "Checking disk usage on db-01.");
    }

    #[test]
    fn streaming_flag_toggles() {
        let store = ChatStore::new();
        let mut rx = store.subscribe();

        store.set_streaming(true);
        assert!(rx.borrow_and_update().streaming);
        store.set_streaming(false);
        assert!(!rx.borrow_and_update().streaming);
    }
}
