//! Bounded per-session transcript store.
//!
//! The outer map is a `parking_lot` mutex held only long enough to find or
//! create a session's slot. Each slot is a `tokio` mutex; an exchange holds
//! it from the moment history is read until the new turns are recorded, so
//! two requests for the same session run one after the other while
//! different sessions never wait on each other.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use pp_domain::agent::ChatTurn;

type Slot = Arc<AsyncMutex<VecDeque<ChatTurn>>>;

pub struct HistoryStore {
    max_turns: usize,
    sessions: Mutex<HashMap<String, Slot>>,
}

impl HistoryStore {
    /// `max_turns` is clamped to at least 1.
    pub fn new(max_turns: usize) -> Self {
        Self {
            max_turns: max_turns.max(1),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    fn slot(&self, session_id: &str) -> Slot {
        self.sessions
            .lock()
            .entry(session_id.to_owned())
            .or_default()
            .clone()
    }

    /// Exclusive access to one session's history for the duration of an
    /// exchange. Waits while another exchange on the same session runs.
    pub async fn begin(&self, session_id: &str) -> SessionHistory {
        let guard = self.slot(session_id).lock_owned().await;
        SessionHistory {
            session_id: session_id.to_owned(),
            max_turns: self.max_turns,
            turns: guard,
        }
    }

    /// Copy of a session's turns, oldest first. Unknown sessions are empty.
    pub async fn snapshot(&self, session_id: &str) -> Vec<ChatTurn> {
        let slot = self.sessions.lock().get(session_id).cloned();
        match slot {
            Some(slot) => slot.lock().await.iter().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Forget a session. Returns whether it existed.
    pub async fn clear(&self, session_id: &str) -> bool {
        let slot = self.sessions.lock().remove(session_id);
        match slot {
            Some(slot) => {
                // An exchange still holding the slot finishes against the
                // detached deque; its turns are discarded with it.
                slot.lock().await.clear();
                tracing::debug!(session_id, "session history cleared");
                true
            }
            None => false,
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }
}

/// A locked view of one session's transcript.
pub struct SessionHistory {
    session_id: String,
    max_turns: usize,
    turns: OwnedMutexGuard<VecDeque<ChatTurn>>,
}

impl SessionHistory {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn turns(&self) -> Vec<ChatTurn> {
        self.turns.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Append a turn, evicting the oldest ones past the cap.
    pub fn push(&mut self, turn: ChatTurn) {
        self.turns.push_back(turn);
        while self.turns.len() > self.max_turns {
            self.turns.pop_front();
        }
    }

    /// Record a finished exchange: the user's message, then the answer.
    pub fn record_exchange(&mut self, message: &str, answer: &str) {
        self.push(ChatTurn::user(message));
        self.push(ChatTurn::model(answer));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn never_exceeds_cap_and_evicts_oldest() {
        let store = HistoryStore::new(20);
        for i in 0..15 {
            let mut h = store.begin("s1").await;
            h.record_exchange(&format!("q{i}"), &format!("a{i}"));
            assert!(h.len() <= 20);
        }

        let turns = store.snapshot("s1").await;
        assert_eq!(turns.len(), 20);
        assert_eq!(turns[0], ChatTurn::user("q5"));
        assert_eq!(turns[19], ChatTurn::model("a14"));
    }

    #[tokio::test]
    async fn same_session_exchanges_are_serialized() {
        let store = Arc::new(HistoryStore::new(20));

        let mut first = store.begin("s1").await;
        let store2 = Arc::clone(&store);
        let waiter = tokio::spawn(async move {
            let mut h = store2.begin("s1").await;
            // Sees the first exchange's turns.
            let seen = h.len();
            h.record_exchange("second", "b");
            seen
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        first.record_exchange("first", "a");
        drop(first);

        assert_eq!(waiter.await.unwrap(), 2);
        let turns = store.snapshot("s1").await;
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[2], ChatTurn::user("second"));
    }

    #[tokio::test]
    async fn different_sessions_do_not_block() {
        let store = HistoryStore::new(20);
        let _a = store.begin("a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), store.begin("b")).await;
        assert!(b.is_ok());
        assert_eq!(store.session_count(), 2);
    }

    #[tokio::test]
    async fn clear_forgets_session() {
        let store = HistoryStore::new(20);
        store.begin("s").await.record_exchange("q", "a");
        assert!(store.clear("s").await);
        assert!(!store.clear("s").await);
        assert!(store.snapshot("s").await.is_empty());
    }
}
