use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::store::now_millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    /// Challenger or opponent, with edit rights; counts toward timer start
    Active,
    /// Spectator; receives relay traffic but never affects the session clock
    Watcher,
}

/// The shared countdown every client derives remaining time from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerAnchor {
    pub start_time: u64,
    pub duration_ms: u64,
}

#[derive(Debug, Default)]
struct SessionState {
    timer: Option<TimerAnchor>,
    active: HashSet<String>,
    watchers: HashSet<String>,
}

/// In-memory runtime state per duel: timer anchor and room membership.
///
/// Created lazily on first join, removed on terminate/complete. Never a
/// source of truth for persisted facts; those flow through the record store.
pub struct SessionDirectory {
    sessions: Arc<RwLock<HashMap<String, SessionState>>>,
}

impl SessionDirectory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Record a participant joining; idempotent per connection id.
    /// Returns the active-role count after the join.
    pub async fn record_join(
        &self,
        duel_id: &str,
        conn_id: &str,
        role: ParticipantRole,
    ) -> usize {
        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(duel_id.to_string()).or_default();
        match role {
            ParticipantRole::Active => {
                session.active.insert(conn_id.to_string());
            }
            ParticipantRole::Watcher => {
                session.watchers.insert(conn_id.to_string());
            }
        }
        session.active.len()
    }

    pub async fn record_leave(&self, duel_id: &str, conn_id: &str) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(duel_id) {
            session.active.remove(conn_id);
            session.watchers.remove(conn_id);
        }
    }

    pub async fn room_size(&self, duel_id: &str, role: ParticipantRole) -> usize {
        let sessions = self.sessions.read().await;
        sessions
            .get(duel_id)
            .map(|s| match role {
                ParticipantRole::Active => s.active.len(),
                ParticipantRole::Watcher => s.watchers.len(),
            })
            .unwrap_or(0)
    }

    /// Create the timer anchor exactly once; later calls return the original
    /// unchanged. The bool reports whether this call created it.
    pub async fn get_or_create_timer(
        &self,
        duel_id: &str,
        duration_ms: u64,
    ) -> (TimerAnchor, bool) {
        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(duel_id.to_string()).or_default();
        match session.timer {
            Some(anchor) => (anchor, false),
            None => {
                let anchor = TimerAnchor {
                    start_time: now_millis(),
                    duration_ms,
                };
                session.timer = Some(anchor);
                tracing::info!(
                    duel_id = %duel_id,
                    start_time = anchor.start_time,
                    duration_ms = duration_ms,
                    "Timer anchor created"
                );
                (anchor, true)
            }
        }
    }

    pub async fn timer(&self, duel_id: &str) -> Option<TimerAnchor> {
        let sessions = self.sessions.read().await;
        sessions.get(duel_id).and_then(|s| s.timer)
    }

    pub async fn remove(&self, duel_id: &str) {
        let mut sessions = self.sessions.write().await;
        sessions.remove(duel_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_join_is_idempotent() {
        let sessions = SessionDirectory::new();

        assert_eq!(
            sessions.record_join("d1", "conn_a", ParticipantRole::Active).await,
            1
        );
        assert_eq!(
            sessions.record_join("d1", "conn_a", ParticipantRole::Active).await,
            1
        );
        assert_eq!(
            sessions.record_join("d1", "conn_b", ParticipantRole::Active).await,
            2
        );
    }

    #[tokio::test]
    async fn test_watchers_do_not_count_as_active() {
        let sessions = SessionDirectory::new();

        sessions.record_join("d1", "conn_a", ParticipantRole::Active).await;
        let count = sessions.record_join("d1", "conn_w", ParticipantRole::Watcher).await;

        assert_eq!(count, 1);
        assert_eq!(sessions.room_size("d1", ParticipantRole::Active).await, 1);
        assert_eq!(sessions.room_size("d1", ParticipantRole::Watcher).await, 1);
    }

    #[tokio::test]
    async fn test_timer_anchor_created_once() {
        let sessions = SessionDirectory::new();

        let (first, created) = sessions.get_or_create_timer("d1", 900_000).await;
        assert!(created);

        let (second, created) = sessions.get_or_create_timer("d1", 900_000).await;
        assert!(!created);
        assert_eq!(first, second);

        assert_eq!(sessions.timer("d1").await, Some(first));
    }

    #[tokio::test]
    async fn test_leave_then_rejoin_keeps_timer() {
        let sessions = SessionDirectory::new();
        sessions.record_join("d1", "conn_a", ParticipantRole::Active).await;
        sessions.record_join("d1", "conn_b", ParticipantRole::Active).await;
        let (anchor, _) = sessions.get_or_create_timer("d1", 900_000).await;

        sessions.record_leave("d1", "conn_b").await;
        assert_eq!(sessions.room_size("d1", ParticipantRole::Active).await, 1);

        sessions.record_join("d1", "conn_b2", ParticipantRole::Active).await;
        let (after_rejoin, created) = sessions.get_or_create_timer("d1", 900_000).await;
        assert!(!created);
        assert_eq!(anchor, after_rejoin);
    }

    #[tokio::test]
    async fn test_remove_clears_session() {
        let sessions = SessionDirectory::new();
        sessions.record_join("d1", "conn_a", ParticipantRole::Active).await;
        sessions.get_or_create_timer("d1", 900_000).await;

        sessions.remove("d1").await;

        assert_eq!(sessions.room_size("d1", ParticipantRole::Active).await, 0);
        assert!(sessions.timer("d1").await.is_none());
    }
}
