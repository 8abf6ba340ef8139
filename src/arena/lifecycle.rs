use std::sync::Arc;

use super::events::ServerEvent;
use super::relay::{identity_topic, RelayHub};
use super::session::{ParticipantRole, SessionDirectory, TimerAnchor};
use crate::error::{DuelError, Result};
use crate::store::{is_valid_identity, CompleteOutcome, Difficulty, DuelStore, UserDirectory};

/// Owns duel state transitions: creation, membership-driven timer start,
/// idempotent teardown, and the exactly-once winner transition.
pub struct LifecycleManager {
    store: Arc<DuelStore>,
    users: Arc<UserDirectory>,
    sessions: Arc<SessionDirectory>,
    relay: Arc<RelayHub>,
    duel_duration_ms: u64,
}

impl LifecycleManager {
    pub fn new(
        store: Arc<DuelStore>,
        users: Arc<UserDirectory>,
        sessions: Arc<SessionDirectory>,
        relay: Arc<RelayHub>,
        duel_duration_ms: u64,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            users,
            sessions,
            relay,
            duel_duration_ms,
        })
    }

    /// Create a pending duel and notify the opponent's private topic
    pub async fn create(
        &self,
        challenger: &str,
        opponent_identity: &str,
        difficulty: &str,
    ) -> Result<String> {
        let difficulty = Difficulty::parse(difficulty).ok_or_else(|| {
            DuelError::validation(format!("unknown difficulty: {}", difficulty))
        })?;

        if !is_valid_identity(opponent_identity) {
            return Err(DuelError::validation(format!(
                "{} is not a valid identity",
                opponent_identity
            )));
        }

        if !self.users.exists(challenger).await {
            return Err(DuelError::not_found(format!("User {}", challenger)));
        }

        let duel = self
            .store
            .create(
                challenger.to_string(),
                opponent_identity.to_string(),
                difficulty,
            )
            .await;

        self.relay
            .broadcast(
                &identity_topic(opponent_identity),
                &ServerEvent::ChallengeRequested {
                    from: challenger.to_string(),
                    difficulty,
                    duel_id: duel.id.clone(),
                },
            )
            .await;

        tracing::info!(
            duel_id = %duel.id,
            challenger = %challenger,
            opponent = %opponent_identity,
            "Duel created, opponent notified"
        );
        Ok(duel.id)
    }

    /// Join a duel room. Announces the joiner's peer id to prior occupants;
    /// when the second active participant arrives the timer anchor is created
    /// once, the duel activates, and `start-timer` is broadcast room-wide.
    /// A joiner finding an existing anchor (reconnect) receives it unchanged.
    pub async fn join(
        &self,
        duel_id: &str,
        conn_id: &str,
        role: ParticipantRole,
        peer_id: Option<String>,
    ) -> Result<()> {
        if self.store.get(duel_id).await.is_none() {
            return Err(DuelError::not_found(format!("Duel {}", duel_id)));
        }

        self.relay.join_topic(conn_id, duel_id).await;
        if let Some(pid) = &peer_id {
            self.relay.set_peer(conn_id, pid, role).await;
        }

        let active_count = self.sessions.record_join(duel_id, conn_id, role).await;

        if let Some(pid) = peer_id {
            self.relay
                .publish(duel_id, conn_id, &ServerEvent::PeerConnected { peer_id: pid })
                .await;
        }

        tracing::info!(
            conn_id = %conn_id,
            duel_id = %duel_id,
            role = ?role,
            active_count = active_count,
            "Joined duel room"
        );

        match self.sessions.timer(duel_id).await {
            Some(anchor) => {
                // Reconnect case: same anchor, the clock never restarts
                self.relay.send_to(conn_id, &Self::start_timer(anchor)).await;
            }
            None if role == ParticipantRole::Active && active_count >= 2 => {
                let (anchor, created) = self
                    .sessions
                    .get_or_create_timer(duel_id, self.duel_duration_ms)
                    .await;
                if created {
                    self.store.activate(duel_id).await;
                    self.relay.broadcast(duel_id, &Self::start_timer(anchor)).await;
                } else {
                    self.relay.send_to(conn_id, &Self::start_timer(anchor)).await;
                }
            }
            None => {}
        }

        Ok(())
    }

    /// Re-send the current anchor so a reconnecting client can reconcile its
    /// countdown instead of trusting a locally-resumed counter
    pub async fn request_timer(&self, duel_id: &str, conn_id: &str) {
        if let Some(anchor) = self.sessions.timer(duel_id).await {
            self.relay.send_to(conn_id, &Self::start_timer(anchor)).await;
        } else {
            tracing::debug!(duel_id = %duel_id, "Timer requested before duel started");
        }
    }

    /// Idempotent teardown: the record deletion gates the broadcast, so
    /// concurrent initiators produce exactly one termination notice and a
    /// repeat call on an absent duel is a silent no-op.
    pub async fn terminate(&self, duel_id: &str, initiator: &str) -> Result<()> {
        let removed = self.store.delete(duel_id).await;
        self.sessions.remove(duel_id).await;

        if removed {
            self.relay
                .broadcast(
                    duel_id,
                    &ServerEvent::DuelTerminated {
                        message: "The duel has been terminated.".to_string(),
                    },
                )
                .await;
            tracing::info!(duel_id = %duel_id, initiator = %initiator, "Duel terminated");
        } else {
            tracing::debug!(duel_id = %duel_id, "Terminate on absent duel ignored");
        }

        Ok(())
    }

    /// Claim the win. The store's conditional transition decides the race;
    /// the losing claim observes `AlreadyDecided` instead of an error.
    pub async fn complete(&self, duel_id: &str, winner: &str) -> CompleteOutcome {
        let outcome = self.store.complete_if_undecided(duel_id, winner).await;

        if outcome == CompleteOutcome::Won {
            self.relay
                .broadcast(
                    duel_id,
                    &ServerEvent::DuelCompleted {
                        winner: winner.to_string(),
                        message: format!("{} solved the problem first!", winner),
                    },
                )
                .await;
            self.sessions.remove(duel_id).await;
        }

        outcome
    }

    /// Drop a disconnected participant from the session; the timer anchor is
    /// untouched so a rejoin resumes the same countdown
    pub async fn leave(&self, duel_id: &str, conn_id: &str) {
        self.sessions.record_leave(duel_id, conn_id).await;
    }

    fn start_timer(anchor: TimerAnchor) -> ServerEvent {
        ServerEvent::StartTimer {
            start_time: anchor.start_time,
            duration_ms: anchor.duration_ms,
        }
    }
}
