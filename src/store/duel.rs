use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Questions selected per duel, fixed at creation time
pub const QUESTIONS_PER_DUEL: usize = 2;

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Deterministic question list for a difficulty tier
    pub fn questions(&self) -> Vec<String> {
        (1..=QUESTIONS_PER_DUEL)
            .map(|n| format!("question_{}_{}", self.as_str(), n))
            .collect()
    }
}

/// Forward-only status; termination is record deletion, not a status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuelStatus {
    Pending,
    Active,
    Completed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Duel {
    pub id: String,
    pub challenger: String,
    pub opponent_identity: String,
    pub difficulty: Difficulty,
    pub questions: Vec<String>,
    pub status: DuelStatus,
    pub winner: Option<String>,
    pub created_at: u64,
    pub updated_at: u64,
}

/// Result of the conditional winner transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompleteOutcome {
    /// This call transitioned the duel to completed and set the winner
    Won,
    /// Another submission already decided the duel
    AlreadyDecided,
    NotFound,
}

/// Durable duel record store.
///
/// Stands in for the external record store behind the same create/read/update
/// contract. `complete_if_undecided` is the single serialization point for the
/// winner race: the status check and the winner write happen under one write
/// lock, so concurrent correct submissions resolve to exactly one winner.
pub struct DuelStore {
    duels: Arc<RwLock<HashMap<String, Duel>>>,
}

impl DuelStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            duels: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Generate a random duel ID
    fn generate_duel_id() -> String {
        let mut rng = rand::thread_rng();
        format!("{:012x}", rng.gen::<u64>() & 0xffff_ffff_ffff)
    }

    pub async fn create(
        &self,
        challenger: String,
        opponent_identity: String,
        difficulty: Difficulty,
    ) -> Duel {
        let now = now_millis();
        let duel = Duel {
            id: Self::generate_duel_id(),
            challenger,
            opponent_identity,
            difficulty,
            questions: difficulty.questions(),
            status: DuelStatus::Pending,
            winner: None,
            created_at: now,
            updated_at: now,
        };

        let mut duels = self.duels.write().await;
        duels.insert(duel.id.clone(), duel.clone());

        tracing::info!(duel_id = %duel.id, difficulty = %difficulty.as_str(), "Duel record created");
        duel
    }

    pub async fn get(&self, duel_id: &str) -> Option<Duel> {
        let duels = self.duels.read().await;
        duels.get(duel_id).cloned()
    }

    /// Transition pending -> active; a no-op for any other current status
    pub async fn activate(&self, duel_id: &str) -> bool {
        let mut duels = self.duels.write().await;
        if let Some(duel) = duels.get_mut(duel_id) {
            if duel.status == DuelStatus::Pending {
                duel.status = DuelStatus::Active;
                duel.updated_at = now_millis();
                return true;
            }
        }
        false
    }

    /// Atomic conditional completion: sets the winner only if the duel has not
    /// already been decided. The check and the write share one write lock.
    pub async fn complete_if_undecided(&self, duel_id: &str, winner: &str) -> CompleteOutcome {
        let mut duels = self.duels.write().await;
        match duels.get_mut(duel_id) {
            None => CompleteOutcome::NotFound,
            Some(duel) if duel.status == DuelStatus::Completed => CompleteOutcome::AlreadyDecided,
            Some(duel) => {
                duel.status = DuelStatus::Completed;
                duel.winner = Some(winner.to_string());
                duel.updated_at = now_millis();
                tracing::info!(duel_id = %duel_id, winner = %winner, "Duel completed");
                CompleteOutcome::Won
            }
        }
    }

    /// Remove the record; returns whether this call actually deleted it
    pub async fn delete(&self, duel_id: &str) -> bool {
        let mut duels = self.duels.write().await;
        duels.remove(duel_id).is_some()
    }

    /// All duels still in play (pending or active)
    pub async fn ongoing(&self) -> Vec<Duel> {
        let duels = self.duels.read().await;
        duels
            .values()
            .filter(|d| d.status != DuelStatus::Completed)
            .cloned()
            .collect()
    }

    /// Ongoing duels where the given identity is challenger or opponent
    pub async fn ongoing_for(&self, identity: &str) -> Vec<Duel> {
        let duels = self.duels.read().await;
        duels
            .values()
            .filter(|d| {
                d.status != DuelStatus::Completed
                    && (d.challenger == identity || d.opponent_identity == identity)
            })
            .cloned()
            .collect()
    }
}
