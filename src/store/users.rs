use std::collections::{HashMap, HashSet};
use std::env;
use std::sync::Arc;
use std::sync::OnceLock;

use regex::Regex;
use tokio::sync::RwLock;

use crate::error::{DuelError, Result};

/// Email-shaped identity pattern, matching what the account service enforces
fn identity_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[\w\-.]+@([\w-]+\.)+[\w-]{2,4}$").expect("identity pattern is valid")
    })
}

pub fn is_valid_identity(identity: &str) -> bool {
    identity_pattern().is_match(identity)
}

/// Credential and identity lookup backed by the external account service.
///
/// Issuance and validation of credentials live outside this server; this
/// directory holds the resolved token -> identity mapping the service hands
/// us. `ARENA_API_TOKENS` ("token=identity,token=identity") seeds it for
/// standalone deployments; tests insert pairs directly.
pub struct UserDirectory {
    tokens: RwLock<HashMap<String, String>>,
    users: RwLock<HashSet<String>>,
}

impl UserDirectory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            tokens: RwLock::new(HashMap::new()),
            users: RwLock::new(HashSet::new()),
        })
    }

    pub fn from_env() -> Arc<Self> {
        let mut tokens = HashMap::new();
        let mut users = HashSet::new();

        if let Ok(seed) = env::var("ARENA_API_TOKENS") {
            for pair in seed.split(',').filter(|p| !p.is_empty()) {
                match pair.split_once('=') {
                    Some((token, identity)) if is_valid_identity(identity.trim()) => {
                        tokens.insert(token.trim().to_string(), identity.trim().to_string());
                        users.insert(identity.trim().to_string());
                    }
                    _ => {
                        tracing::warn!(entry = %pair, "Skipping malformed ARENA_API_TOKENS entry");
                    }
                }
            }
            tracing::info!(count = users.len(), "Seeded user directory from environment");
        }

        Arc::new(Self {
            tokens: RwLock::new(tokens),
            users: RwLock::new(users),
        })
    }

    pub async fn insert_token(&self, token: &str, identity: &str) {
        let mut tokens = self.tokens.write().await;
        let mut users = self.users.write().await;
        tokens.insert(token.to_string(), identity.to_string());
        users.insert(identity.to_string());
    }

    /// Resolve a bearer token to an identity
    pub async fn verify_token(&self, token: &str) -> Result<String> {
        let tokens = self.tokens.read().await;
        tokens
            .get(token)
            .cloned()
            .ok_or_else(|| DuelError::Auth("invalid credential".to_string()))
    }

    pub async fn exists(&self, identity: &str) -> bool {
        let users = self.users.read().await;
        users.contains(identity)
    }
}
