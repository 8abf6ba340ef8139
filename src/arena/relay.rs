use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rand::Rng;
use tokio::sync::{mpsc, RwLock};
use warp::ws::Message;

use super::events::ServerEvent;
use super::session::ParticipantRole;

/// Topic carrying unsolicited notifications for a single identity
pub fn identity_topic(identity: &str) -> String {
    format!("user:{}", identity)
}

struct ConnectionState {
    sender: mpsc::UnboundedSender<Message>,
    identity: Option<String>,
    peer_id: Option<String>,
    role: ParticipantRole,
    topics: HashSet<String>,
}

/// Topic-based publish/subscribe relay.
///
/// One outbound channel per connection; publishing pushes onto every member's
/// channel except the sender's, so per-sender emission order is preserved.
/// Delivery to a closed connection is swallowed — one side's transient
/// disconnect must never corrupt shared state.
pub struct RelayHub {
    connections: Arc<RwLock<HashMap<String, ConnectionState>>>,
    topics: Arc<RwLock<HashMap<String, HashSet<String>>>>,
}

impl RelayHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
            topics: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Generate a random connection ID
    pub fn generate_conn_id() -> String {
        let mut rng = rand::thread_rng();
        format!("conn_{:012x}", rng.gen::<u64>() & 0xffff_ffff_ffff)
    }

    pub async fn register(&self, conn_id: &str, sender: mpsc::UnboundedSender<Message>) {
        let mut connections = self.connections.write().await;
        connections.insert(
            conn_id.to_string(),
            ConnectionState {
                sender,
                identity: None,
                peer_id: None,
                role: ParticipantRole::Active,
                topics: HashSet::new(),
            },
        );
        tracing::info!(conn_id = %conn_id, "Connection registered");
    }

    /// Bind an identity to the connection and join its private topic
    pub async fn set_identity(&self, conn_id: &str, identity: &str) {
        {
            let mut connections = self.connections.write().await;
            if let Some(conn) = connections.get_mut(conn_id) {
                conn.identity = Some(identity.to_string());
            } else {
                return;
            }
        }
        self.join_topic(conn_id, &identity_topic(identity)).await;
        tracing::info!(conn_id = %conn_id, identity = %identity, "Identity registered");
    }

    pub async fn set_peer(&self, conn_id: &str, peer_id: &str, role: ParticipantRole) {
        let mut connections = self.connections.write().await;
        if let Some(conn) = connections.get_mut(conn_id) {
            conn.peer_id = Some(peer_id.to_string());
            conn.role = role;
        }
    }

    pub async fn connection_identity(&self, conn_id: &str) -> Option<String> {
        let connections = self.connections.read().await;
        connections.get(conn_id).and_then(|c| c.identity.clone())
    }

    pub async fn connection_peer(&self, conn_id: &str) -> Option<String> {
        let connections = self.connections.read().await;
        connections.get(conn_id).and_then(|c| c.peer_id.clone())
    }

    pub async fn connection_role(&self, conn_id: &str) -> Option<ParticipantRole> {
        let connections = self.connections.read().await;
        connections.get(conn_id).map(|c| c.role)
    }

    /// Join a topic; repeated joins are no-ops. Returns whether membership changed.
    pub async fn join_topic(&self, conn_id: &str, topic: &str) -> bool {
        let mut connections = self.connections.write().await;
        let Some(conn) = connections.get_mut(conn_id) else {
            return false;
        };
        if !conn.topics.insert(topic.to_string()) {
            return false;
        }
        drop(connections);

        let mut topics = self.topics.write().await;
        topics
            .entry(topic.to_string())
            .or_default()
            .insert(conn_id.to_string());
        tracing::debug!(conn_id = %conn_id, topic = %topic, "Joined topic");
        true
    }

    pub async fn members(&self, topic: &str) -> Vec<String> {
        let topics = self.topics.read().await;
        topics
            .get(topic)
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Deliver to every member of the topic except the sender
    pub async fn publish(&self, topic: &str, sender_conn: &str, event: &ServerEvent) {
        let Some(message) = Self::encode(event) else {
            return;
        };
        let members = self.members(topic).await;
        let connections = self.connections.read().await;
        for member in members {
            if member == sender_conn {
                continue;
            }
            if let Some(conn) = connections.get(&member) {
                Self::deliver(&member, conn, message.clone());
            }
        }
    }

    /// Server-originated delivery to every member of the topic
    pub async fn broadcast(&self, topic: &str, event: &ServerEvent) {
        let Some(message) = Self::encode(event) else {
            return;
        };
        let members = self.members(topic).await;
        let connections = self.connections.read().await;
        for member in members {
            if let Some(conn) = connections.get(&member) {
                Self::deliver(&member, conn, message.clone());
            }
        }
    }

    pub async fn send_to(&self, conn_id: &str, event: &ServerEvent) {
        let Some(message) = Self::encode(event) else {
            return;
        };
        let connections = self.connections.read().await;
        if let Some(conn) = connections.get(conn_id) {
            Self::deliver(conn_id, conn, message);
        }
    }

    /// Deliver to the member of the topic that announced the given peer id.
    /// Returns false when no such occupant exists (the event is dropped).
    pub async fn send_to_peer(&self, topic: &str, peer_id: &str, event: &ServerEvent) -> bool {
        let Some(message) = Self::encode(event) else {
            return false;
        };
        let members = self.members(topic).await;
        let connections = self.connections.read().await;
        for member in members {
            if let Some(conn) = connections.get(&member) {
                if conn.peer_id.as_deref() == Some(peer_id) {
                    Self::deliver(&member, conn, message);
                    return true;
                }
            }
        }
        tracing::debug!(topic = %topic, peer_id = %peer_id, "No occupant for target peer, dropping");
        false
    }

    /// Remove the connection from every topic; returns the topics it left
    pub async fn disconnect(&self, conn_id: &str) -> Vec<String> {
        let removed = {
            let mut connections = self.connections.write().await;
            connections.remove(conn_id)
        };

        let Some(conn) = removed else {
            return Vec::new();
        };

        let mut topics = self.topics.write().await;
        for topic in &conn.topics {
            if let Some(members) = topics.get_mut(topic) {
                members.remove(conn_id);
                if members.is_empty() {
                    topics.remove(topic);
                }
            }
        }
        tracing::info!(conn_id = %conn_id, "Connection removed");
        conn.topics.into_iter().collect()
    }

    fn encode(event: &ServerEvent) -> Option<Message> {
        match serde_json::to_string(event) {
            Ok(text) => Some(Message::text(text)),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize server event");
                None
            }
        }
    }

    fn deliver(conn_id: &str, conn: &ConnectionState, message: Message) {
        if conn.sender.send(message).is_err() {
            // Receiver side already gone; the disconnect path cleans up
            tracing::debug!(conn_id = %conn_id, "Dropping event for closed connection");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn connect(relay: &RelayHub, conn_id: &str) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        relay.register(conn_id, tx).await;
        rx
    }

    fn event_type(message: &Message) -> String {
        let value: serde_json::Value = serde_json::from_str(message.to_str().unwrap()).unwrap();
        value["type"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_publish_excludes_sender() {
        let relay = RelayHub::new();
        let mut rx_a = connect(&relay, "a").await;
        let mut rx_b = connect(&relay, "b").await;
        relay.join_topic("a", "d1").await;
        relay.join_topic("b", "d1").await;

        let event = ServerEvent::CodeUpdate {
            identity: "a@x.com".into(),
            code: "fn main() {}".into(),
        };
        relay.publish("d1", "a", &event).await;

        assert_eq!(event_type(&rx_b.recv().await.unwrap()), "code-update");
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_reaches_everyone() {
        let relay = RelayHub::new();
        let mut rx_a = connect(&relay, "a").await;
        let mut rx_b = connect(&relay, "b").await;
        relay.join_topic("a", "d1").await;
        relay.join_topic("b", "d1").await;

        let event = ServerEvent::DuelTerminated {
            message: "done".into(),
        };
        relay.broadcast("d1", &event).await;

        assert_eq!(event_type(&rx_a.recv().await.unwrap()), "duel-terminated");
        assert_eq!(event_type(&rx_b.recv().await.unwrap()), "duel-terminated");
    }

    #[tokio::test]
    async fn test_join_topic_is_idempotent() {
        let relay = RelayHub::new();
        let _rx = connect(&relay, "a").await;

        assert!(relay.join_topic("a", "d1").await);
        assert!(!relay.join_topic("a", "d1").await);
        assert_eq!(relay.members("d1").await.len(), 1);
    }

    #[tokio::test]
    async fn test_connection_spans_multiple_topics() {
        let relay = RelayHub::new();
        let mut rx = connect(&relay, "a").await;
        relay.join_topic("a", "d1").await;
        relay.set_identity("a", "a@x.com").await;

        let event = ServerEvent::ChallengeRequested {
            from: "b@x.com".into(),
            difficulty: crate::store::Difficulty::Easy,
            duel_id: "d2".into(),
        };
        relay.broadcast(&identity_topic("a@x.com"), &event).await;

        assert_eq!(event_type(&rx.recv().await.unwrap()), "challenge-requested");
        assert_eq!(relay.members("d1").await.len(), 1);
    }

    #[tokio::test]
    async fn test_publish_to_empty_topic_is_dropped() {
        let relay = RelayHub::new();
        let event = ServerEvent::DuelTerminated {
            message: "late".into(),
        };
        // No members, no error
        relay.broadcast("gone", &event).await;
    }

    #[tokio::test]
    async fn test_send_to_peer_targets_one_occupant() {
        let relay = RelayHub::new();
        let mut rx_a = connect(&relay, "a").await;
        let mut rx_b = connect(&relay, "b").await;
        relay.join_topic("a", "d1").await;
        relay.join_topic("b", "d1").await;
        relay.set_peer("a", "peer-a", ParticipantRole::Active).await;
        relay.set_peer("b", "peer-b", ParticipantRole::Active).await;

        let event = ServerEvent::SignalAnswer {
            from_peer_id: "peer-a".into(),
            sdp: "v=0".into(),
        };
        assert!(relay.send_to_peer("d1", "peer-b", &event).await);
        assert!(!relay.send_to_peer("d1", "peer-z", &event).await);

        assert_eq!(event_type(&rx_b.recv().await.unwrap()), "signal-answer");
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_disconnect_leaves_all_topics() {
        let relay = RelayHub::new();
        let _rx = connect(&relay, "a").await;
        relay.join_topic("a", "d1").await;
        relay.set_identity("a", "a@x.com").await;

        let mut left = relay.disconnect("a").await;
        left.sort();
        assert_eq!(left, vec!["d1".to_string(), "user:a@x.com".to_string()]);
        assert!(relay.members("d1").await.is_empty());
    }
}
