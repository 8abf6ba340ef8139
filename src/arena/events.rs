use serde::{Deserialize, Serialize};

use super::session::ParticipantRole;
use crate::store::Difficulty;

/// Events a client may send over the arena WebSocket.
///
/// One discriminated payload per event name; anything that fails to parse is
/// dropped at the relay boundary before dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    JoinDuel {
        duel_id: String,
        peer_id: Option<String>,
        role: Option<ParticipantRole>,
    },
    RegisterIdentity {
        identity: String,
    },
    CodeChange {
        identity: String,
        duel_id: String,
        code: String,
    },
    RequestTimer {
        duel_id: String,
    },
    TerminateDuel {
        duel_id: String,
    },
    SignalOffer {
        duel_id: String,
        target_peer_id: String,
        sdp: String,
    },
    SignalAnswer {
        duel_id: String,
        target_peer_id: String,
        sdp: String,
    },
    SignalCandidate {
        duel_id: String,
        target_peer_id: String,
        candidate: String,
        sdp_mid: Option<String>,
        sdp_mline_index: Option<u16>,
    },
}

/// Events the server pushes to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    CodeUpdate {
        identity: String,
        code: String,
    },
    ChallengeRequested {
        from: String,
        difficulty: Difficulty,
        duel_id: String,
    },
    PeerConnected {
        peer_id: String,
    },
    StartTimer {
        start_time: u64,
        duration_ms: u64,
    },
    DuelTerminated {
        message: String,
    },
    DuelCompleted {
        winner: String,
        message: String,
    },
    /// Offers carry the sender's registered identity so spectators can label
    /// challenger/opponent streams without relying on arrival order
    SignalOffer {
        from_peer_id: String,
        from_identity: Option<String>,
        sdp: String,
    },
    SignalAnswer {
        from_peer_id: String,
        sdp: String,
    },
    SignalCandidate {
        from_peer_id: String,
        candidate: String,
        sdp_mid: Option<String>,
        sdp_mline_index: Option<u16>,
    },
    Error {
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_event_wire_names() {
        let event: ClientEvent = serde_json::from_str(
            r#"{"type":"join-duel","duelId":"abc123","peerId":"peer-1","role":"watcher"}"#,
        )
        .unwrap();
        assert!(matches!(
            event,
            ClientEvent::JoinDuel {
                role: Some(ParticipantRole::Watcher),
                ..
            }
        ));

        let event: ClientEvent = serde_json::from_str(
            r#"{"type":"code-change","identity":"a@x.com","duelId":"abc123","code":"fn main() {}"}"#,
        )
        .unwrap();
        assert!(matches!(event, ClientEvent::CodeChange { .. }));
    }

    #[test]
    fn test_server_event_wire_names() {
        let json = serde_json::to_string(&ServerEvent::StartTimer {
            start_time: 1000,
            duration_ms: 900_000,
        })
        .unwrap();
        assert!(json.contains(r#""type":"start-timer""#));
        assert!(json.contains(r#""startTime":1000"#));
        assert!(json.contains(r#""durationMs":900000"#));
    }

    #[test]
    fn test_malformed_event_fails_to_parse() {
        assert!(serde_json::from_str::<ClientEvent>(r#"{"type":"join-duel"}"#).is_err());
        assert!(serde_json::from_str::<ClientEvent>(r#"{"type":"reset-timer"}"#).is_err());
    }
}
