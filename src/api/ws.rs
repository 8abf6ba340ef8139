use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use warp::ws::{Message, WebSocket};

use super::routes::AppState;
use crate::arena::{ClientEvent, ParticipantRole, RelayHub, ServerEvent};

pub async fn handle_arena_websocket(websocket: WebSocket, state: AppState) {
    let conn_id = RelayHub::generate_conn_id();
    tracing::info!(conn_id = %conn_id, "New arena WebSocket connection established");

    let (mut ws_sender, mut ws_receiver) = websocket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    state.relay.register(&conn_id, tx).await;

    // Spawn task to send messages to client
    let sender_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(e) = ws_sender.send(message).await {
                tracing::debug!(error = %e, "Failed to send WebSocket message");
                break;
            }
        }
    });

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(message) => handle_websocket_message(&state, &conn_id, message).await,
            Err(e) => {
                tracing::error!(conn_id = %conn_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Leave every duel room; the timer anchor survives for reconnects
    let left_topics = state.relay.disconnect(&conn_id).await;
    for topic in left_topics {
        if !topic.starts_with("user:") {
            state.lifecycle.leave(&topic, &conn_id).await;
        }
    }
    sender_task.abort();
    tracing::info!(conn_id = %conn_id, "Arena WebSocket connection closed");
}

async fn handle_websocket_message(state: &AppState, conn_id: &str, message: Message) {
    let Ok(text) = message.to_str() else {
        return;
    };

    match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => dispatch(state, conn_id, event).await,
        Err(e) => {
            tracing::warn!(
                conn_id = %conn_id,
                error = %e,
                raw_message = %text,
                "Dropping malformed arena event"
            );
        }
    }
}

async fn dispatch(state: &AppState, conn_id: &str, event: ClientEvent) {
    match event {
        ClientEvent::JoinDuel {
            duel_id,
            peer_id,
            role,
        } => {
            let role = role.unwrap_or(ParticipantRole::Active);
            if let Err(e) = state.lifecycle.join(&duel_id, conn_id, role, peer_id).await {
                tracing::warn!(conn_id = %conn_id, duel_id = %duel_id, error = %e, "Join rejected");
                state
                    .relay
                    .send_to(conn_id, &ServerEvent::Error { message: e.to_string() })
                    .await;
            }
        }

        ClientEvent::RegisterIdentity { identity } => {
            state.relay.set_identity(conn_id, &identity).await;
        }

        ClientEvent::CodeChange {
            identity,
            duel_id,
            code,
        } => {
            // Relayed room-wide; the viewer applies last-received per identity
            state
                .relay
                .publish(&duel_id, conn_id, &ServerEvent::CodeUpdate { identity, code })
                .await;
        }

        ClientEvent::RequestTimer { duel_id } => {
            state.lifecycle.request_timer(&duel_id, conn_id).await;
        }

        ClientEvent::TerminateDuel { duel_id } => {
            if let Err(e) = state.lifecycle.terminate(&duel_id, conn_id).await {
                tracing::error!(duel_id = %duel_id, error = %e, "Terminate failed");
            }
        }

        ClientEvent::SignalOffer {
            duel_id,
            target_peer_id,
            sdp,
        } => {
            // Watchers only ever answer; an offer from one is a protocol breach
            if state.relay.connection_role(conn_id).await == Some(ParticipantRole::Watcher) {
                tracing::warn!(conn_id = %conn_id, duel_id = %duel_id, "Dropping offer from watcher");
                return;
            }
            let Some(from_peer_id) = state.relay.connection_peer(conn_id).await else {
                tracing::warn!(conn_id = %conn_id, "Offer from connection with no peer id");
                return;
            };
            let from_identity = state.relay.connection_identity(conn_id).await;
            state
                .relay
                .send_to_peer(
                    &duel_id,
                    &target_peer_id,
                    &ServerEvent::SignalOffer {
                        from_peer_id,
                        from_identity,
                        sdp,
                    },
                )
                .await;
        }

        ClientEvent::SignalAnswer {
            duel_id,
            target_peer_id,
            sdp,
        } => {
            let Some(from_peer_id) = state.relay.connection_peer(conn_id).await else {
                return;
            };
            state
                .relay
                .send_to_peer(
                    &duel_id,
                    &target_peer_id,
                    &ServerEvent::SignalAnswer { from_peer_id, sdp },
                )
                .await;
        }

        ClientEvent::SignalCandidate {
            duel_id,
            target_peer_id,
            candidate,
            sdp_mid,
            sdp_mline_index,
        } => {
            let Some(from_peer_id) = state.relay.connection_peer(conn_id).await else {
                return;
            };
            state
                .relay
                .send_to_peer(
                    &duel_id,
                    &target_peer_id,
                    &ServerEvent::SignalCandidate {
                        from_peer_id,
                        candidate,
                        sdp_mid,
                        sdp_mline_index,
                    },
                )
                .await;
        }
    }
}
