// Integration tests for the Duel Arena Server
// These tests verify end-to-end functionality including HTTP endpoints and WebSocket flows.
//
// They require a running server seeded with two users:
//   ARENA_API_TOKENS="tok-a=a@x.com,tok-b=b@x.com" cargo run --bin duel-server

use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::time::{timeout, Duration};
use tokio_tungstenite::{connect_async, tungstenite::Message};

const SERVER: &str = "127.0.0.1:5000";
const TOKEN_A: &str = "tok-a";
const TOKEN_B: &str = "tok-b";

async fn create_duel(difficulty: &str) -> String {
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("http://{}/api/duel/create", SERVER))
        .header("Authorization", format!("Bearer {}", TOKEN_A))
        .json(&json!({ "opponentIdentity": "b@x.com", "difficulty": difficulty }))
        .send()
        .await
        .expect("server not running; start it before integration tests");
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    body["duelId"].as_str().expect("duelId in response").to_string()
}

async fn next_event_of_type(
    read: &mut (impl futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
              + Unpin),
    event_type: &str,
) -> serde_json::Value {
    loop {
        match timeout(Duration::from_secs(5), read.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => {
                let value: serde_json::Value = serde_json::from_str(&text).unwrap();
                if value["type"] == event_type {
                    return value;
                }
            }
            Ok(Some(Ok(_))) => continue,
            other => panic!("waiting for {}: {:?}", event_type, other),
        }
    }
}

/// Test HTTP health check endpoint
#[tokio::test]
#[ignore] // Requires running server
async fn test_health_endpoint() {
    let client = reqwest::Client::new();
    let resp = client
        .get(format!("http://{}/api/health", SERVER))
        .send()
        .await
        .expect("server not running");

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "Duel Arena Server");
}

/// Missing credential on an authenticated route must be a 401
#[tokio::test]
#[ignore] // Requires running server
async fn test_create_without_credential_is_unauthorized() {
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("http://{}/api/duel/create", SERVER))
        .json(&json!({ "opponentIdentity": "b@x.com", "difficulty": "easy" }))
        .send()
        .await
        .expect("server not running");

    assert_eq!(resp.status(), 401);
}

/// Malformed opponent identity must be a 400 with a field error
#[tokio::test]
#[ignore] // Requires running server
async fn test_create_with_malformed_identity_is_rejected() {
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("http://{}/api/duel/create", SERVER))
        .header("Authorization", format!("Bearer {}", TOKEN_A))
        .json(&json!({ "opponentIdentity": "not-an-email", "difficulty": "easy" }))
        .send()
        .await
        .expect("server not running");

    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("not-an-email"));
}

/// Unknown duel lookups are 404s
#[tokio::test]
#[ignore] // Requires running server
async fn test_opponent_lookup_unknown_duel() {
    let client = reqwest::Client::new();
    let resp = client
        .get(format!("http://{}/api/duel/no-such-duel/opponent", SERVER))
        .send()
        .await
        .expect("server not running");

    assert_eq!(resp.status(), 404);
}

/// Spectator bootstrap: opponent identity is readable without credentials
#[tokio::test]
#[ignore] // Requires running server
async fn test_opponent_lookup() {
    let duel_id = create_duel("easy").await;

    let client = reqwest::Client::new();
    let resp = client
        .get(format!("http://{}/api/duel/{}/opponent", SERVER, duel_id))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["opponentIdentity"], "b@x.com");
}

/// Both participants must converge on one identical timer anchor, and a
/// reconnecting participant must observe the same anchor, not a fresh clock
#[tokio::test]
#[ignore] // Requires running server
async fn test_timer_sync_and_reconnect() {
    let duel_id = create_duel("easy").await;
    let ws_url = format!("ws://{}/arena", SERVER);

    let (ws_a, _) = connect_async(&ws_url).await.expect("connect a");
    let (ws_b, _) = connect_async(&ws_url).await.expect("connect b");
    let (mut write_a, mut read_a) = ws_a.split();
    let (mut write_b, mut read_b) = ws_b.split();

    write_a
        .send(Message::Text(
            json!({ "type": "join-duel", "duelId": duel_id, "peerId": "peer-a" }).to_string(),
        ))
        .await
        .unwrap();
    write_b
        .send(Message::Text(
            json!({ "type": "join-duel", "duelId": duel_id, "peerId": "peer-b" }).to_string(),
        ))
        .await
        .unwrap();

    let timer_a = next_event_of_type(&mut read_a, "start-timer").await;
    let timer_b = next_event_of_type(&mut read_b, "start-timer").await;
    assert_eq!(timer_a["startTime"], timer_b["startTime"]);
    assert_eq!(timer_a["durationMs"], timer_b["durationMs"]);

    // Opponent reconnects on a fresh socket; the anchor must be unchanged
    drop(write_b);
    drop(read_b);
    let (ws_b2, _) = connect_async(&ws_url).await.expect("reconnect b");
    let (mut write_b2, mut read_b2) = ws_b2.split();
    write_b2
        .send(Message::Text(
            json!({ "type": "join-duel", "duelId": duel_id, "peerId": "peer-b2" }).to_string(),
        ))
        .await
        .unwrap();

    let timer_b2 = next_event_of_type(&mut read_b2, "start-timer").await;
    assert_eq!(timer_b2["startTime"], timer_a["startTime"]);
}

/// Code changes relay to the other room members with the sender excluded
#[tokio::test]
#[ignore] // Requires running server
async fn test_code_relay() {
    let duel_id = create_duel("easy").await;
    let ws_url = format!("ws://{}/arena", SERVER);

    let (ws_a, _) = connect_async(&ws_url).await.unwrap();
    let (ws_b, _) = connect_async(&ws_url).await.unwrap();
    let (mut write_a, _read_a) = ws_a.split();
    let (mut write_b, mut read_b) = ws_b.split();

    write_a
        .send(Message::Text(
            json!({ "type": "join-duel", "duelId": duel_id }).to_string(),
        ))
        .await
        .unwrap();
    write_b
        .send(Message::Text(
            json!({ "type": "join-duel", "duelId": duel_id }).to_string(),
        ))
        .await
        .unwrap();
    next_event_of_type(&mut read_b, "start-timer").await;

    write_a
        .send(Message::Text(
            json!({
                "type": "code-change",
                "identity": "a@x.com",
                "duelId": duel_id,
                "code": "print('solution')"
            })
            .to_string(),
        ))
        .await
        .unwrap();

    let update = next_event_of_type(&mut read_b, "code-update").await;
    assert_eq!(update["identity"], "a@x.com");
    assert_eq!(update["code"], "print('solution')");
}

/// Termination broadcasts once; a repeat terminate is a silent no-op
#[tokio::test]
#[ignore] // Requires running server
async fn test_terminate_idempotent() {
    let duel_id = create_duel("easy").await;
    let ws_url = format!("ws://{}/arena", SERVER);

    let (ws_a, _) = connect_async(&ws_url).await.unwrap();
    let (ws_b, _) = connect_async(&ws_url).await.unwrap();
    let (mut write_a, _read_a) = ws_a.split();
    let (mut write_b, mut read_b) = ws_b.split();

    write_a
        .send(Message::Text(
            json!({ "type": "join-duel", "duelId": duel_id }).to_string(),
        ))
        .await
        .unwrap();
    write_b
        .send(Message::Text(
            json!({ "type": "join-duel", "duelId": duel_id }).to_string(),
        ))
        .await
        .unwrap();
    next_event_of_type(&mut read_b, "start-timer").await;

    let terminate = json!({ "type": "terminate-duel", "duelId": duel_id }).to_string();
    write_a.send(Message::Text(terminate.clone())).await.unwrap();

    next_event_of_type(&mut read_b, "duel-terminated").await;

    // Second terminate: no duplicate broadcast arrives
    write_a.send(Message::Text(terminate)).await.unwrap();
    let extra = timeout(Duration::from_secs(2), read_b.next()).await;
    assert!(
        !matches!(extra, Ok(Some(Ok(Message::Text(_))))),
        "unexpected duplicate broadcast"
    );
}

/// End-to-end judging: the first correct submission wins, the second correct
/// submission observes "already decided", and the record carries one winner.
/// Requires the execution engine to be reachable from the server.
#[tokio::test]
#[ignore] // Requires running server and configured execution engine
async fn test_first_correct_submission_wins() {
    let duel_id = create_duel("easy").await;
    let client = reqwest::Client::new();

    // question_easy_1 is Two Sum with stdin "2 7 11 15\n9" and output "[0,1]"
    let solution = "print('[0, 1]')";

    let submit = |token: &'static str| {
        let client = client.clone();
        let duel_id = duel_id.clone();
        async move {
            client
                .post(format!("http://{}/api/duel/submit", SERVER))
                .header("Authorization", format!("Bearer {}", token))
                .json(&json!({ "duelId": duel_id, "code": solution, "language": "python" }))
                .send()
                .await
                .unwrap()
                .json::<serde_json::Value>()
                .await
                .unwrap()
        }
    };

    let first = submit(TOKEN_A).await;
    assert_eq!(first["status"], "accepted");
    assert_eq!(first["winner"], "a@x.com");

    let second = submit(TOKEN_B).await;
    assert_eq!(second["status"], "already-decided");
}

/// Unsupported language is rejected before any engine call
#[tokio::test]
#[ignore] // Requires running server
async fn test_unsupported_language_rejected() {
    let duel_id = create_duel("easy").await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("http://{}/api/duel/submit", SERVER))
        .header("Authorization", format!("Bearer {}", TOKEN_A))
        .json(&json!({ "duelId": duel_id, "code": "x", "language": "cobol" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
}
