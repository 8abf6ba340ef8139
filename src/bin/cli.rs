// Duel Arena CLI Validation Tool
// Validates arena server functionality through automated scenarios and interactive commands

use clap::{Parser, Subcommand};
use colored::*;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use std::io::{self, Write};
use tokio::time::{timeout, Duration};
use tokio_tungstenite::{connect_async, tungstenite::Message};

#[derive(Parser)]
#[command(name = "duel-cli")]
#[command(about = "Duel Arena CLI Validation Tool", long_about = None)]
struct Cli {
    /// Server address (default: 127.0.0.1:5000)
    #[arg(short, long, default_value = "127.0.0.1:5000")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server health endpoint
    Health,

    /// Test WebSocket connection
    Connect,

    /// Create a duel (requires an API token)
    CreateDuel {
        /// Bearer token of the challenger
        #[arg(short, long)]
        token: String,

        /// Opponent identity (email-shaped)
        #[arg(short, long)]
        opponent: String,

        /// Difficulty: easy, medium or hard
        #[arg(short, long, default_value = "easy")]
        difficulty: String,
    },

    /// Join a duel room and stream events
    Join {
        /// Duel ID to join
        #[arg(short, long)]
        duel_id: String,

        /// Peer ID to announce (optional)
        #[arg(short, long)]
        peer_id: Option<String>,

        /// Join as a spectator instead of an active participant
        #[arg(short, long)]
        watch: bool,
    },

    /// Submit code for judging
    Submit {
        /// Bearer token of the submitter
        #[arg(short, long)]
        token: String,

        /// Duel ID
        #[arg(short, long)]
        duel_id: String,

        /// Path to the source file
        #[arg(short, long)]
        file: String,

        /// Language: python, javascript, cpp or java
        #[arg(short, long, default_value = "python")]
        language: String,
    },

    /// Run automated validation scenarios
    Validate {
        /// Run all validation tests
        #[arg(short, long)]
        all: bool,

        /// Test specific scenario
        #[arg(long)]
        scenario: Option<String>,

        /// Challenger token for the duel-flow scenario
        #[arg(long)]
        token: Option<String>,

        /// Opponent identity for the duel-flow scenario
        #[arg(long)]
        opponent: Option<String>,
    },

    /// Interactive mode - send custom events
    Interactive,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Health => {
            check_health(&cli.server).await;
        }
        Commands::Connect => {
            test_connection(&cli.server).await;
        }
        Commands::CreateDuel {
            token,
            opponent,
            difficulty,
        } => {
            create_duel(&cli.server, token, opponent, difficulty).await;
        }
        Commands::Join {
            duel_id,
            peer_id,
            watch,
        } => {
            join_duel(&cli.server, duel_id, peer_id.as_deref(), *watch).await;
        }
        Commands::Submit {
            token,
            duel_id,
            file,
            language,
        } => {
            submit_code(&cli.server, token, duel_id, file, language).await;
        }
        Commands::Validate {
            all,
            scenario,
            token,
            opponent,
        } => {
            if *all {
                run_all_validations(&cli.server, token.as_deref(), opponent.as_deref()).await;
            } else if let Some(s) = scenario {
                run_scenario(&cli.server, s, token.as_deref(), opponent.as_deref()).await;
            } else {
                println!("{}", "Use --all or --scenario <name>".yellow());
                list_scenarios();
            }
        }
        Commands::Interactive => {
            interactive_mode(&cli.server).await;
        }
    }
}

async fn check_health(server: &str) {
    println!("{}", "Checking server health...".cyan());

    let url = format!("http://{}/api/health", server);
    let client = reqwest::Client::new();

    match client.get(&url).send().await {
        Ok(resp) => {
            let status = resp.status();
            if status.is_success() {
                println!("{} Health check passed", "✓".green());

                if let Ok(body) = resp.json::<serde_json::Value>().await {
                    println!("  Status: {}", body["status"].as_str().unwrap_or("unknown"));
                    println!("  Service: {}", body["service"].as_str().unwrap_or("unknown"));
                    println!("  Version: {}", body["version"].as_str().unwrap_or("unknown"));
                }
            } else {
                println!("{} Health check failed: {}", "✗".red(), status);
            }
        }
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
            println!("  Make sure the server is running on {}", server);
        }
    }
}

async fn test_connection(server: &str) {
    println!("{}", "Testing WebSocket connection...".cyan());

    let url = format!("ws://{}/arena", server);

    match connect_async(&url).await {
        Ok((ws_stream, _)) => {
            println!("{} WebSocket connection established", "✓".green());
            println!("  URL: {}", url);
            drop(ws_stream);
            println!("{} Connection closed cleanly", "✓".green());
        }
        Err(e) => {
            println!("{} WebSocket connection failed: {}", "✗".red(), e);
        }
    }
}

async fn create_duel(server: &str, token: &str, opponent: &str, difficulty: &str) {
    println!("{}", "Creating duel...".cyan());
    println!("  Opponent: {}", opponent);
    println!("  Difficulty: {}", difficulty);

    let url = format!("http://{}/api/duel/create", server);
    let client = reqwest::Client::new();

    let response = client
        .post(&url)
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "opponentIdentity": opponent, "difficulty": difficulty }))
        .send()
        .await;

    match response {
        Ok(resp) => {
            let status = resp.status();
            let body = resp
                .json::<serde_json::Value>()
                .await
                .unwrap_or_else(|_| json!({}));
            if status.is_success() {
                let duel_id = body["duelId"].as_str().unwrap_or("unknown");
                println!("{} Duel created!", "✓".green());
                println!("\n{}", "═".repeat(50).green());
                println!("{} {}", "Duel ID:".bold(), duel_id.green().bold());
                println!("{}", "═".repeat(50).green());
            } else {
                println!(
                    "{} Create failed ({}): {}",
                    "✗".red(),
                    status,
                    body["message"].as_str().unwrap_or("unknown error")
                );
            }
        }
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
        }
    }
}

async fn join_duel(server: &str, duel_id: &str, peer_id: Option<&str>, watch: bool) {
    println!("{}", "Joining duel...".cyan());
    println!("  Duel ID: {}", duel_id);
    if watch {
        println!("  Role: watcher");
    }

    let url = format!("ws://{}/arena", server);

    match connect_async(&url).await {
        Ok((ws_stream, _)) => {
            let (mut write, mut read) = ws_stream.split();

            let mut msg = json!({ "type": "join-duel", "duelId": duel_id });
            if let Some(pid) = peer_id {
                msg["peerId"] = json!(pid);
            }
            if watch {
                msg["role"] = json!("watcher");
            }

            if write.send(Message::Text(msg.to_string())).await.is_err() {
                println!("{} Failed to send join-duel event", "✗".red());
                return;
            }

            println!("{} join-duel sent, streaming events...", "✓".green());
            println!("Press {} to disconnect.\n", "Ctrl+C".bold());

            while let Some(Ok(message)) = read.next().await {
                if let Message::Text(text) = message {
                    println!("{} {}", "◀".green(), text.bright_white());
                }
            }
            println!("{} Connection closed", "✗".yellow());
        }
        Err(e) => {
            println!("{} Cannot connect: {}", "✗".red(), e);
        }
    }
}

async fn submit_code(server: &str, token: &str, duel_id: &str, file: &str, language: &str) {
    let source = match std::fs::read_to_string(file) {
        Ok(source) => source,
        Err(e) => {
            println!("{} Cannot read {}: {}", "✗".red(), file, e);
            return;
        }
    };

    println!("{}", "Submitting code for judging...".cyan());
    println!("  Duel ID: {}", duel_id);
    println!("  Language: {}", language);

    let url = format!("http://{}/api/duel/submit", server);
    let client = reqwest::Client::new();

    let response = client
        .post(&url)
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "duelId": duel_id, "code": source, "language": language }))
        .send()
        .await;

    match response {
        Ok(resp) => {
            let status = resp.status();
            let body = resp
                .json::<serde_json::Value>()
                .await
                .unwrap_or_else(|_| json!({}));
            if status.is_success() {
                match body["status"].as_str() {
                    Some("accepted") => {
                        println!(
                            "{} Accepted! Winner: {}",
                            "✓".green().bold(),
                            body["winner"].as_str().unwrap_or("unknown").green()
                        );
                    }
                    Some("already-decided") => {
                        println!("{} Correct, but the duel was already decided", "○".yellow());
                    }
                    Some("rejected") => {
                        println!("{} Rejected", "✗".red());
                        println!("  Produced: {}", body["produced"].as_str().unwrap_or(""));
                        println!("  Expected: {}", body["expected"].as_str().unwrap_or(""));
                    }
                    other => {
                        println!(
                            "{} {}: {}",
                            "✗".yellow(),
                            other.unwrap_or("unknown"),
                            body["message"].as_str().unwrap_or("")
                        );
                    }
                }
            } else {
                println!(
                    "{} Submit failed ({}): {}",
                    "✗".red(),
                    status,
                    body["message"].as_str().unwrap_or("unknown error")
                );
            }
        }
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
        }
    }
}

fn list_scenarios() {
    println!("\n{}", "Available Validation Scenarios:".bold());
    println!("  {} - Basic WebSocket connection test", "connection".cyan());
    println!("  {} - Health endpoint check", "health".cyan());
    println!("  {} - Join a nonexistent duel (error handling)", "invalid-duel".cyan());
    println!("  {} - Malformed event handling", "malformed-event".cyan());
    println!(
        "  {} - Full duel flow: create, join x2, timer sync, code relay, terminate",
        "duel-flow".cyan()
    );
    println!("\nduel-flow requires --token <challenger token> and --opponent <identity>.");
    println!("Example: duel-cli validate --scenario connection");
    println!("Example: duel-cli validate --scenario duel-flow --token tok-a --opponent b@x.com");
}

async fn run_scenario(server: &str, scenario: &str, token: Option<&str>, opponent: Option<&str>) {
    println!("\n{} {}", "Running scenario:".bold(), scenario.cyan());
    println!("{}", "─".repeat(60));

    let result = match scenario {
        "connection" => validate_connection(server).await,
        "health" => validate_health(server).await,
        "invalid-duel" => validate_invalid_duel(server).await,
        "malformed-event" => validate_malformed_event(server).await,
        "duel-flow" => match (token, opponent) {
            (Some(token), Some(opponent)) => validate_duel_flow(server, token, opponent).await,
            _ => {
                println!(
                    "{} duel-flow needs --token and --opponent",
                    "○".yellow()
                );
                false
            }
        },
        _ => {
            println!("{} Unknown scenario: {}", "✗".red(), scenario);
            list_scenarios();
            return;
        }
    };

    if result {
        println!("\n{} Scenario passed", "✓".green().bold());
    } else {
        println!("\n{} Scenario failed", "✗".red().bold());
    }
}

async fn run_all_validations(server: &str, token: Option<&str>, opponent: Option<&str>) {
    println!("\n{}", "Running All Validation Tests".bold().green());
    println!("{}\n", "═".repeat(60).green());

    let mut passed = 0;
    let mut failed = 0;
    let mut skipped = 0;

    for scenario in ["connection", "health", "invalid-duel", "malformed-event", "duel-flow"] {
        println!("\n{} Testing: {}", "▶".cyan(), scenario.bold());
        println!("{}", "─".repeat(60));

        let result = match scenario {
            "connection" => Some(validate_connection(server).await),
            "health" => Some(validate_health(server).await),
            "invalid-duel" => Some(validate_invalid_duel(server).await),
            "malformed-event" => Some(validate_malformed_event(server).await),
            "duel-flow" => match (token, opponent) {
                (Some(token), Some(opponent)) => {
                    Some(validate_duel_flow(server, token, opponent).await)
                }
                _ => {
                    println!("{} Skipped (needs --token and --opponent)", "○".yellow());
                    None
                }
            },
            _ => Some(false),
        };

        match result {
            Some(true) => passed += 1,
            Some(false) => failed += 1,
            None => skipped += 1,
        }
    }

    println!("\n{}", "═".repeat(60).green());
    println!("{}", "Validation Summary".bold());
    println!("{}", "═".repeat(60).green());
    println!("  {} Passed: {}", "✓".green(), passed.to_string().green());
    println!("  {} Failed: {}", "✗".red(), failed.to_string().red());
    if skipped > 0 {
        println!("  {} Skipped: {}", "○".yellow(), skipped.to_string().yellow());
    }
    println!("  Total: {}", passed + failed + skipped);

    if failed == 0 {
        println!("\n{}", "All validations passed!".green().bold());
    } else {
        println!("\n{}", "Some validations failed. Check output above.".yellow());
    }
}

async fn validate_connection(server: &str) -> bool {
    let url = format!("ws://{}/arena", server);

    match connect_async(&url).await {
        Ok((ws_stream, _)) => {
            println!("{} WebSocket connection successful", "✓".green());
            drop(ws_stream);
            true
        }
        Err(e) => {
            println!("{} Connection failed: {}", "✗".red(), e);
            false
        }
    }
}

async fn validate_health(server: &str) -> bool {
    let url = format!("http://{}/api/health", server);
    let client = reqwest::Client::new();

    match client.get(&url).send().await {
        Ok(resp) if resp.status().is_success() => {
            println!("{} Health endpoint responded", "✓".green());
            true
        }
        Ok(resp) => {
            println!("{} Health endpoint returned {}", "✗".red(), resp.status());
            false
        }
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
            false
        }
    }
}

async fn validate_invalid_duel(server: &str) -> bool {
    println!("  Joining a nonexistent duel...");

    let url = format!("ws://{}/arena", server);

    match connect_async(&url).await {
        Ok((ws_stream, _)) => {
            let (mut write, mut read) = ws_stream.split();

            let msg = json!({ "type": "join-duel", "duelId": "no-such-duel" });
            if write.send(Message::Text(msg.to_string())).await.is_err() {
                println!("{} Failed to send event", "✗".red());
                return false;
            }

            match timeout(Duration::from_secs(3), read.next()).await {
                Ok(Some(Ok(Message::Text(text)))) => {
                    if let Ok(response) = serde_json::from_str::<serde_json::Value>(&text) {
                        if response["type"] == "error" {
                            println!("{} Server rejected the join gracefully", "✓".green());
                            return true;
                        }
                    }
                    println!("{} Unexpected response: {}", "✗".yellow(), text);
                    false
                }
                _ => {
                    println!("{} No response received", "✗".red());
                    false
                }
            }
        }
        Err(e) => {
            println!("{} Connection failed: {}", "✗".red(), e);
            false
        }
    }
}

async fn validate_malformed_event(server: &str) -> bool {
    println!("  Sending malformed JSON...");

    let url = format!("ws://{}/arena", server);

    match connect_async(&url).await {
        Ok((ws_stream, _)) => {
            let (mut write, mut read) = ws_stream.split();

            if write
                .send(Message::Text("this is not json".to_string()))
                .await
                .is_err()
            {
                println!("{} Failed to send", "✗".red());
                return false;
            }

            // The connection must survive; a second well-formed event still errors politely
            let msg = json!({ "type": "join-duel", "duelId": "no-such-duel" });
            if write.send(Message::Text(msg.to_string())).await.is_err() {
                println!("{} Connection died after malformed event", "✗".red());
                return false;
            }

            match timeout(Duration::from_secs(3), read.next()).await {
                Ok(Some(Ok(Message::Text(_)))) => {
                    println!("{} Connection survived malformed input", "✓".green());
                    true
                }
                _ => {
                    println!("{} No response after malformed event", "✗".red());
                    false
                }
            }
        }
        Err(e) => {
            println!("{} Connection failed: {}", "✗".red(), e);
            false
        }
    }
}

async fn validate_duel_flow(server: &str, token: &str, opponent: &str) -> bool {
    println!("  Step 1: Creating duel...");

    let client = reqwest::Client::new();
    let create_url = format!("http://{}/api/duel/create", server);

    let duel_id = match client
        .post(&create_url)
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "opponentIdentity": opponent, "difficulty": "easy" }))
        .send()
        .await
    {
        Ok(resp) if resp.status().is_success() => {
            let body = resp
                .json::<serde_json::Value>()
                .await
                .unwrap_or_else(|_| json!({}));
            match body["duelId"].as_str() {
                Some(id) => {
                    println!("  {} Duel created: {}", "✓".green(), id);
                    id.to_string()
                }
                None => {
                    println!("{} Create response missing duelId", "✗".red());
                    return false;
                }
            }
        }
        Ok(resp) => {
            println!("{} Create failed: {}", "✗".red(), resp.status());
            return false;
        }
        Err(e) => {
            println!("{} Cannot connect: {}", "✗".red(), e);
            return false;
        }
    };

    println!("  Step 2: Both participants joining...");

    let ws_url = format!("ws://{}/arena", server);
    let (ws_a, _) = match connect_async(&ws_url).await {
        Ok(conn) => conn,
        Err(e) => {
            println!("{} Challenger connection failed: {}", "✗".red(), e);
            return false;
        }
    };
    let (ws_b, _) = match connect_async(&ws_url).await {
        Ok(conn) => conn,
        Err(e) => {
            println!("{} Opponent connection failed: {}", "✗".red(), e);
            return false;
        }
    };

    let (mut write_a, mut read_a) = ws_a.split();
    let (mut write_b, mut read_b) = ws_b.split();

    let join_a = json!({ "type": "join-duel", "duelId": duel_id, "peerId": "cli-peer-a" });
    let join_b = json!({ "type": "join-duel", "duelId": duel_id, "peerId": "cli-peer-b" });

    if write_a.send(Message::Text(join_a.to_string())).await.is_err()
        || write_b.send(Message::Text(join_b.to_string())).await.is_err()
    {
        println!("{} Failed to send join events", "✗".red());
        return false;
    }

    let timer_a = wait_for_event(&mut read_a, "start-timer").await;
    let timer_b = wait_for_event(&mut read_b, "start-timer").await;

    match (timer_a, timer_b) {
        (Some(a), Some(b)) if a["startTime"] == b["startTime"] => {
            println!(
                "  {} Both participants share one timer anchor ({})",
                "✓".green(),
                a["startTime"]
            );
        }
        (Some(_), Some(_)) => {
            println!("{} Timer anchors differ between participants", "✗".red());
            return false;
        }
        _ => {
            println!("{} start-timer not received by both participants", "✗".red());
            return false;
        }
    }

    println!("  Step 3: Relaying a code change...");

    let change = json!({
        "type": "code-change",
        "identity": "cli-challenger",
        "duelId": duel_id,
        "code": "print('hello')"
    });
    if write_a.send(Message::Text(change.to_string())).await.is_err() {
        println!("{} Failed to send code-change", "✗".red());
        return false;
    }

    match wait_for_event(&mut read_b, "code-update").await {
        Some(update) if update["code"] == "print('hello')" => {
            println!("  {} Opponent received the code update", "✓".green());
        }
        _ => {
            println!("{} code-update not relayed", "✗".red());
            return false;
        }
    }

    println!("  Step 4: Terminating (twice, second must be silent)...");

    let terminate = json!({ "type": "terminate-duel", "duelId": duel_id });
    if write_a.send(Message::Text(terminate.to_string())).await.is_err() {
        println!("{} Failed to send terminate-duel", "✗".red());
        return false;
    }

    if wait_for_event(&mut read_b, "duel-terminated").await.is_none() {
        println!("{} duel-terminated not broadcast", "✗".red());
        return false;
    }
    println!("  {} Termination broadcast received", "✓".green());

    let _ = write_a.send(Message::Text(terminate.to_string())).await;
    match timeout(Duration::from_secs(2), read_b.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => {
            println!("{} Unexpected second broadcast: {}", "✗".red(), text);
            false
        }
        _ => {
            println!("  {} Second terminate was a silent no-op", "✓".green());
            true
        }
    }
}

async fn wait_for_event(
    read: &mut (impl futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
              + Unpin),
    event_type: &str,
) -> Option<serde_json::Value> {
    loop {
        match timeout(Duration::from_secs(5), read.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => {
                if let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) {
                    if value["type"] == event_type {
                        return Some(value);
                    }
                }
            }
            Ok(Some(Ok(_))) => continue,
            _ => return None,
        }
    }
}

async fn interactive_mode(server: &str) {
    println!("\n{}", "Interactive Mode".bold().green());
    println!("{}", "═".repeat(60).green());
    println!("Type {} for help, {} to quit\n", "help".cyan(), "quit".cyan());

    let url = format!("ws://{}/arena", server);

    match connect_async(&url).await {
        Ok((ws_stream, _)) => {
            println!("{} Connected to server", "✓".green());

            let (mut write, mut read) = ws_stream.split();

            // Spawn task to receive events
            let receive_task = tokio::spawn(async move {
                while let Some(Ok(msg)) = read.next().await {
                    if let Message::Text(text) = msg {
                        println!("\n{} {}", "◀".green(), text.bright_white());
                    }
                }
            });

            loop {
                print!("{} ", "►".cyan());
                io::stdout().flush().unwrap();

                let mut input = String::new();
                if io::stdin().read_line(&mut input).is_err() {
                    break;
                }

                let input = input.trim();

                if input.is_empty() {
                    continue;
                }

                if input == "quit" || input == "exit" {
                    println!("Goodbye!");
                    break;
                }

                if input == "help" {
                    print_interactive_help();
                    continue;
                }

                if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(input) {
                    if write.send(Message::Text(parsed.to_string())).await.is_ok() {
                        println!("{} Event sent", "✓".green());
                    } else {
                        println!("{} Failed to send event", "✗".red());
                        break;
                    }
                } else {
                    println!("{} Invalid JSON. Type 'help' for examples.", "✗".yellow());
                }
            }

            receive_task.abort();
        }
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
        }
    }
}

fn print_interactive_help() {
    println!("\n{}", "Interactive Mode Commands".bold());
    println!("{}", "─".repeat(60));
    println!("Send JSON events directly to the server.\n");

    println!("{}", "Example Events:".bold());
    println!("\n{}:", "Join Duel".cyan());
    println!(r#"  {{"type":"join-duel","duelId":"abc123","peerId":"peer-1"}}"#);

    println!("\n{}:", "Join as Watcher".cyan());
    println!(r#"  {{"type":"join-duel","duelId":"abc123","peerId":"peer-w","role":"watcher"}}"#);

    println!("\n{}:", "Register Identity".cyan());
    println!(r#"  {{"type":"register-identity","identity":"a@x.com"}}"#);

    println!("\n{}:", "Code Change".cyan());
    println!(r#"  {{"type":"code-change","identity":"a@x.com","duelId":"abc123","code":"fn main() {{}}"}}"#);

    println!("\n{}:", "Request Timer".cyan());
    println!(r#"  {{"type":"request-timer","duelId":"abc123"}}"#);

    println!("\n{}:", "Terminate Duel".cyan());
    println!(r#"  {{"type":"terminate-duel","duelId":"abc123"}}"#);

    println!("\n{}: quit, exit", "Commands".bold());
    println!();
}
