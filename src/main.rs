mod api;
mod arena;
mod config;
mod error;
mod judge;
mod store;

use warp::Filter;

use api::AppState;
use arena::{LifecycleManager, RelayHub, SessionDirectory};
use config::Config;
use judge::{ExecutionEngine, JudgeConfig, SubmissionJudge};
use store::{DuelStore, UserDirectory};

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let store = DuelStore::new();
    let users = UserDirectory::from_env();
    let sessions = SessionDirectory::new();
    let relay = RelayHub::new();
    let lifecycle = LifecycleManager::new(
        store.clone(),
        users.clone(),
        sessions,
        relay.clone(),
        config.duel.duration_ms,
    );
    let judge = SubmissionJudge::new(
        ExecutionEngine::new(JudgeConfig::from_env()),
        lifecycle.clone(),
        store.clone(),
    );

    let state = AppState {
        relay,
        lifecycle,
        judge,
        store,
        users,
    };

    let routes = api::arena_routes(state).recover(api::handle_rejection);

    let addr = config.bind_address();
    tracing::info!(port = addr.1, "Duel arena server listening");
    warp::serve(routes).run(addr).await;
}
