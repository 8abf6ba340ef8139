use std::convert::Infallible;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use super::ws;
use crate::arena::{LifecycleManager, RelayHub};
use crate::error::DuelError;
use crate::judge::SubmissionJudge;
use crate::store::{DuelStore, UserDirectory};

/// Shared handles threaded through every route
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<RelayHub>,
    pub lifecycle: Arc<LifecycleManager>,
    pub judge: Arc<SubmissionJudge>,
    pub store: Arc<DuelStore>,
    pub users: Arc<UserDirectory>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateDuelRequest {
    opponent_identity: String,
    difficulty: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateDuelResponse {
    duel_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitRequest {
    duel_id: String,
    code: String,
    language: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OpponentResponse {
    opponent_identity: String,
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

/// All arena routes: WebSocket upgrade plus the HTTP request surface
pub fn arena_routes(
    state: AppState,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    arena_websocket_route(state.clone())
        .or(health_check())
        .or(create_duel(state.clone()))
        .or(submit_code(state.clone()))
        .or(ongoing_mine(state.clone()))
        .or(ongoing_all(state.clone()))
        .or(opponent_lookup(state))
}

fn arena_websocket_route(
    state: AppState,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("arena")
        .and(warp::ws())
        .and(with_state(state))
        .map(|upgrade: warp::ws::Ws, state: AppState| {
            upgrade.on_upgrade(move |websocket| ws::handle_arena_websocket(websocket, state))
        })
}

fn health_check() -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "health").and(warp::get()).map(|| {
        warp::reply::json(&serde_json::json!({
            "status": "healthy",
            "service": "Duel Arena Server",
            "version": "1.0.0"
        }))
    })
}

fn create_duel(
    state: AppState,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "duel" / "create")
        .and(warp::post())
        .and(with_auth(state.clone()))
        .and(warp::body::json())
        .and(with_state(state))
        .and_then(
            |identity: String, request: CreateDuelRequest, state: AppState| async move {
                let duel_id = state
                    .lifecycle
                    .create(&identity, &request.opponent_identity, &request.difficulty)
                    .await
                    .map_err(warp::reject::custom)?;
                Ok::<_, Rejection>(warp::reply::json(&CreateDuelResponse { duel_id }))
            },
        )
}

fn submit_code(
    state: AppState,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "duel" / "submit")
        .and(warp::post())
        .and(with_auth(state.clone()))
        .and(warp::body::json())
        .and(with_state(state))
        .and_then(
            |identity: String, request: SubmitRequest, state: AppState| async move {
                let report = state
                    .judge
                    .judge(&request.duel_id, &identity, &request.code, &request.language)
                    .await
                    .map_err(warp::reject::custom)?;
                Ok::<_, Rejection>(warp::reply::json(&report))
            },
        )
}

fn ongoing_mine(
    state: AppState,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "duel" / "ongoing" / "mine")
        .and(warp::get())
        .and(with_auth(state.clone()))
        .and(with_state(state))
        .and_then(|identity: String, state: AppState| async move {
            let duels = state.store.ongoing_for(&identity).await;
            Ok::<_, Rejection>(warp::reply::json(&duels))
        })
}

fn ongoing_all(
    state: AppState,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "duel" / "ongoing" / "all")
        .and(warp::get())
        .and(with_auth(state.clone()))
        .and(with_state(state))
        .and_then(|_identity: String, state: AppState| async move {
            let duels = state.store.ongoing().await;
            Ok::<_, Rejection>(warp::reply::json(&duels))
        })
}

/// Unauthenticated: spectators bootstrap their view from the opponent identity
fn opponent_lookup(
    state: AppState,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "duel" / String / "opponent")
        .and(warp::get())
        .and(with_state(state))
        .and_then(|duel_id: String, state: AppState| async move {
            let duel = state.store.get(&duel_id).await.ok_or_else(|| {
                warp::reject::custom(DuelError::not_found(format!("Duel {}", duel_id)))
            })?;
            Ok::<_, Rejection>(warp::reply::json(&OpponentResponse {
                opponent_identity: duel.opponent_identity,
            }))
        })
}

/// Resolve the bearer credential to an identity, or reject with 401
fn with_auth(
    state: AppState,
) -> impl Filter<Extract = (String,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(with_state(state))
        .and_then(|header: Option<String>, state: AppState| async move {
            let Some(header) = header else {
                return Err(warp::reject::custom(DuelError::Auth(
                    "missing credential".to_string(),
                )));
            };
            let token = header.strip_prefix("Bearer ").unwrap_or(&header);
            state
                .users
                .verify_token(token)
                .await
                .map_err(warp::reject::custom)
        })
}

fn with_state(
    state: AppState,
) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// Map rejections to the documented status classes with a JSON body
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (code, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not Found".to_string())
    } else if let Some(e) = err.find::<DuelError>() {
        (e.status_code(), e.to_string())
    } else if err
        .find::<warp::filters::body::BodyDeserializeError>()
        .is_some()
    {
        (StatusCode::BAD_REQUEST, "Malformed request body".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else {
        tracing::error!(rejection = ?err, "Unhandled rejection");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        )
    };

    let body = warp::reply::json(&ErrorBody { message });
    Ok(warp::reply::with_status(body, code))
}
