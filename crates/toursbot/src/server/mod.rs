//! HTTP server for the external signer: wallet submission and signed-tx
//! relay, plus health and metrics.
//!
//! Runs on WEB_PORT. In webhook mode the Telegram webhook router is merged
//! into the same server by the runner.

pub mod relay;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use teloxide::prelude::*;
use tokio::net::TcpListener;

use tourscore::core::metrics;
use tourscore::core::validation::{parse_address, parse_tx_hash};
use tourscore::storage::db::upsert_session;
use tourscore::storage::{get_connection, pending};

use crate::telegram::html::send_html;
use crate::telegram::notifications::broadcast_group;
use crate::telegram::Bot;

use relay::{process_submission, RelayContext, RelayOutcome};

/// Shared state for the API server.
#[derive(Clone)]
pub struct ApiState {
    pub bot: Bot,
    pub relay: Arc<RelayContext>,
}

/// Build the API router. The webhook runner merges this with the Telegram
/// webhook router; in polling mode it is served on its own.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/wallet", post(wallet_handler))
        .route("/tx", post(tx_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Serve the API router on its own listener (polling mode).
pub async fn run_server(port: u16, state: ApiState) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router(state);

    log::info!("Starting API server on http://{}", addr);
    log::info!("  POST /wallet  - wallet submission");
    log::info!("  POST /tx      - signed-tx relay");
    log::info!("  GET  /health  - health check");
    log::info!("  GET  /metrics - prometheus metrics");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Deserialize)]
struct WalletSubmission {
    user_id: i64,
    address: String,
}

#[derive(Deserialize)]
struct TxSubmission {
    user_id: i64,
    tx_hash: String,
}

fn bad_request(msg: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
}

/// POST /wallet — the signer page submits the connected wallet address.
async fn wallet_handler(State(state): State<ApiState>, Json(body): Json<WalletSubmission>) -> Response {
    let address = match parse_address(&body.address) {
        Ok(addr) => addr,
        Err(e) => return bad_request(e.to_string()),
    };

    let conn = match get_connection(&state.relay.db_pool) {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("DB unavailable for wallet submission: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "storage" }))).into_response();
        }
    };
    if let Err(e) = upsert_session(&conn, body.user_id, &format!("{:?}", address)) {
        log::error!("Failed to store session for {}: {}", body.user_id, e);
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "storage" }))).into_response();
    }

    log::info!("Wallet {:?} connected for user {}", address, body.user_id);

    // Confirm over Telegram out of band
    let bot = state.bot.clone();
    let user_id = body.user_id;
    tokio::spawn(async move {
        let text = format!(
            "🔗 Wallet connected: <code>{:?}</code>\nYou are set — try /balance.",
            address
        );
        if let Err(e) = send_html(&bot, ChatId(user_id), text).await {
            log::warn!("Could not confirm wallet connect to {}: {}", user_id, e);
        }
    });

    Json(json!({ "ok": true })).into_response()
}

/// POST /tx — the signer relays the signed transaction hash. Processing
/// (receipt polling, notifications, the follow-up step) happens in a
/// background task; the signer gets a 202 immediately.
async fn tx_handler(State(state): State<ApiState>, Json(body): Json<TxSubmission>) -> Response {
    let hash = match parse_tx_hash(&body.tx_hash) {
        Ok(hash) => hash,
        Err(e) => return bad_request(e.to_string()),
    };

    // Cheap existence check so a stray submission gets a proper 404
    match get_connection(&state.relay.db_pool).and_then(|conn| pending::latest_unsubmitted(&conn, body.user_id)) {
        Ok(Some(_)) => {}
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "no pending transaction awaiting a signature" })),
            )
                .into_response();
        }
        Err(e) => {
            log::error!("DB unavailable for tx submission: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "storage" }))).into_response();
        }
    }

    let bot = state.bot.clone();
    let relay = state.relay.clone();
    let user_id = body.user_id;
    tokio::spawn(async move {
        match process_submission(&relay, user_id, hash).await {
            Ok(outcome) => deliver_outcome(&bot, user_id, outcome).await,
            Err(e) => {
                log::error!("Relay failed for user {}: {}", user_id, e);
                let _ = bot
                    .send_message(ChatId(user_id), format!("⚠️ {}", e))
                    .await;
            }
        }
    });

    (StatusCode::ACCEPTED, Json(json!({ "ok": true, "status": "processing" }))).into_response()
}

/// Push a relay outcome out over Telegram.
pub async fn deliver_outcome(bot: &Bot, user_id: i64, outcome: RelayOutcome) {
    let chat_id = ChatId(user_id);
    if let Err(e) = send_html(bot, chat_id, outcome.user_text).await {
        log::error!("Could not deliver relay outcome to {}: {}", user_id, e);
    }
    if let Some(group_text) = outcome.group_text {
        broadcast_group(bot, &group_text).await;
    }
    if let Some(prepared) = outcome.follow_up {
        if let Err(e) = crate::telegram::handlers::types::send_prepared(bot, chat_id, user_id, &prepared).await {
            log::error!("Could not deliver follow-up tx to {}: {}", user_id, e);
        }
    }
}

/// GET /health — simple health check.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// GET /metrics — prometheus text format.
async fn metrics_handler() -> impl IntoResponse {
    (StatusCode::OK, metrics::gather())
}
