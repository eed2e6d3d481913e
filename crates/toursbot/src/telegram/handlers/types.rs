//! Handler types, dependencies, and shared gating helpers

use std::sync::Arc;

use alloy_primitives::Address;
use teloxide::prelude::*;
use teloxide::types::Message;

use tourscore::chain::{ChainGateway, PreparedTx, Sequencer};
use tourscore::config;
use tourscore::core::rate_limiter::RateLimiter;
use tourscore::core::validation::parse_address;
use tourscore::storage::db::{self, create_user, SessionState};
use tourscore::storage::get_connection;
use tourscore::{AppError, AppResult};

use crate::telegram::html::{escape, send_html};
use crate::telegram::Bot;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub db_pool: Arc<db::DbPool>,
    pub gateway: Arc<dyn ChainGateway>,
    pub sequencer: Arc<Sequencer>,
    pub rate_limiter: Arc<RateLimiter>,
}

/// User info extracted from a message
#[derive(Clone)]
pub struct UserInfo {
    pub chat_id: i64,
    pub username: Option<String>,
}

impl UserInfo {
    /// Extract user info from a Telegram message
    pub fn from_message(msg: &Message) -> Self {
        Self {
            chat_id: msg.chat.id.0,
            username: msg.from.as_ref().and_then(|u| u.username.clone()),
        }
    }
}

/// Ensures a user row exists, refreshing the username as a side effect.
pub fn ensure_user_exists(deps: &HandlerDeps, user: &UserInfo) {
    let Ok(conn) = get_connection(&deps.db_pool) else {
        log::error!("Failed to get DB connection while registering user {}", user.chat_id);
        return;
    };
    if let Err(e) = create_user(&conn, user.chat_id, user.username.clone()) {
        log::error!("Failed to upsert user {}: {}", user.chat_id, e);
    }
}

/// Gate: the user's application must be approved.
pub fn require_approved(conn: &rusqlite::Connection, user_id: i64) -> AppResult<()> {
    if db::is_approved(conn, user_id)? {
        Ok(())
    } else {
        Err(AppError::Validation(
            "your application is not approved yet — see /status, or /apply first".into(),
        ))
    }
}

/// Gate: a live wallet session must exist. Returns the wallet address.
pub fn require_wallet(conn: &rusqlite::Connection, user_id: i64) -> AppResult<Address> {
    match db::get_session_state(conn, user_id, config::session::ttl())? {
        SessionState::Active(session) => parse_address(&session.wallet_address),
        SessionState::Expired(_) => Err(AppError::Session(
            "your wallet session expired — reconnect with /connectwallet".into(),
        )),
        SessionState::Missing => Err(AppError::Session(
            "no wallet connected — use /connectwallet first".into(),
        )),
    }
}

/// Gate: per-user cooldown for transaction-building commands.
pub async fn check_rate_limit(deps: &HandlerDeps, user_id: i64) -> AppResult<()> {
    if deps.rate_limiter.is_rate_limited(user_id).await {
        let remaining = deps
            .rate_limiter
            .get_remaining_time(user_id)
            .await
            .map(|d| d.as_secs())
            .unwrap_or(0);
        return Err(AppError::Validation(format!(
            "easy there — wait {}s before building another transaction",
            remaining.max(1)
        )));
    }
    Ok(())
}

/// Hand a freshly built unsigned transaction to the user for signing.
pub async fn send_prepared(bot: &Bot, chat_id: ChatId, user_id: i64, prepared: &PreparedTx) -> ResponseResult<()> {
    let step_note = if prepared.two_phase {
        "\n\nThis is step 1 of 2: once the approval confirms, I will send the follow-up transaction automatically."
    } else {
        ""
    };

    let text = format!(
        "🧾 Transaction ready: {}\n\n\
         Sign it with your wallet:\n{}?uid={}\n\n\
         <pre>{}</pre>\n\
         The signer relays the hash back automatically once you confirm.{}",
        escape(&prepared.description),
        config::SIGNER_URL.as_str(),
        user_id,
        escape(&prepared.unsigned.to_json()),
        step_note,
    );

    send_html(bot, chat_id, text).await?;
    Ok(())
}
