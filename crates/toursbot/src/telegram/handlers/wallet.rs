//! Wallet, profile, journal, and token commands.

use chrono::Utc;
use teloxide::prelude::*;

use tourscore::chain::units::{format_tours, format_units, parse_units};
use tourscore::chain::ActionIntent;
use tourscore::config;
use tourscore::core::metrics;
use tourscore::core::validation::clean_text;
use tourscore::storage::db::{self, SessionState};
use tourscore::storage::{get_connection, market};
use tourscore::AppResult;

use crate::telegram::html::{escape, send_html};
use crate::telegram::Bot;

use super::types::{check_rate_limit, require_approved, require_wallet, send_prepared, HandlerDeps};

/// /connectwallet — hand out the connect link; the signer page POSTs the
/// address back to /wallet.
pub async fn handle_connect_wallet_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> AppResult<()> {
    metrics::COMMANDS_TOTAL.with_label_values(&["connectwallet"]).inc();
    let user_id = msg.chat.id.0;
    let conn = get_connection(&deps.db_pool)?;
    require_approved(&conn, user_id)?;

    let text = format!(
        "🔗 Open this link and connect your wallet:\n{}?uid={}&action=connect\n\n\
         Sessions last {} hours; reconnect any time to refresh.",
        config::SIGNER_URL.as_str(),
        user_id,
        config::session::TTL_SECS / 3600,
    );
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

/// /wallet — show the connected wallet and how long the session lasts.
pub async fn handle_wallet_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> AppResult<()> {
    metrics::COMMANDS_TOTAL.with_label_values(&["wallet"]).inc();
    let conn = get_connection(&deps.db_pool)?;

    let text = match db::get_session_state(&conn, msg.chat.id.0, config::session::ttl())? {
        SessionState::Missing => "No wallet connected. Use /connectwallet.".to_string(),
        SessionState::Expired(s) => format!(
            "Session for <code>{}</code> expired. Reconnect with /connectwallet.",
            escape(&s.wallet_address)
        ),
        SessionState::Active(s) => {
            let remaining_secs =
                (s.connected_at + config::session::TTL_SECS as i64).saturating_sub(Utc::now().timestamp());
            format!(
                "Connected wallet: <code>{}</code>\nSession valid for another {}h {}m.",
                escape(&s.wallet_address),
                remaining_secs / 3600,
                (remaining_secs % 3600) / 60
            )
        }
    };
    send_html(bot, msg.chat.id, text).await?;
    Ok(())
}

/// /balance — native + TOURS balances and the current allowance.
pub async fn handle_balance_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> AppResult<()> {
    metrics::COMMANDS_TOTAL.with_label_values(&["balance"]).inc();
    let user_id = msg.chat.id.0;
    let conn = get_connection(&deps.db_pool)?;
    require_approved(&conn, user_id)?;
    let wallet = require_wallet(&conn, user_id)?;

    let native = deps.gateway.native_balance(wallet).await?;
    let tours = deps.gateway.token_balance(wallet).await?;
    let allowance = deps.gateway.allowance(wallet).await?;

    send_html(
        bot,
        msg.chat.id,
        format!(
            "💰 <code>{}</code>\n\nNative: {}\nTOURS: {}\nContract allowance: {}",
            escape(&format!("{:?}", wallet)),
            format_units(native),
            format_tours(tours),
            format_tours(allowance),
        ),
    )
    .await?;
    Ok(())
}

/// /createprofile Name
pub async fn handle_create_profile_command(bot: &Bot, msg: &Message, deps: &HandlerDeps, args: &str) -> AppResult<()> {
    metrics::COMMANDS_TOTAL.with_label_values(&["createprofile"]).inc();
    let user_id = msg.chat.id.0;
    let conn = get_connection(&deps.db_pool)?;
    require_approved(&conn, user_id)?;
    let wallet = require_wallet(&conn, user_id)?;
    check_rate_limit(deps, user_id).await?;

    let name = clean_text(args, "profile name", 64)?;
    let prepared = deps
        .sequencer
        .prepare(&conn, user_id, wallet, ActionIntent::CreateProfile { name })
        .await?;

    deps.rate_limiter.update_rate_limit(user_id).await;
    send_prepared(bot, msg.chat.id, user_id, &prepared).await?;
    Ok(())
}

/// /journal text
pub async fn handle_journal_command(bot: &Bot, msg: &Message, deps: &HandlerDeps, args: &str) -> AppResult<()> {
    metrics::COMMANDS_TOTAL.with_label_values(&["journal"]).inc();
    let user_id = msg.chat.id.0;
    let conn = get_connection(&deps.db_pool)?;
    require_approved(&conn, user_id)?;
    let wallet = require_wallet(&conn, user_id)?;
    check_rate_limit(deps, user_id).await?;

    let content = clean_text(args, "journal entry", 280)?;
    let prepared = deps
        .sequencer
        .prepare(&conn, user_id, wallet, ActionIntent::JournalEntry { content })
        .await?;

    deps.rate_limiter.update_rate_limit(user_id).await;
    send_prepared(bot, msg.chat.id, user_id, &prepared).await?;
    Ok(())
}

/// /journalentries — the user's recent entries from the cache (off-chain read)
pub async fn handle_journal_entries_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> AppResult<()> {
    let conn = get_connection(&deps.db_pool)?;
    let entries = market::list_journal_entries(&conn, msg.chat.id.0, 10)?;
    if entries.is_empty() {
        bot.send_message(msg.chat.id, "No journal entries yet. Write one with /journal.")
            .await?;
        return Ok(());
    }
    let mut lines = vec!["📓 Your recent entries:".to_string()];
    for entry in entries {
        lines.push(format!("• {} — {}", entry.created_at, entry.content));
    }
    bot.send_message(msg.chat.id, lines.join("\n")).await?;
    Ok(())
}

/// /buytokens <native amount>
pub async fn handle_buy_tokens_command(bot: &Bot, msg: &Message, deps: &HandlerDeps, args: &str) -> AppResult<()> {
    metrics::COMMANDS_TOTAL.with_label_values(&["buytokens"]).inc();
    let user_id = msg.chat.id.0;
    let conn = get_connection(&deps.db_pool)?;
    require_approved(&conn, user_id)?;
    let wallet = require_wallet(&conn, user_id)?;
    check_rate_limit(deps, user_id).await?;

    if args.trim().is_empty() {
        bot.send_message(msg.chat.id, "Usage: /buytokens <native amount>, e.g. /buytokens 0.5")
            .await?;
        return Ok(());
    }
    let value = parse_units(args)?;

    let prepared = deps
        .sequencer
        .prepare(&conn, user_id, wallet, ActionIntent::BuyTokens { value })
        .await?;

    deps.rate_limiter.update_rate_limit(user_id).await;
    send_prepared(bot, msg.chat.id, user_id, &prepared).await?;
    Ok(())
}
