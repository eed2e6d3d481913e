//! General commands: onboarding, status, pending-transaction housekeeping,
//! and the hidden admin commands.

use chrono::Utc;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use tourscore::config;
use tourscore::core::metrics;
use tourscore::core::validation::clean_text;
use tourscore::storage::db::{self, AppStatus, SessionState};
use tourscore::storage::{get_connection, pending};
use tourscore::{AppError, AppResult};

use crate::telegram::bot::Command;
use crate::telegram::html::{escape, send_html};
use crate::telegram::notifications::{broadcast_group, notify_admin_new_application};
use crate::telegram::Bot;

use super::types::{ensure_user_exists, HandlerDeps, UserInfo};

pub async fn handle_start_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> AppResult<()> {
    ensure_user_exists(deps, &UserInfo::from_message(msg));
    metrics::COMMANDS_TOTAL.with_label_values(&["start"]).inc();

    let text = format!(
        "🧗 Welcome to EmpowerTours!\n\n\
         Connect a wallet, build your climbing profile, trade TOURS, and\n\
         list or purchase climbs — all on-chain, signed by you.\n\n\
         Start with /apply, then /connectwallet once you are approved.\n\n{}",
        Command::descriptions()
    );
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

pub async fn handle_help_command(bot: &Bot, msg: &Message) -> AppResult<()> {
    metrics::COMMANDS_TOTAL.with_label_values(&["help"]).inc();
    bot.send_message(msg.chat.id, Command::descriptions().to_string()).await?;
    Ok(())
}

/// /apply Name | Location | Experience
pub async fn handle_apply_command(bot: &Bot, msg: &Message, deps: &HandlerDeps, args: &str) -> AppResult<()> {
    ensure_user_exists(deps, &UserInfo::from_message(msg));
    metrics::COMMANDS_TOTAL.with_label_values(&["apply"]).inc();
    let user_id = msg.chat.id.0;

    let parts: Vec<&str> = args.split('|').map(str::trim).collect();
    if parts.len() != 3 {
        bot.send_message(
            msg.chat.id,
            "Usage: /apply Name | Location | Climbing experience\n\
             Example: /apply Alice | Boulder, CO | 5 years sport, lead 5.11",
        )
        .await?;
        return Ok(());
    }

    let name = clean_text(parts[0], "name", 64)?;
    let location = clean_text(parts[1], "location", 128)?;
    let experience = clean_text(parts[2], "experience", 256)?;

    let conn = get_connection(&deps.db_pool)?;
    db::submit_application(&conn, user_id, &name, &location, &experience)?;

    bot.send_message(
        msg.chat.id,
        "📋 Application received! You will get a message once it is reviewed. Check /status any time.",
    )
    .await?;

    // Ping the admin out of band
    let bot_notify = bot.clone();
    let db_pool = deps.db_pool.clone();
    let name_copy = name.clone();
    tokio::spawn(async move {
        notify_admin_new_application(bot_notify, db_pool, user_id, &name_copy).await;
    });

    Ok(())
}

pub async fn handle_status_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> AppResult<()> {
    metrics::COMMANDS_TOTAL.with_label_values(&["status"]).inc();
    let user_id = msg.chat.id.0;
    let conn = get_connection(&deps.db_pool)?;

    let application = match db::get_application(&conn, user_id)? {
        None => "not submitted — use /apply".to_string(),
        Some(app) => match app.status {
            AppStatus::Pending => "pending review ⏳".to_string(),
            AppStatus::Approved => "approved ✅".to_string(),
            AppStatus::Rejected => "rejected ❌ (you may /apply again)".to_string(),
        },
    };

    let wallet = match db::get_session_state(&conn, user_id, config::session::ttl())? {
        SessionState::Missing => "not connected".to_string(),
        SessionState::Expired(s) => format!("{} (session expired — /connectwallet)", s.wallet_address),
        SessionState::Active(s) => s.wallet_address,
    };

    let pending_count = pending::list_for_user(&conn, user_id)?.len();

    send_html(
        bot,
        msg.chat.id,
        format!(
            "📊 Your status\n\nApplication: {}\nWallet: <code>{}</code>\nPending transactions: {}",
            escape(&application),
            escape(&wallet),
            pending_count
        ),
    )
    .await?;
    Ok(())
}

pub async fn handle_pending_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> AppResult<()> {
    metrics::COMMANDS_TOTAL.with_label_values(&["pending"]).inc();
    let conn = get_connection(&deps.db_pool)?;
    let rows = pending::list_for_user(&conn, msg.chat.id.0)?;

    if rows.is_empty() {
        bot.send_message(msg.chat.id, "Nothing pending. 🎉").await?;
        return Ok(());
    }

    let now = Utc::now().timestamp();
    let mut lines = vec!["⏳ Pending transactions:".to_string()];
    for row in rows {
        let age_secs = now.saturating_sub(row.created_at);
        let state = match &row.tx_hash {
            Some(hash) => format!("submitted as {}…, awaiting receipt", &hash[..10.min(hash.len())]),
            None => "awaiting your signature".to_string(),
        };
        let stale = if age_secs > config::pending::STALE_AFTER_SECS {
            " (stale — consider /cancel)"
        } else {
            ""
        };
        lines.push(format!("• {} — {} — {}m old{}", row.tx_type, state, age_secs / 60, stale));
    }
    bot.send_message(msg.chat.id, lines.join("\n")).await?;
    Ok(())
}

pub async fn handle_cancel_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> AppResult<()> {
    metrics::COMMANDS_TOTAL.with_label_values(&["cancel"]).inc();
    let user_id = msg.chat.id.0;
    let conn = get_connection(&deps.db_pool)?;
    let dropped = pending::clear_for_user(&conn, user_id)?;
    deps.rate_limiter.remove_rate_limit(user_id).await;

    let text = if dropped == 0 {
        "Nothing to cancel.".to_string()
    } else {
        format!(
            "🗑 Discarded {} pending transaction(s). Anything already signed and broadcast still confirms on-chain.",
            dropped
        )
    };
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

/// True when the sender is the configured administrator.
pub fn is_admin(msg: &Message) -> bool {
    !config::ADMIN_USERNAME.is_empty()
        && msg
            .from
            .as_ref()
            .and_then(|u| u.username.as_deref())
            .map(|u| u.eq_ignore_ascii_case(&config::ADMIN_USERNAME))
            .unwrap_or(false)
}

/// /applications — list applications awaiting review (admin only)
pub async fn handle_applications_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> AppResult<()> {
    if !is_admin(msg) {
        return Err(AppError::Validation("admin only".into()));
    }
    let conn = get_connection(&deps.db_pool)?;
    let apps = db::list_pending_applications(&conn)?;

    if apps.is_empty() {
        bot.send_message(msg.chat.id, "No applications waiting.").await?;
        return Ok(());
    }

    let mut lines = vec!["📋 Pending applications:".to_string()];
    for app in apps {
        lines.push(format!(
            "• {} — {} ({}, {})",
            app.user_id, app.name, app.location, app.experience
        ));
    }
    lines.push("\nUse /approveapp <id> or /rejectapp <id>".to_string());
    bot.send_message(msg.chat.id, lines.join("\n")).await?;
    Ok(())
}

async fn review_application(
    bot: &Bot,
    msg: &Message,
    deps: &HandlerDeps,
    args: &str,
    status: AppStatus,
) -> AppResult<()> {
    if !is_admin(msg) {
        return Err(AppError::Validation("admin only".into()));
    }
    let user_id: i64 = args
        .trim()
        .parse()
        .map_err(|_| AppError::Validation("usage: /approveapp <user id>".to_string()))?;

    let conn = get_connection(&deps.db_pool)?;
    if !db::set_application_status(&conn, user_id, status)? {
        return Err(AppError::Validation(format!("no application from user {}", user_id)));
    }

    let user_text = if status == AppStatus::Approved {
        "🎉 Your EmpowerTours application was approved! Connect a wallet with /connectwallet."
    } else {
        "Your EmpowerTours application was not approved this time. You may /apply again."
    };
    if let Err(e) = bot.send_message(ChatId(user_id), user_text).await {
        log::warn!("Could not notify user {} about review outcome: {}", user_id, e);
    }

    bot.send_message(msg.chat.id, format!("Done — user {} is now {}.", user_id, status))
        .await?;
    Ok(())
}

/// /approveapp <user id> (admin only)
pub async fn handle_approve_app_command(bot: &Bot, msg: &Message, deps: &HandlerDeps, args: &str) -> AppResult<()> {
    review_application(bot, msg, deps, args, AppStatus::Approved).await
}

/// /rejectapp <user id> (admin only)
pub async fn handle_reject_app_command(bot: &Bot, msg: &Message, deps: &HandlerDeps, args: &str) -> AppResult<()> {
    review_application(bot, msg, deps, args, AppStatus::Rejected).await
}

/// /broadcast <text> — post to the group chat (admin only)
pub async fn handle_broadcast_command(bot: &Bot, msg: &Message, args: &str) -> AppResult<()> {
    if !is_admin(msg) {
        return Err(AppError::Validation("admin only".into()));
    }
    let text = args.trim();
    if text.is_empty() {
        return Err(AppError::Validation("usage: /broadcast <text>".into()));
    }
    broadcast_group(bot, text).await;
    bot.send_message(msg.chat.id, "📣 Broadcast sent.").await?;
    Ok(())
}
