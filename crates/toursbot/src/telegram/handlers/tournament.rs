//! Tournament commands.

use teloxide::prelude::*;

use tourscore::chain::units::{format_tours, parse_units};
use tourscore::chain::ActionIntent;
use tourscore::core::metrics;
use tourscore::core::validation::parse_address;
use tourscore::storage::{get_connection, market};
use tourscore::{AppError, AppResult};

use crate::telegram::Bot;

use super::types::{check_rate_limit, require_approved, require_wallet, send_prepared, HandlerDeps};

/// /createtournament <entry fee in TOURS>
pub async fn handle_create_tournament_command(
    bot: &Bot,
    msg: &Message,
    deps: &HandlerDeps,
    args: &str,
) -> AppResult<()> {
    metrics::COMMANDS_TOTAL.with_label_values(&["createtournament"]).inc();
    let user_id = msg.chat.id.0;
    let conn = get_connection(&deps.db_pool)?;
    require_approved(&conn, user_id)?;
    let wallet = require_wallet(&conn, user_id)?;
    check_rate_limit(deps, user_id).await?;

    if args.trim().is_empty() {
        bot.send_message(msg.chat.id, "Usage: /createtournament <entry fee in TOURS>, e.g. /createtournament 2")
            .await?;
        return Ok(());
    }
    let entry_fee = parse_units(args)?;
    if entry_fee.is_zero() {
        return Err(AppError::Validation("entry fee must be greater than zero".into()));
    }

    let prepared = deps
        .sequencer
        .prepare(&conn, user_id, wallet, ActionIntent::CreateTournament { entry_fee })
        .await?;

    deps.rate_limiter.update_rate_limit(user_id).await;
    send_prepared(bot, msg.chat.id, user_id, &prepared).await?;
    Ok(())
}

/// /jointournament <id>
pub async fn handle_join_tournament_command(bot: &Bot, msg: &Message, deps: &HandlerDeps, args: &str) -> AppResult<()> {
    metrics::COMMANDS_TOTAL.with_label_values(&["jointournament"]).inc();
    let user_id = msg.chat.id.0;
    let conn = get_connection(&deps.db_pool)?;
    require_approved(&conn, user_id)?;
    let wallet = require_wallet(&conn, user_id)?;
    check_rate_limit(deps, user_id).await?;

    let tournament_id: u64 = args
        .trim()
        .parse()
        .map_err(|_| AppError::Validation("usage: /jointournament <id>".to_string()))?;

    let tournament = market::get_tournament(&conn, tournament_id)?
        .ok_or_else(|| AppError::Validation(format!("no tournament #{}", tournament_id)))?;
    if !tournament.active {
        return Err(AppError::Validation(format!(
            "tournament #{} already finished",
            tournament_id
        )));
    }

    let entrants = market::tournament_entry_count(&conn, tournament_id)?;
    bot.send_message(
        msg.chat.id,
        format!(
            "Entry fee: {}. {} climber(s) in so far. Building your transaction...",
            format_tours(tournament.entry_fee),
            entrants
        ),
    )
    .await?;

    let prepared = deps
        .sequencer
        .prepare(
            &conn,
            user_id,
            wallet,
            ActionIntent::JoinTournament {
                tournament_id,
                entry_fee: tournament.entry_fee,
            },
        )
        .await?;

    deps.rate_limiter.update_rate_limit(user_id).await;
    send_prepared(bot, msg.chat.id, user_id, &prepared).await?;
    Ok(())
}

/// /endtournament <id> <winner address> — organizer only; the contract
/// enforces that, we just let the simulation report it.
pub async fn handle_end_tournament_command(bot: &Bot, msg: &Message, deps: &HandlerDeps, args: &str) -> AppResult<()> {
    metrics::COMMANDS_TOTAL.with_label_values(&["endtournament"]).inc();
    let user_id = msg.chat.id.0;
    let conn = get_connection(&deps.db_pool)?;
    require_approved(&conn, user_id)?;
    let wallet = require_wallet(&conn, user_id)?;
    check_rate_limit(deps, user_id).await?;

    let mut parts = args.trim().split_whitespace();
    let (id_raw, winner_raw) = match (parts.next(), parts.next()) {
        (Some(id), Some(winner)) => (id, winner),
        _ => {
            return Err(AppError::Validation(
                "usage: /endtournament <id> <winner address>".into(),
            ))
        }
    };

    let tournament_id: u64 = id_raw
        .parse()
        .map_err(|_| AppError::Validation("tournament id must be a number".to_string()))?;
    let winner = parse_address(winner_raw)?;

    let tournament = market::get_tournament(&conn, tournament_id)?
        .ok_or_else(|| AppError::Validation(format!("no tournament #{}", tournament_id)))?;
    if !tournament.active {
        return Err(AppError::Validation(format!(
            "tournament #{} already finished",
            tournament_id
        )));
    }

    let prepared = deps
        .sequencer
        .prepare(
            &conn,
            user_id,
            wallet,
            ActionIntent::EndTournament { tournament_id, winner },
        )
        .await?;

    deps.rate_limiter.update_rate_limit(user_id).await;
    send_prepared(bot, msg.chat.id, user_id, &prepared).await?;
    Ok(())
}
