//! Climb marketplace commands.

use teloxide::prelude::*;

use tourscore::chain::units::{format_tours, parse_units};
use tourscore::chain::{ActionIntent, CLIMB_CREATION_FEE};
use tourscore::core::metrics;
use tourscore::core::validation::clean_text;
use tourscore::storage::{get_connection, market};
use tourscore::{AppError, AppResult};

use crate::telegram::html::{escape, send_html};
use crate::telegram::Bot;

use super::types::{check_rate_limit, require_approved, require_wallet, send_prepared, HandlerDeps};

/// /createclimb Name | Location | Difficulty 1-10 | Price
pub async fn handle_create_climb_command(bot: &Bot, msg: &Message, deps: &HandlerDeps, args: &str) -> AppResult<()> {
    metrics::COMMANDS_TOTAL.with_label_values(&["createclimb"]).inc();
    let user_id = msg.chat.id.0;
    let conn = get_connection(&deps.db_pool)?;
    require_approved(&conn, user_id)?;
    let wallet = require_wallet(&conn, user_id)?;
    check_rate_limit(deps, user_id).await?;

    let parts: Vec<&str> = args.split('|').map(str::trim).collect();
    if parts.len() != 4 {
        send_html(
            bot,
            msg.chat.id,
            format!(
                "Usage: /createclimb Name | Location | Difficulty 1-10 | Price in TOURS\n\
                 Example: /createclimb Moonlight Arête | North face, third buttress | 7 | 5\n\n\
                 Listing costs {} (charged on-chain).",
                format_tours(CLIMB_CREATION_FEE)
            ),
        )
        .await?;
        return Ok(());
    }

    let name = clean_text(parts[0], "climb name", 64)?;
    let location = clean_text(parts[1], "location", 256)?;
    let difficulty: u8 = parts[2]
        .parse()
        .ok()
        .filter(|d| (1..=10).contains(d))
        .ok_or_else(|| AppError::Validation("difficulty must be a number from 1 to 10".into()))?;
    let price = parse_units(parts[3])?;
    if price.is_zero() {
        return Err(AppError::Validation("price must be greater than zero".into()));
    }

    let prepared = deps
        .sequencer
        .prepare(
            &conn,
            user_id,
            wallet,
            ActionIntent::CreateClimb {
                name,
                location,
                difficulty,
                price,
            },
        )
        .await?;

    deps.rate_limiter.update_rate_limit(user_id).await;
    send_prepared(bot, msg.chat.id, user_id, &prepared).await?;
    Ok(())
}

/// /climbs — browse listings; locations only show for holders.
pub async fn handle_climbs_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> AppResult<()> {
    metrics::COMMANDS_TOTAL.with_label_values(&["climbs"]).inc();
    let user_id = msg.chat.id.0;
    let conn = get_connection(&deps.db_pool)?;

    let climbs = market::list_climbs(&conn)?;
    if climbs.is_empty() {
        bot.send_message(msg.chat.id, "No climbs listed yet. Be the first with /createclimb!")
            .await?;
        return Ok(());
    }

    let mut lines = vec!["🧗 Climb listings:".to_string()];
    for climb in climbs {
        let location = if market::user_holds_climb(&conn, climb.onchain_id, user_id)? {
            format!("📍 {}", climb.location)
        } else {
            "📍 unlocked after purchase".to_string()
        };
        lines.push(format!(
            "#{} <b>{}</b> — difficulty {}/10 — {}\n   {}",
            climb.onchain_id,
            escape(&climb.name),
            climb.difficulty,
            format_tours(climb.price),
            escape(&location),
        ));
    }
    lines.push("\nBuy with /purchaseclimb <id>".to_string());
    send_html(bot, msg.chat.id, lines.join("\n")).await?;
    Ok(())
}

/// /purchaseclimb <id>
pub async fn handle_purchase_climb_command(bot: &Bot, msg: &Message, deps: &HandlerDeps, args: &str) -> AppResult<()> {
    metrics::COMMANDS_TOTAL.with_label_values(&["purchaseclimb"]).inc();
    let user_id = msg.chat.id.0;
    let conn = get_connection(&deps.db_pool)?;
    require_approved(&conn, user_id)?;
    let wallet = require_wallet(&conn, user_id)?;
    check_rate_limit(deps, user_id).await?;

    let climb_id: u64 = args
        .trim()
        .parse()
        .map_err(|_| AppError::Validation("usage: /purchaseclimb <id> (see /climbs)".to_string()))?;

    let climb = market::get_climb(&conn, climb_id)?
        .ok_or_else(|| AppError::Validation(format!("no climb #{} — see /climbs", climb_id)))?;
    if climb.creator_id == user_id {
        return Err(AppError::Validation("you created this climb — nothing to purchase".into()));
    }

    let prepared = deps
        .sequencer
        .prepare(
            &conn,
            user_id,
            wallet,
            ActionIntent::PurchaseClimb {
                climb_id,
                price: climb.price,
            },
        )
        .await?;

    deps.rate_limiter.update_rate_limit(user_id).await;
    send_prepared(bot, msg.chat.id, user_id, &prepared).await?;
    Ok(())
}
