//! Dispatcher schema and handler chain builders

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use tourscore::AppError;

use crate::telegram::bot::Command;
use crate::telegram::html::{escape, send_html};
use crate::telegram::Bot;

use super::commands::{
    handle_applications_command, handle_apply_command, handle_approve_app_command, handle_broadcast_command,
    handle_cancel_command, handle_help_command, handle_pending_command, handle_reject_app_command,
    handle_start_command, handle_status_command,
};
use super::market::{handle_climbs_command, handle_create_climb_command, handle_purchase_climb_command};
use super::tournament::{
    handle_create_tournament_command, handle_end_tournament_command, handle_join_tournament_command,
};
use super::types::{HandlerDeps, HandlerError};
use super::wallet::{
    handle_balance_command, handle_buy_tokens_command, handle_connect_wallet_command,
    handle_create_profile_command, handle_journal_command, handle_journal_entries_command, handle_wallet_command,
};

/// Creates the main dispatcher schema for the Telegram bot.
///
/// The same handler tree is used in production and in integration tests.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_admin_apps = deps.clone();
    let deps_approve = deps.clone();
    let deps_reject = deps.clone();
    let deps_commands = deps.clone();

    dptree::entry()
        // Hidden admin commands (not in Command enum)
        .branch(applications_handler(deps_admin_apps))
        .branch(approve_app_handler(deps_approve))
        .branch(reject_app_handler(deps_reject))
        .branch(broadcast_handler())
        // Command handler
        .branch(command_handler(deps_commands))
}

/// The uniform catch-all: log, then send the user a short error line.
async fn report_error(bot: &Bot, chat_id: ChatId, command: &str, err: AppError) {
    log::error!("/{} failed for chat {}: {}", command, chat_id.0, err);
    let _ = send_html(bot, chat_id, format!("⚠️ {}", escape(&err.to_string()))).await;
}

fn command_args(text: &str) -> &str {
    text.split_once(char::is_whitespace)
        .map(|(_, rest)| rest.trim())
        .unwrap_or("")
}

/// Handler for /applications admin command (hidden, not in Command enum)
fn applications_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| {
            msg.text()
                .map(|text| text.starts_with("/applications"))
                .unwrap_or(false)
        })
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                if let Err(e) = handle_applications_command(&bot, &msg, &deps).await {
                    report_error(&bot, msg.chat.id, "applications", e).await;
                }
                Ok(())
            }
        })
}

/// Handler for /approveapp admin command (hidden, not in Command enum)
fn approve_app_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.text().map(|text| text.starts_with("/approveapp")).unwrap_or(false))
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                let args = msg.text().map(command_args).unwrap_or("").to_string();
                if let Err(e) = handle_approve_app_command(&bot, &msg, &deps, &args).await {
                    report_error(&bot, msg.chat.id, "approveapp", e).await;
                }
                Ok(())
            }
        })
}

/// Handler for /rejectapp admin command (hidden, not in Command enum)
fn reject_app_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.text().map(|text| text.starts_with("/rejectapp")).unwrap_or(false))
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                let args = msg.text().map(command_args).unwrap_or("").to_string();
                if let Err(e) = handle_reject_app_command(&bot, &msg, &deps, &args).await {
                    report_error(&bot, msg.chat.id, "rejectapp", e).await;
                }
                Ok(())
            }
        })
}

/// Handler for /broadcast admin command (hidden, not in Command enum)
fn broadcast_handler() -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.text().map(|text| text.starts_with("/broadcast")).unwrap_or(false))
        .endpoint(move |bot: Bot, msg: Message| async move {
            let args = msg.text().map(command_args).unwrap_or("").to_string();
            if let Err(e) = handle_broadcast_command(&bot, &msg, &args).await {
                report_error(&bot, msg.chat.id, "broadcast", e).await;
            }
            Ok(())
        })
}

/// Handler for bot commands (/start, /balance, /purchaseclimb, ...)
fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                log::info!("Received command: {:?} from chat {}", cmd, msg.chat.id);

                let result = match &cmd {
                    Command::Start => handle_start_command(&bot, &msg, &deps).await,
                    Command::Help => handle_help_command(&bot, &msg).await,
                    Command::Apply(args) => handle_apply_command(&bot, &msg, &deps, args).await,
                    Command::Status => handle_status_command(&bot, &msg, &deps).await,
                    Command::ConnectWallet => handle_connect_wallet_command(&bot, &msg, &deps).await,
                    Command::Wallet => handle_wallet_command(&bot, &msg, &deps).await,
                    Command::Balance => handle_balance_command(&bot, &msg, &deps).await,
                    Command::CreateProfile(args) => handle_create_profile_command(&bot, &msg, &deps, args).await,
                    Command::Journal(args) => handle_journal_command(&bot, &msg, &deps, args).await,
                    Command::JournalEntries => handle_journal_entries_command(&bot, &msg, &deps).await,
                    Command::BuyTokens(args) => handle_buy_tokens_command(&bot, &msg, &deps, args).await,
                    Command::CreateClimb(args) => handle_create_climb_command(&bot, &msg, &deps, args).await,
                    Command::Climbs => handle_climbs_command(&bot, &msg, &deps).await,
                    Command::PurchaseClimb(args) => handle_purchase_climb_command(&bot, &msg, &deps, args).await,
                    Command::CreateTournament(args) => {
                        handle_create_tournament_command(&bot, &msg, &deps, args).await
                    }
                    Command::JoinTournament(args) => handle_join_tournament_command(&bot, &msg, &deps, args).await,
                    Command::EndTournament(args) => handle_end_tournament_command(&bot, &msg, &deps, args).await,
                    Command::Pending => handle_pending_command(&bot, &msg, &deps).await,
                    Command::Cancel => handle_cancel_command(&bot, &msg, &deps).await,
                };

                if let Err(e) = result {
                    let name = format!("{:?}", cmd);
                    let name = name.split(&['(', ' '][..]).next().unwrap_or("command").to_lowercase();
                    report_error(&bot, msg.chat.id, &name, e).await;
                }
                Ok(())
            }
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_args_splits_off_the_command() {
        assert_eq!(command_args("/approveapp 42"), "42");
        assert_eq!(command_args("/broadcast  hello world "), "hello world");
        assert_eq!(command_args("/applications"), "");
    }
}
