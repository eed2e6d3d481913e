//! Bot initialization and command definitions
//!
//! This module contains:
//! - Command enum definition
//! - Bot instance creation
//! - Command registration with the Telegram UI

use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::utils::command::{BotCommands, ParseError};

use tourscore::config;

/// Argument parser that hands the whole rest of the line to the handler.
/// Free-form fields (names, journal text, "a | b | c" forms) are split there.
fn rest_of_line(input: String) -> Result<(String,), ParseError> {
    Ok((input.trim().to_string(),))
}

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "EmpowerTours commands:")]
pub enum Command {
    #[command(description = "welcome and command overview")]
    Start,
    #[command(description = "show this help")]
    Help,
    #[command(description = "apply for membership: /apply Name | Location | Experience", parse_with = rest_of_line)]
    Apply(String),
    #[command(description = "application, wallet, and pending-transaction status")]
    Status,
    #[command(description = "connect your wallet")]
    ConnectWallet,
    #[command(description = "show the connected wallet")]
    Wallet,
    #[command(description = "native and TOURS balances")]
    Balance,
    #[command(description = "create your on-chain profile: /createprofile Name", parse_with = rest_of_line)]
    CreateProfile(String),
    #[command(description = "log a journal entry: /journal text", parse_with = rest_of_line)]
    Journal(String),
    #[command(description = "show your recent journal entries")]
    JournalEntries,
    #[command(description = "buy TOURS: /buytokens <native amount>", parse_with = rest_of_line)]
    BuyTokens(String),
    #[command(
        description = "list a climb: /createclimb Name | Location | Difficulty 1-10 | Price",
        parse_with = rest_of_line
    )]
    CreateClimb(String),
    #[command(description = "browse climb listings")]
    Climbs,
    #[command(description = "purchase a climb: /purchaseclimb <id>", parse_with = rest_of_line)]
    PurchaseClimb(String),
    #[command(description = "create a tournament: /createtournament <entry fee>", parse_with = rest_of_line)]
    CreateTournament(String),
    #[command(description = "join a tournament: /jointournament <id>", parse_with = rest_of_line)]
    JoinTournament(String),
    #[command(
        description = "end a tournament: /endtournament <id> <winner address>",
        parse_with = rest_of_line
    )]
    EndTournament(String),
    #[command(description = "show your pending transactions")]
    Pending,
    #[command(description = "discard your pending transactions")]
    Cancel,
}

/// Creates a Bot instance with custom or default API URL
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(anyhow::Error)` - Failed to create bot (invalid URL, network issues, etc.)
pub fn create_bot() -> anyhow::Result<Bot> {
    // Check if local Bot API server is configured
    let bot = if let Ok(bot_api_url) = std::env::var("BOT_API_URL") {
        log::info!("Using custom Bot API URL: {}", bot_api_url);
        let url = url::Url::parse(&bot_api_url).map_err(|e| anyhow::anyhow!("Invalid BOT_API_URL: {}", e))?;
        Bot::from_env_with_client(ClientBuilder::new().timeout(config::network::timeout()).build()?).set_api_url(url)
    } else {
        Bot::from_env_with_client(ClientBuilder::new().timeout(config::network::timeout()).build()?)
    };

    Ok(bot)
}

/// Sets up bot commands in Telegram UI
///
/// # Arguments
/// * `bot` - Bot instance to configure
///
/// # Returns
/// * `Ok(())` - Commands set successfully
/// * `Err(RequestError)` - Failed to set commands
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    use teloxide::types::BotCommand;

    bot.set_my_commands(vec![
        BotCommand::new("start", "welcome and command overview"),
        BotCommand::new("apply", "apply for membership"),
        BotCommand::new("status", "application and wallet status"),
        BotCommand::new("connectwallet", "connect your wallet"),
        BotCommand::new("balance", "native and TOURS balances"),
        BotCommand::new("createprofile", "create your on-chain profile"),
        BotCommand::new("journal", "log a journal entry"),
        BotCommand::new("buytokens", "buy TOURS tokens"),
        BotCommand::new("createclimb", "list a climb"),
        BotCommand::new("climbs", "browse climb listings"),
        BotCommand::new("purchaseclimb", "purchase a climb"),
        BotCommand::new("createtournament", "create a tournament"),
        BotCommand::new("jointournament", "join a tournament"),
        BotCommand::new("pending", "show pending transactions"),
        BotCommand::new("cancel", "discard pending transactions"),
    ])
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_descriptions() {
        let commands = Command::descriptions();
        let command_list = format!("{}", commands);

        // Check that the description header is present
        assert!(command_list.contains("EmpowerTours"));

        // Check that some key commands are present
        assert!(command_list.contains("start"));
        assert!(command_list.contains("connectwallet"));
        assert!(command_list.contains("purchaseclimb"));
        assert!(command_list.contains("jointournament"));
    }

    #[test]
    fn test_bare_commands_parse() {
        assert!(matches!(Command::parse("/start", "toursbot"), Ok(Command::Start)));
        assert!(matches!(
            Command::parse("/connectwallet", "toursbot"),
            Ok(Command::ConnectWallet)
        ));
        assert!(matches!(Command::parse("/cancel", "toursbot"), Ok(Command::Cancel)));
    }

    #[test]
    fn test_arg_commands_take_the_rest_of_the_line() {
        match Command::parse("/purchaseclimb 3", "toursbot") {
            Ok(Command::PurchaseClimb(args)) => assert_eq!(args, "3"),
            other => panic!("unexpected parse: {:?}", other),
        }
        match Command::parse("/apply Alice | Yosemite | 5 years", "toursbot") {
            Ok(Command::Apply(args)) => assert_eq!(args, "Alice | Yosemite | 5 years"),
            other => panic!("unexpected parse: {:?}", other),
        }
        // Missing args parse to an empty string; handlers answer with usage
        match Command::parse("/journal", "toursbot") {
            Ok(Command::Journal(args)) => assert_eq!(args, ""),
            other => panic!("unexpected parse: {:?}", other),
        }
    }

    #[test]
    fn test_mention_is_accepted() {
        assert!(matches!(
            Command::parse("/balance@toursbot", "toursbot"),
            Ok(Command::Balance)
        ));
    }
}
