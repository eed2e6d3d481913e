//! EmpowerTours Telegram bot.
//!
//! Command handlers build unsigned transactions through the tourscore
//! sequencer; the HTTP server receives wallet addresses and signed hashes
//! from the external signer and relays the outcome back over Telegram.

pub mod cli;
pub mod server;
pub mod telegram;

// Re-export commonly used types for convenience
pub use telegram::{create_bot, schema, setup_bot_commands, HandlerDeps};
