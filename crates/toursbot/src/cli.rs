use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "toursbot")]
#[command(author, version, about = "EmpowerTours Telegram bot — wallet sessions and unsigned-transaction building", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot in normal mode
    Run {
        /// Use webhook mode instead of long polling (requires WEBHOOK_URL)
        #[arg(long)]
        webhook: bool,
    },

    /// Validate configuration and exit
    CheckConfig,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
