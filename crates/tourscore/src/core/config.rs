use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Configuration constants for the bot

/// SQLite database file path
/// Read from DATABASE_PATH environment variable
pub static DATABASE_PATH: Lazy<String> =
    Lazy::new(|| env::var("DATABASE_PATH").unwrap_or_else(|_| "empowertours.sqlite".to_string()));

/// Log file path for the file half of the combined logger
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "toursbot.log".to_string()));

/// JSON-RPC endpoint the chain gateway talks to
/// Defaults to the Monad testnet public endpoint
pub static RPC_URL: Lazy<String> =
    Lazy::new(|| env::var("RPC_URL").unwrap_or_else(|_| "https://testnet-rpc.monad.xyz".to_string()));

/// Chain id stamped into every unsigned transaction (10143 = Monad testnet)
pub static CHAIN_ID: Lazy<u64> = Lazy::new(|| {
    env::var("CHAIN_ID")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(10_143)
});

/// EmpowerTours contract address (hex, 0x-prefixed)
/// Required for anything beyond /start and /apply; checked at startup
pub static CONTRACT_ADDRESS: Lazy<String> =
    Lazy::new(|| env::var("CONTRACT_ADDRESS").unwrap_or_default());

/// TOURS ERC-20 token contract address (hex, 0x-prefixed)
pub static TOURS_TOKEN_ADDRESS: Lazy<String> =
    Lazy::new(|| env::var("TOURS_TOKEN_ADDRESS").unwrap_or_default());

/// Base URL of the external signer page. The bot appends ?uid=<telegram id>
/// and the page POSTs the wallet address / signed hash back to us.
pub static SIGNER_URL: Lazy<String> =
    Lazy::new(|| env::var("SIGNER_URL").unwrap_or_else(|_| "https://sign.empowertours.xyz".to_string()));

/// Group chat id for public broadcasts (new climbs, tournament results).
/// Unset means broadcasts are silently skipped.
pub static GROUP_CHAT_ID: Lazy<Option<i64>> =
    Lazy::new(|| env::var("GROUP_CHAT_ID").ok().and_then(|v| v.parse().ok()));

/// Telegram username (without @) of the operator receiving admin notifications
pub static ADMIN_USERNAME: Lazy<String> =
    Lazy::new(|| env::var("ADMIN_USERNAME").unwrap_or_default());

/// Key for the XOR field obfuscation in the off-chain cache.
/// Obfuscation only — this is not a security boundary.
pub static OBFUSCATION_KEY: Lazy<String> =
    Lazy::new(|| env::var("OBFUSCATION_KEY").unwrap_or_else(|_| "empowertours".to_string()));

/// Port for the HTTP server (wallet submission, tx relay, health, metrics)
pub static WEB_PORT: Lazy<u16> = Lazy::new(|| {
    env::var("WEB_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8080)
});

/// Public HTTPS URL Telegram should deliver webhook updates to.
/// Only consulted when the bot runs with --webhook.
pub static WEBHOOK_URL: Lazy<Option<String>> = Lazy::new(|| env::var("WEBHOOK_URL").ok());

/// Session configuration
pub mod session {
    use super::Duration;

    /// Wallet sessions expire this many seconds after connect
    pub const TTL_SECS: u64 = 86_400; // 24 hours

    /// Session time-to-live
    pub fn ttl() -> Duration {
        Duration::from_secs(TTL_SECS)
    }
}

/// Receipt polling configuration
pub mod receipt {
    use super::Duration;

    /// How many times to poll for a receipt after a hash is relayed
    pub const POLL_ATTEMPTS: u32 = 20;

    /// Delay between receipt polls (in seconds)
    pub const POLL_INTERVAL_SECS: u64 = 3;

    /// Receipt poll interval duration
    pub fn interval() -> Duration {
        Duration::from_secs(POLL_INTERVAL_SECS)
    }
}

/// Rate limiting configuration
pub mod rate_limit {
    use super::Duration;

    /// Duration between transaction-building commands per user (in seconds)
    pub const COOLDOWN_SECONDS: u64 = 15;

    /// Rate limit duration
    pub fn duration() -> Duration {
        Duration::from_secs(COOLDOWN_SECONDS)
    }
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Timeout for outbound HTTP requests (Telegram API, RPC)
    pub const TIMEOUT_SECS: u64 = 30;

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(TIMEOUT_SECS)
    }
}

/// Fixed gas limits per transaction type.
///
/// The contract surface is fixed, so constants beat an eth_estimateGas
/// round-trip on every build. Values carry ~30% headroom over observed usage.
pub mod gas {
    pub const APPROVE: u64 = 60_000;
    pub const CREATE_PROFILE: u64 = 180_000;
    pub const JOURNAL_ENTRY: u64 = 150_000;
    pub const BUY_TOKENS: u64 = 120_000;
    pub const CREATE_CLIMB: u64 = 260_000;
    pub const PURCHASE_CLIMB: u64 = 220_000;
    pub const CREATE_TOURNAMENT: u64 = 200_000;
    pub const JOIN_TOURNAMENT: u64 = 180_000;
    pub const END_TOURNAMENT: u64 = 210_000;
}

/// Pending-transaction housekeeping
pub mod pending {
    /// Pending rows older than this are flagged as stale in /pending output
    pub const STALE_AFTER_SECS: i64 = 3_600;
}
