use anyhow::Result;
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::update_listeners::{webhooks, Polling};

use tourscore::chain::ChainGateway;
use tourscore::core::{config, init_logger, log_chain_configuration};
use tourscore::core::rate_limiter::RateLimiter;
use tourscore::storage::create_pool;
use tourscore::{RpcGateway, Sequencer};

use toursbot::server::relay::RelayContext;
use toursbot::server::{run_server, ApiState};
use toursbot::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps};

use toursbot::cli::{Cli, Commands};

/// Main entry point for the Telegram bot
///
/// Parses CLI arguments and dispatches to appropriate subcommand.
///
/// # Errors
/// Returns an error if initialization fails (logging, database, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Set up global panic handler so a panicking handler is logged instead of
    // silently taking the dispatcher down
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
    }));

    // Initialize logger (console + file)
    init_logger(&config::LOG_FILE_PATH)?;

    // Load environment variables from .env if present
    let _ = dotenv();

    match cli.command {
        Some(Commands::Run { webhook }) => {
            log::info!("Running bot (webhook: {})", webhook);
            run_bot(webhook).await
        }
        Some(Commands::CheckConfig) => run_check_config(),
        None => {
            // No command specified - default to running the bot in polling mode
            log::info!("No command specified, running bot in polling mode");
            run_bot(false).await
        }
    }
}

/// Validate configuration without starting anything.
fn run_check_config() -> Result<()> {
    log_chain_configuration();
    RpcGateway::from_config().map_err(|e| anyhow::anyhow!("chain config: {}", e))?;
    create_pool(&config::DATABASE_PATH).map_err(|e| anyhow::anyhow!("database: {}", e))?;
    log::info!("✅ Configuration looks good");
    Ok(())
}

async fn run_bot(use_webhook: bool) -> Result<()> {
    log_chain_configuration();

    // Database pool (runs migrations)
    let db_pool = Arc::new(
        create_pool(&config::DATABASE_PATH).map_err(|e| anyhow::anyhow!("Failed to create database pool: {}", e))?,
    );

    // Chain gateway and sequencer
    let rpc = RpcGateway::from_config().map_err(|e| anyhow::anyhow!("Chain configuration: {}", e))?;
    let (contract, token) = (rpc.contract(), rpc.token());
    let gateway: Arc<dyn ChainGateway> = Arc::new(rpc);
    let sequencer = Arc::new(Sequencer::new(gateway.clone(), contract, token, *config::CHAIN_ID));

    // Telegram bot
    let bot = create_bot()?;
    let me = bot.get_me().await?;
    log::info!("Bot started as @{}", me.username());

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to register bot commands: {}", e);
    }

    let deps = HandlerDeps {
        db_pool: db_pool.clone(),
        gateway: gateway.clone(),
        sequencer: sequencer.clone(),
        rate_limiter: Arc::new(RateLimiter::new()),
    };

    let state = ApiState {
        bot: bot.clone(),
        relay: Arc::new(RelayContext {
            db_pool,
            sequencer,
            gateway,
        }),
    };

    let handler = schema(deps);
    let port = *config::WEB_PORT;

    if use_webhook {
        let Some(url) = config::WEBHOOK_URL.clone() else {
            return Err(anyhow::anyhow!("--webhook requires WEBHOOK_URL to be set"));
        };
        log::info!("Starting in webhook mode at {}", url);

        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let options = webhooks::Options::new(addr, url.parse()?);
        let (listener, stop_flag, bot_router) = webhooks::axum_to_router(bot.clone(), options).await?;

        // One server carries both the Telegram webhook and the signer API
        let app = bot_router.merge(toursbot::server::router(state));
        let tcp = tokio::net::TcpListener::bind(addr).await?;
        tokio::spawn(async move {
            if let Err(e) = axum::serve(tcp, app).with_graceful_shutdown(stop_flag).await {
                log::error!("HTTP server stopped: {}", e);
            }
        });

        Dispatcher::builder(bot, handler)
            .build()
            .dispatch_with_listener(
                listener,
                LoggingErrorHandler::with_custom_text("An error from the update listener"),
            )
            .await;
    } else {
        // Polling mode: the signer API runs on its own listener
        tokio::spawn(async move {
            if let Err(e) = run_server(port, state).await {
                log::error!("API server stopped: {}", e);
            }
        });

        // Drop any stale webhook so polling receives updates
        let _ = bot.delete_webhook().await;

        let listener = Polling::builder(bot.clone()).drop_pending_updates().build();
        let mut dispatcher = Dispatcher::builder(bot, handler).build();

        tokio::select! {
            _ = dispatcher.dispatch_with_listener(
                listener,
                LoggingErrorHandler::with_custom_text("An error from the update listener"),
            ) => {
                log::info!("Dispatcher finished");
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("Shutdown signal received");
            }
        }
    }

    Ok(())
}
