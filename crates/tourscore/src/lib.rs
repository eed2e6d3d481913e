//! Tourscore - core library for the EmpowerTours Telegram bot
//!
//! Everything that does not need a Telegram connection lives here:
//! the chain layer (ABI bindings, unsigned-transaction building, the
//! approve-then-act sequencer), the SQLite storage layer, and the shared
//! configuration/error/logging plumbing.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging, rate limiting, validation
//! - `storage`: database pool, migrations, pending-transaction ledger
//! - `chain`: ABI, RPC gateway, unit conversion, two-phase sequencer

pub mod chain;
pub mod core;
pub mod storage;

// Re-export commonly used types for convenience
pub use crate::core::{config, AppError, AppResult};
pub use chain::{ActionIntent, ChainGateway, RpcGateway, Sequencer, TxType, UnsignedTx};
pub use storage::{create_pool, get_connection, DbConnection, DbPool};
