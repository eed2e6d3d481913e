//! Chain layer: ABI, unit conversion, RPC gateway, unsigned-transaction
//! building, and the approve-then-act sequencer.

pub mod abi;
pub mod gateway;
pub mod sequencer;
pub mod tx;
pub mod types;
pub mod units;

use alloy_primitives::U256;

pub use gateway::{ChainGateway, RpcGateway};
pub use sequencer::{PreparedTx, Sequencer};
pub use types::{ActionIntent, TxType, UnsignedTx};

/// Flat fee the contract charges for listing a climb: 1 TOURS.
pub const CLIMB_CREATION_FEE: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);
