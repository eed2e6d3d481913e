//! Calldata encoding and unsigned-transaction assembly.

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;

use crate::chain::abi::{IEmpowerTours, IERC20};
use crate::chain::types::{ActionIntent, TxType, UnsignedTx};
use crate::core::config;

/// ABI-encode the contract call for an intent.
pub fn calldata(intent: &ActionIntent) -> Vec<u8> {
    match intent {
        ActionIntent::CreateProfile { name } => {
            IEmpowerTours::createProfileCall { name: name.clone() }.abi_encode()
        }
        ActionIntent::JournalEntry { content } => {
            IEmpowerTours::addJournalEntryCall { content: content.clone() }.abi_encode()
        }
        ActionIntent::BuyTokens { .. } => IEmpowerTours::buyTokensCall {}.abi_encode(),
        ActionIntent::CreateClimb {
            name,
            location,
            difficulty,
            price,
        } => IEmpowerTours::createClimbCall {
            name: name.clone(),
            location: location.clone(),
            difficulty: *difficulty,
            price: *price,
        }
        .abi_encode(),
        ActionIntent::PurchaseClimb { climb_id, .. } => IEmpowerTours::purchaseClimbCall {
            climbId: U256::from(*climb_id),
        }
        .abi_encode(),
        ActionIntent::CreateTournament { entry_fee } => IEmpowerTours::createTournamentCall {
            entryFee: *entry_fee,
        }
        .abi_encode(),
        ActionIntent::JoinTournament { tournament_id, .. } => IEmpowerTours::joinTournamentCall {
            tournamentId: U256::from(*tournament_id),
        }
        .abi_encode(),
        ActionIntent::EndTournament { tournament_id, winner } => IEmpowerTours::endTournamentCall {
            tournamentId: U256::from(*tournament_id),
            winner: *winner,
        }
        .abi_encode(),
    }
}

/// ABI-encode an ERC-20 approve for the EmpowerTours contract.
pub fn approve_calldata(spender: Address, amount: U256) -> Vec<u8> {
    IERC20::approveCall { spender, amount }.abi_encode()
}

/// Fixed gas limit for a transaction type.
pub fn gas_limit(tx_type: TxType) -> u64 {
    match tx_type {
        TxType::Approve => config::gas::APPROVE,
        TxType::CreateProfile => config::gas::CREATE_PROFILE,
        TxType::JournalEntry => config::gas::JOURNAL_ENTRY,
        TxType::BuyTokens => config::gas::BUY_TOKENS,
        TxType::CreateClimb => config::gas::CREATE_CLIMB,
        TxType::PurchaseClimb => config::gas::PURCHASE_CLIMB,
        TxType::CreateTournament => config::gas::CREATE_TOURNAMENT,
        TxType::JoinTournament => config::gas::JOIN_TOURNAMENT,
        TxType::EndTournament => config::gas::END_TOURNAMENT,
    }
}

/// Assemble the JSON the external signer consumes. All quantities are
/// 0x-prefixed hex, the convention wallet libraries expect.
#[allow(clippy::too_many_arguments)]
pub fn build_unsigned(
    from: Address,
    to: Address,
    value: U256,
    data: &[u8],
    nonce: u64,
    gas: u64,
    gas_price: u128,
    chain_id: u64,
) -> UnsignedTx {
    UnsignedTx {
        from: format!("{:?}", from),
        to: format!("{:?}", to),
        value: format!("{:#x}", value),
        data: format!("0x{}", hex::encode(data)),
        gas: format!("{:#x}", gas),
        gas_price: format!("{:#x}", gas_price),
        nonce: format!("{:#x}", nonce),
        chain_id,
    }
}
