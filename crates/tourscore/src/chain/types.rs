//! Shared chain-layer types: transaction kinds, user intents, and the
//! unsigned-transaction JSON handed to the external signer.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Kind of an in-flight transaction. Stored as TEXT in the ledger and used
/// to key the at-most-one-pending-per-type constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TxType {
    Approve,
    CreateProfile,
    JournalEntry,
    BuyTokens,
    CreateClimb,
    PurchaseClimb,
    CreateTournament,
    JoinTournament,
    EndTournament,
}

/// What the user asked for, carried through the two-phase flow. For
/// approve-then-act sequences this is serialized into the pending row's
/// next_step column and revived once the approval confirms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionIntent {
    CreateProfile { name: String },
    JournalEntry { content: String },
    BuyTokens { value: U256 },
    CreateClimb { name: String, location: String, difficulty: u8, price: U256 },
    PurchaseClimb { climb_id: u64, price: U256 },
    CreateTournament { entry_fee: U256 },
    JoinTournament { tournament_id: u64, entry_fee: U256 },
    EndTournament { tournament_id: u64, winner: Address },
}

impl ActionIntent {
    pub fn tx_type(&self) -> TxType {
        match self {
            ActionIntent::CreateProfile { .. } => TxType::CreateProfile,
            ActionIntent::JournalEntry { .. } => TxType::JournalEntry,
            ActionIntent::BuyTokens { .. } => TxType::BuyTokens,
            ActionIntent::CreateClimb { .. } => TxType::CreateClimb,
            ActionIntent::PurchaseClimb { .. } => TxType::PurchaseClimb,
            ActionIntent::CreateTournament { .. } => TxType::CreateTournament,
            ActionIntent::JoinTournament { .. } => TxType::JoinTournament,
            ActionIntent::EndTournament { .. } => TxType::EndTournament,
        }
    }

    /// TOURS the contract will pull from the wallet — the amount the
    /// allowance must cover before this intent can run.
    pub fn spend(&self) -> U256 {
        match self {
            ActionIntent::CreateClimb { .. } => super::CLIMB_CREATION_FEE,
            ActionIntent::PurchaseClimb { price, .. } => *price,
            ActionIntent::CreateTournament { entry_fee } => *entry_fee,
            ActionIntent::JoinTournament { entry_fee, .. } => *entry_fee,
            _ => U256::ZERO,
        }
    }

    /// Native value attached to the transaction (only buyTokens is payable).
    pub fn value(&self) -> U256 {
        match self {
            ActionIntent::BuyTokens { value } => *value,
            _ => U256::ZERO,
        }
    }

    /// Short human description for confirmations and /pending output.
    pub fn describe(&self) -> String {
        match self {
            ActionIntent::CreateProfile { name } => format!("create profile '{}'", name),
            ActionIntent::JournalEntry { .. } => "add a journal entry".to_string(),
            ActionIntent::BuyTokens { .. } => "buy TOURS tokens".to_string(),
            ActionIntent::CreateClimb { name, .. } => format!("list climb '{}'", name),
            ActionIntent::PurchaseClimb { climb_id, .. } => format!("purchase climb #{}", climb_id),
            ActionIntent::CreateTournament { .. } => "create a tournament".to_string(),
            ActionIntent::JoinTournament { tournament_id, .. } => {
                format!("join tournament #{}", tournament_id)
            }
            ActionIntent::EndTournament { tournament_id, .. } => {
                format!("end tournament #{}", tournament_id)
            }
        }
    }
}

/// The unsigned transaction handed to the external signer, field names
/// matching what wallet libraries expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTx {
    pub from: String,
    pub to: String,
    pub value: String,
    pub data: String,
    pub gas: String,
    #[serde(rename = "gasPrice")]
    pub gas_price: String,
    pub nonce: String,
    #[serde(rename = "chainId")]
    pub chain_id: u64,
}

impl UnsignedTx {
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tx_type_text_round_trips() {
        for t in [
            TxType::Approve,
            TxType::CreateProfile,
            TxType::JournalEntry,
            TxType::BuyTokens,
            TxType::CreateClimb,
            TxType::PurchaseClimb,
            TxType::CreateTournament,
            TxType::JoinTournament,
            TxType::EndTournament,
        ] {
            let text = t.to_string();
            assert_eq!(text.parse::<TxType>().unwrap(), t);
        }
        assert_eq!(TxType::PurchaseClimb.to_string(), "purchase_climb");
    }

    #[test]
    fn intent_json_round_trips() {
        let intent = ActionIntent::PurchaseClimb {
            climb_id: 3,
            price: U256::from(1_500_000_000_000_000_000u128),
        };
        let json = serde_json::to_string(&intent).unwrap();
        assert!(json.contains("purchase_climb"));
        let back: ActionIntent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, intent);
    }

    #[test]
    fn spend_is_zero_for_non_allowance_actions() {
        assert_eq!(
            ActionIntent::CreateProfile { name: "a".into() }.spend(),
            U256::ZERO
        );
        assert_eq!(
            ActionIntent::BuyTokens { value: U256::from(5u64) }.spend(),
            U256::ZERO
        );
    }

    #[test]
    fn spend_matches_price_for_purchase() {
        let intent = ActionIntent::PurchaseClimb {
            climb_id: 1,
            price: U256::from(42u64),
        };
        assert_eq!(intent.spend(), U256::from(42u64));
    }

    #[test]
    fn only_buy_tokens_carries_value() {
        assert_eq!(
            ActionIntent::BuyTokens { value: U256::from(7u64) }.value(),
            U256::from(7u64)
        );
        assert_eq!(
            ActionIntent::PurchaseClimb { climb_id: 1, price: U256::from(1u64) }.value(),
            U256::ZERO
        );
    }
}
