//! RPC access behind a trait so the sequencer is testable without a node.
//!
//! The live implementation builds a fresh provider per call, which keeps the
//! provider type out of struct signatures and matches how short-lived RPC
//! reads are used here (one or two calls per bot command).

use std::str::FromStr;

use alloy_primitives::{Address, B256, U256};
use alloy_provider::network::ReceiptResponse;
use alloy_provider::{Provider, ProviderBuilder};
use async_trait::async_trait;

use crate::chain::abi::{IEmpowerTours, IERC20};
use crate::chain::types::ActionIntent;
use crate::core::config;
use crate::core::error::{AppError, AppResult};

/// Everything the sequencer and relay need from the chain.
#[async_trait]
pub trait ChainGateway: Send + Sync {
    /// TOURS balance of `owner`.
    async fn token_balance(&self, owner: Address) -> AppResult<U256>;

    /// TOURS allowance `owner` granted the EmpowerTours contract.
    async fn allowance(&self, owner: Address) -> AppResult<U256>;

    /// Native coin balance of `owner` (for /balance display).
    async fn native_balance(&self, owner: Address) -> AppResult<U256>;

    /// Next nonce for `owner`.
    async fn transaction_count(&self, owner: Address) -> AppResult<u64>;

    /// Current gas price in wei.
    async fn gas_price(&self) -> AppResult<u128>;

    /// eth_call the intent from `from`; Err(Revert) with a classified reason
    /// when the node reports a revert.
    async fn simulate(&self, from: Address, intent: &ActionIntent) -> AppResult<()>;

    /// Receipt status for a relayed hash: None while unmined, then
    /// Some(true/false) for success/revert.
    async fn receipt_status(&self, hash: B256) -> AppResult<Option<bool>>;
}

/// Live JSON-RPC implementation.
pub struct RpcGateway {
    rpc_url: url::Url,
    token: Address,
    contract: Address,
}

impl RpcGateway {
    pub fn new(rpc_url: url::Url, token: Address, contract: Address) -> Self {
        Self { rpc_url, token, contract }
    }

    /// Build the gateway from environment configuration.
    ///
    /// # Errors
    ///
    /// Returns a validation error when RPC_URL, TOURS_TOKEN_ADDRESS, or
    /// CONTRACT_ADDRESS is missing or malformed.
    pub fn from_config() -> AppResult<Self> {
        let rpc_url = url::Url::parse(&config::RPC_URL)?;
        let token = Address::from_str(&config::TOURS_TOKEN_ADDRESS)
            .map_err(|e| AppError::Validation(format!("TOURS_TOKEN_ADDRESS: {}", e)))?;
        let contract = Address::from_str(&config::CONTRACT_ADDRESS)
            .map_err(|e| AppError::Validation(format!("CONTRACT_ADDRESS: {}", e)))?;
        Ok(Self::new(rpc_url, token, contract))
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    pub fn token(&self) -> Address {
        self.token
    }
}

#[async_trait]
impl ChainGateway for RpcGateway {
    async fn token_balance(&self, owner: Address) -> AppResult<U256> {
        let provider = ProviderBuilder::new().connect_http(self.rpc_url.clone());
        let token = IERC20::new(self.token, &provider);
        let balance: U256 = token
            .balanceOf(owner)
            .call()
            .await
            .map_err(|e| AppError::Rpc(format!("balanceOf failed: {}", e)))?;
        Ok(balance)
    }

    async fn allowance(&self, owner: Address) -> AppResult<U256> {
        let provider = ProviderBuilder::new().connect_http(self.rpc_url.clone());
        let token = IERC20::new(self.token, &provider);
        let allowance: U256 = token
            .allowance(owner, self.contract)
            .call()
            .await
            .map_err(|e| AppError::Rpc(format!("allowance failed: {}", e)))?;
        Ok(allowance)
    }

    async fn native_balance(&self, owner: Address) -> AppResult<U256> {
        let provider = ProviderBuilder::new().connect_http(self.rpc_url.clone());
        provider
            .get_balance(owner)
            .await
            .map_err(|e| AppError::Rpc(format!("getBalance failed: {}", e)))
    }

    async fn transaction_count(&self, owner: Address) -> AppResult<u64> {
        let provider = ProviderBuilder::new().connect_http(self.rpc_url.clone());
        provider
            .get_transaction_count(owner)
            .await
            .map_err(|e| AppError::Rpc(format!("getTransactionCount failed: {}", e)))
    }

    async fn gas_price(&self) -> AppResult<u128> {
        let provider = ProviderBuilder::new().connect_http(self.rpc_url.clone());
        provider
            .get_gas_price()
            .await
            .map_err(|e| AppError::Rpc(format!("gasPrice failed: {}", e)))
    }

    async fn simulate(&self, from: Address, intent: &ActionIntent) -> AppResult<()> {
        let provider = ProviderBuilder::new().connect_http(self.rpc_url.clone());
        let tours = IEmpowerTours::new(self.contract, &provider);

        let result = match intent {
            ActionIntent::CreateProfile { name } => {
                tours.createProfile(name.clone()).from(from).call().await.map(|_| ())
            }
            ActionIntent::JournalEntry { content } => {
                tours.addJournalEntry(content.clone()).from(from).call().await.map(|_| ())
            }
            ActionIntent::BuyTokens { value } => {
                tours.buyTokens().from(from).value(*value).call().await.map(|_| ())
            }
            ActionIntent::CreateClimb {
                name,
                location,
                difficulty,
                price,
            } => tours
                .createClimb(name.clone(), location.clone(), *difficulty, *price)
                .from(from)
                .call()
                .await
                .map(|_| ()),
            ActionIntent::PurchaseClimb { climb_id, .. } => tours
                .purchaseClimb(U256::from(*climb_id))
                .from(from)
                .call()
                .await
                .map(|_| ()),
            ActionIntent::CreateTournament { entry_fee } => {
                tours.createTournament(*entry_fee).from(from).call().await.map(|_| ())
            }
            ActionIntent::JoinTournament { tournament_id, .. } => tours
                .joinTournament(U256::from(*tournament_id))
                .from(from)
                .call()
                .await
                .map(|_| ()),
            ActionIntent::EndTournament { tournament_id, winner } => tours
                .endTournament(U256::from(*tournament_id), *winner)
                .from(from)
                .call()
                .await
                .map(|_| ()),
        };

        result.map_err(map_call_error)
    }

    async fn receipt_status(&self, hash: B256) -> AppResult<Option<bool>> {
        let provider = ProviderBuilder::new().connect_http(self.rpc_url.clone());
        let receipt = provider
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| AppError::Rpc(format!("getTransactionReceipt failed: {}", e)))?;
        Ok(receipt.map(|r| r.status()))
    }
}

/// Split contract-call failures into reverts (classified for the user) and
/// transport problems.
fn map_call_error(e: alloy_contract::Error) -> AppError {
    let msg = e.to_string();
    if msg.to_lowercase().contains("revert") {
        AppError::Revert(classify_revert(&msg))
    } else {
        AppError::Rpc(msg)
    }
}

/// Best-effort mapping of known revert strings to something a user can act
/// on. Unknown reasons pass through trimmed.
pub fn classify_revert(raw: &str) -> String {
    let lower = raw.to_lowercase();

    if lower.contains("profile") && lower.contains("exists") {
        return "a profile already exists for this wallet".to_string();
    }
    if lower.contains("no profile") || (lower.contains("profile") && lower.contains("required")) {
        return "create a profile first with /createprofile".to_string();
    }
    if lower.contains("allowance") {
        return "the token allowance is too low".to_string();
    }
    if lower.contains("exceeds balance") || lower.contains("insufficient balance") {
        return "the wallet's TOURS balance is too low".to_string();
    }
    if lower.contains("already purchased") {
        return "this climb was already purchased by that wallet".to_string();
    }
    if lower.contains("already joined") {
        return "this wallet already joined the tournament".to_string();
    }
    if lower.contains("not active") || lower.contains("ended") {
        return "the tournament is not active".to_string();
    }
    if lower.contains("organizer") || lower.contains("not authorized") || lower.contains("ownable") {
        return "only the organizer can do that".to_string();
    }

    // Fall back to the raw reason, minus the boilerplate prefix
    raw.trim()
        .trim_start_matches("execution reverted:")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn known_reverts_are_classified() {
        assert_eq!(
            classify_revert("execution reverted: Profile already exists"),
            "a profile already exists for this wallet"
        );
        assert_eq!(
            classify_revert("execution reverted: ERC20: transfer amount exceeds balance"),
            "the wallet's TOURS balance is too low"
        );
        assert_eq!(
            classify_revert("execution reverted: ERC20: insufficient allowance"),
            "the token allowance is too low"
        );
        assert_eq!(
            classify_revert("execution reverted: Tournament not active"),
            "the tournament is not active"
        );
        assert_eq!(
            classify_revert("execution reverted: Caller is not the organizer"),
            "only the organizer can do that"
        );
    }

    #[test]
    fn unknown_reverts_pass_through_trimmed() {
        assert_eq!(
            classify_revert("execution reverted: Strange custom reason"),
            "Strange custom reason"
        );
    }

    #[test]
    fn from_config_requires_addresses() {
        // CONTRACT_ADDRESS defaults to empty in tests, so this must fail
        // cleanly instead of panicking.
        if std::env::var("CONTRACT_ADDRESS").is_err() {
            assert!(RpcGateway::from_config().is_err());
        }
    }
}
