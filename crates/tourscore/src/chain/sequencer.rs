//! Approve-then-act orchestration.
//!
//! Every chain action funnels through [`Sequencer::prepare`]: it checks the
//! wallet can pay, decides whether an ERC-20 approval has to run first, and
//! records exactly one pending transaction for the user to sign. When the
//! relay observes a confirmed approval it calls
//! [`Sequencer::advance_after_approval`] to re-emit the originally intended
//! transaction as the next pending step.

use std::sync::Arc;

use alloy_primitives::Address;
use rusqlite::Connection;

use crate::chain::gateway::ChainGateway;
use crate::chain::tx::{approve_calldata, build_unsigned, calldata, gas_limit};
use crate::chain::types::{ActionIntent, TxType, UnsignedTx};
use crate::chain::units::format_units;
use crate::core::error::{AppError, AppResult};
use crate::core::metrics;
use crate::storage::pending::insert_pending;

/// A freshly built unsigned transaction, recorded in the ledger and ready
/// to be handed to the signer.
#[derive(Debug, Clone)]
pub struct PreparedTx {
    pub pending_id: i64,
    pub tx_type: TxType,
    pub unsigned: UnsignedTx,
    /// True when this is step one (approve) of a two-phase flow
    pub two_phase: bool,
    /// Human description for the confirmation message
    pub description: String,
}

pub struct Sequencer {
    gateway: Arc<dyn ChainGateway>,
    contract: Address,
    token: Address,
    chain_id: u64,
}

impl Sequencer {
    pub fn new(gateway: Arc<dyn ChainGateway>, contract: Address, token: Address, chain_id: u64) -> Self {
        Self {
            gateway,
            contract,
            token,
            chain_id,
        }
    }

    /// Turn a user intent into the next transaction they must sign.
    ///
    /// Flow for intents that spend TOURS:
    /// 1. balance check — insufficient funds build nothing;
    /// 2. allowance check — short allowance emits an `approve` carrying the
    ///    intent as its next step;
    /// 3. otherwise the intent itself is simulated and emitted.
    ///
    /// # Errors
    ///
    /// `InsufficientBalance`, `Revert` (simulation), `PendingConflict`
    /// (unresolved transaction of the same type), or any RPC failure.
    pub async fn prepare(
        &self,
        conn: &Connection,
        user_id: i64,
        wallet: Address,
        intent: ActionIntent,
    ) -> AppResult<PreparedTx> {
        let spend = intent.spend();

        if !spend.is_zero() {
            let balance = self.gateway.token_balance(wallet).await?;
            if balance < spend {
                return Err(AppError::InsufficientBalance {
                    have: format_units(balance),
                    need: format_units(spend),
                });
            }

            let allowance = self.gateway.allowance(wallet).await?;
            if allowance < spend {
                return self.build_approval(conn, user_id, wallet, intent).await;
            }
        }

        self.build_direct(conn, user_id, wallet, intent).await
    }

    /// Step two of a two-phase flow: the approval confirmed, so build the
    /// transaction the user originally asked for.
    pub async fn advance_after_approval(
        &self,
        conn: &Connection,
        user_id: i64,
        wallet: Address,
        next_step_json: &str,
    ) -> AppResult<PreparedTx> {
        let intent: ActionIntent = serde_json::from_str(next_step_json)?;
        metrics::APPROVALS_CHAINED_TOTAL.inc();
        self.build_direct(conn, user_id, wallet, intent).await
    }

    /// Build and record the approve transaction, stashing the intent as the
    /// next step.
    async fn build_approval(
        &self,
        conn: &Connection,
        user_id: i64,
        wallet: Address,
        intent: ActionIntent,
    ) -> AppResult<PreparedTx> {
        let spend = intent.spend();
        let nonce = self.gateway.transaction_count(wallet).await?;
        let gas_price = self.gateway.gas_price().await?;

        let data = approve_calldata(self.contract, spend);
        let unsigned = build_unsigned(
            wallet,
            self.token,
            alloy_primitives::U256::ZERO,
            &data,
            nonce,
            gas_limit(TxType::Approve),
            gas_price,
            self.chain_id,
        );

        let intent_json = serde_json::to_string(&intent)?;
        let pending_id = insert_pending(conn, user_id, TxType::Approve, &unsigned.to_json(), Some(&intent_json))?;

        metrics::TX_BUILT_TOTAL
            .with_label_values(&[TxType::Approve.to_string().as_str()])
            .inc();
        log::info!(
            "Built approve tx for user {} ({} TOURS units, then {})",
            user_id,
            spend,
            intent.describe()
        );

        Ok(PreparedTx {
            pending_id,
            tx_type: TxType::Approve,
            unsigned,
            two_phase: true,
            description: format!("approve {} TOURS, then {}", format_units(spend), intent.describe()),
        })
    }

    /// Simulate, build, and record the intended transaction itself.
    async fn build_direct(
        &self,
        conn: &Connection,
        user_id: i64,
        wallet: Address,
        intent: ActionIntent,
    ) -> AppResult<PreparedTx> {
        self.gateway.simulate(wallet, &intent).await?;

        let nonce = self.gateway.transaction_count(wallet).await?;
        let gas_price = self.gateway.gas_price().await?;

        let tx_type = intent.tx_type();
        let data = calldata(&intent);
        let unsigned = build_unsigned(
            wallet,
            self.contract,
            intent.value(),
            &data,
            nonce,
            gas_limit(tx_type),
            gas_price,
            self.chain_id,
        );

        let intent_json = serde_json::to_string(&intent)?;
        let pending_id = insert_pending(conn, user_id, tx_type, &unsigned.to_json(), Some(&intent_json))?;

        let type_label = tx_type.to_string();
        metrics::TX_BUILT_TOTAL.with_label_values(&[type_label.as_str()]).inc();
        log::info!("Built {} tx for user {}", tx_type, user_id);

        Ok(PreparedTx {
            pending_id,
            tx_type,
            unsigned,
            two_phase: false,
            description: intent.describe(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::migrations::run_migrations_for_test;
    use crate::storage::pending;
    use alloy_primitives::{B256, U256};
    use async_trait::async_trait;
    use std::str::FromStr;

    struct MockGateway {
        balance: U256,
        allowance: U256,
        revert: Option<String>,
    }

    #[async_trait]
    impl ChainGateway for MockGateway {
        async fn token_balance(&self, _owner: Address) -> AppResult<U256> {
            Ok(self.balance)
        }
        async fn allowance(&self, _owner: Address) -> AppResult<U256> {
            Ok(self.allowance)
        }
        async fn native_balance(&self, _owner: Address) -> AppResult<U256> {
            Ok(U256::ZERO)
        }
        async fn transaction_count(&self, _owner: Address) -> AppResult<u64> {
            Ok(3)
        }
        async fn gas_price(&self) -> AppResult<u128> {
            Ok(2_000_000_000)
        }
        async fn simulate(&self, _from: Address, _intent: &ActionIntent) -> AppResult<()> {
            match &self.revert {
                Some(reason) => Err(AppError::Revert(reason.clone())),
                None => Ok(()),
            }
        }
        async fn receipt_status(&self, _hash: B256) -> AppResult<Option<bool>> {
            Ok(Some(true))
        }
    }

    fn test_conn() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations_for_test(&mut conn).unwrap();
        conn
    }

    fn wallet() -> Address {
        Address::from_str("0x3c499c542cEF5E3811e1192ce70d8cC03d5c3359").unwrap()
    }

    fn contract() -> Address {
        Address::from_str("0x4bFb41d5B3570DeFd03C39a9A4D8dE6Bd8B8982E").unwrap()
    }

    fn token() -> Address {
        Address::from_str("0x2E8D98fd126a32362F2Bd8aA427E59a1ec63F780").unwrap()
    }

    fn sequencer(gw: MockGateway) -> Sequencer {
        Sequencer::new(Arc::new(gw), contract(), token(), 10_143)
    }

    fn purchase_intent() -> ActionIntent {
        ActionIntent::PurchaseClimb {
            climb_id: 3,
            price: U256::from(5u64),
        }
    }

    #[tokio::test]
    async fn sufficient_allowance_emits_the_action_directly() {
        let conn = test_conn();
        let seq = sequencer(MockGateway {
            balance: U256::from(10u64),
            allowance: U256::from(10u64),
            revert: None,
        });

        let prepared = seq.prepare(&conn, 7, wallet(), purchase_intent()).await.unwrap();
        assert!(!prepared.two_phase);
        assert_eq!(prepared.tx_type, TxType::PurchaseClimb);
        assert_eq!(prepared.unsigned.nonce, "0x3");
        // Direct action targets the application contract
        assert_eq!(prepared.unsigned.to.to_lowercase(), format!("{:?}", contract()).to_lowercase());

        let row = pending::get_by_id(&conn, prepared.pending_id).unwrap().unwrap();
        assert_eq!(row.tx_type, TxType::PurchaseClimb);
        let stored: ActionIntent = serde_json::from_str(row.intent_json.as_deref().unwrap()).unwrap();
        assert_eq!(stored, purchase_intent());
    }

    #[tokio::test]
    async fn short_allowance_emits_approve_with_next_step() {
        let conn = test_conn();
        let seq = sequencer(MockGateway {
            balance: U256::from(10u64),
            allowance: U256::from(1u64),
            revert: None,
        });

        let prepared = seq.prepare(&conn, 7, wallet(), purchase_intent()).await.unwrap();
        assert!(prepared.two_phase);
        assert_eq!(prepared.tx_type, TxType::Approve);
        // Approval targets the token contract
        assert_eq!(prepared.unsigned.to.to_lowercase(), format!("{:?}", token()).to_lowercase());

        let row = pending::get_by_id(&conn, prepared.pending_id).unwrap().unwrap();
        let stored: ActionIntent = serde_json::from_str(row.intent_json.as_deref().unwrap()).unwrap();
        assert_eq!(stored, purchase_intent());
    }

    #[tokio::test]
    async fn insufficient_balance_builds_nothing() {
        let conn = test_conn();
        let seq = sequencer(MockGateway {
            balance: U256::from(1u64),
            allowance: U256::from(100u64),
            revert: None,
        });

        let err = seq.prepare(&conn, 7, wallet(), purchase_intent()).await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientBalance { .. }));
        assert!(pending::list_for_user(&conn, 7).unwrap().is_empty());
    }

    #[tokio::test]
    async fn simulation_revert_builds_nothing() {
        let conn = test_conn();
        let seq = sequencer(MockGateway {
            balance: U256::from(10u64),
            allowance: U256::from(10u64),
            revert: Some("this climb was already purchased by that wallet".into()),
        });

        let err = seq.prepare(&conn, 7, wallet(), purchase_intent()).await.unwrap_err();
        assert!(matches!(err, AppError::Revert(_)));
        assert!(pending::list_for_user(&conn, 7).unwrap().is_empty());
    }

    #[tokio::test]
    async fn second_prepare_of_same_type_conflicts() {
        let conn = test_conn();
        let seq = sequencer(MockGateway {
            balance: U256::from(10u64),
            allowance: U256::from(10u64),
            revert: None,
        });

        seq.prepare(&conn, 7, wallet(), purchase_intent()).await.unwrap();
        let err = seq.prepare(&conn, 7, wallet(), purchase_intent()).await.unwrap_err();
        assert!(matches!(err, AppError::PendingConflict(_)));
    }

    #[tokio::test]
    async fn approval_flow_re_emits_the_original_action() {
        let conn = test_conn();
        let seq = sequencer(MockGateway {
            balance: U256::from(10u64),
            allowance: U256::from(1u64),
            revert: None,
        });

        // Step 1: the approve goes out, carrying the intent
        let approve = seq.prepare(&conn, 7, wallet(), purchase_intent()).await.unwrap();
        let row = pending::get_by_id(&conn, approve.pending_id).unwrap().unwrap();
        let next_step = row.intent_json.clone().unwrap();

        // The relay observed the approval receipt and cleared the row
        pending::delete_pending(&conn, approve.pending_id).unwrap();

        // Step 2: the original action comes back as the new pending tx
        let follow_up = seq
            .advance_after_approval(&conn, 7, wallet(), &next_step)
            .await
            .unwrap();
        assert_eq!(follow_up.tx_type, TxType::PurchaseClimb);
        assert!(!follow_up.two_phase);

        let rows = pending::list_for_user(&conn, 7).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].tx_type, TxType::PurchaseClimb);
    }

    #[tokio::test]
    async fn zero_spend_actions_skip_the_allowance_path() {
        let conn = test_conn();
        // Allowance of zero must not matter for a journal entry
        let seq = sequencer(MockGateway {
            balance: U256::ZERO,
            allowance: U256::ZERO,
            revert: None,
        });

        let prepared = seq
            .prepare(
                &conn,
                7,
                wallet(),
                ActionIntent::JournalEntry {
                    content: "topped out at sunset".into(),
                },
            )
            .await
            .unwrap();
        assert!(!prepared.two_phase);
        assert_eq!(prepared.tx_type, TxType::JournalEntry);
    }

    #[tokio::test]
    async fn buy_tokens_carries_native_value() {
        let conn = test_conn();
        let seq = sequencer(MockGateway {
            balance: U256::ZERO,
            allowance: U256::ZERO,
            revert: None,
        });

        let prepared = seq
            .prepare(
                &conn,
                7,
                wallet(),
                ActionIntent::BuyTokens {
                    value: U256::from(0x2540be400u64), // 10 gwei, arbitrary
                },
            )
            .await
            .unwrap();
        assert_eq!(prepared.unsigned.value, "0x2540be400");
    }
}
