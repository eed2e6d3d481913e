//! End-to-end relay tests: pending ledger → signed hash → receipt →
//! notification lines and, for approvals, the follow-up transaction.

use std::str::FromStr;
use std::sync::Arc;

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use tempfile::NamedTempFile;

use tourscore::chain::{ActionIntent, ChainGateway, Sequencer, TxType};
use tourscore::storage::db::upsert_session;
use tourscore::storage::{create_pool, get_connection, market, pending, DbPool};
use tourscore::{AppError, AppResult};

use toursbot::server::relay::{process_submission, RelayContext};

const USER: i64 = 7;

struct MockGateway {
    balance: U256,
    allowance: U256,
    receipt: Option<bool>,
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
        Ok(0)
    }
    async fn gas_price(&self) -> AppResult<u128> {
        Ok(1_000_000_000)
    }
    async fn simulate(&self, _from: Address, _intent: &ActionIntent) -> AppResult<()> {
        Ok(())
    }
    async fn receipt_status(&self, _hash: B256) -> AppResult<Option<bool>> {
        Ok(self.receipt)
    }
}

fn wallet() -> Address {
    Address::from_str("0x3c499c542cEF5E3811e1192ce70d8cC03d5c3359").unwrap()
}

fn tx_hash() -> B256 {
    B256::from_str("0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b").unwrap()
}

/// Build a pool (on a temp file — in-memory pools give every connection its
/// own database), a sequencer over the mock gateway, and the relay context.
fn setup(gateway: MockGateway) -> (NamedTempFile, Arc<DbPool>, RelayContext) {
    let db_file = NamedTempFile::new().unwrap();
    let pool = Arc::new(create_pool(db_file.path().to_str().unwrap()).unwrap());

    let gateway: Arc<dyn ChainGateway> = Arc::new(gateway);
    let contract = Address::from_str("0x4bFb41d5B3570DeFd03C39a9A4D8dE6Bd8B8982E").unwrap();
    let token = Address::from_str("0x2E8D98fd126a32362F2Bd8aA427E59a1ec63F780").unwrap();
    let sequencer = Arc::new(Sequencer::new(gateway.clone(), contract, token, 10_143));

    let ctx = RelayContext {
        db_pool: pool.clone(),
        sequencer,
        gateway,
    };
    (db_file, pool, ctx)
}

#[tokio::test]
async fn approval_confirmation_re_emits_the_original_action() {
    let (_guard, pool, ctx) = setup(MockGateway {
        balance: U256::from(100u64),
        allowance: U256::ZERO, // forces the two-phase path
        receipt: Some(true),
    });

    {
        let conn = get_connection(&pool).unwrap();
        upsert_session(&conn, USER, &format!("{:?}", wallet())).unwrap();

        let prepared = ctx
            .sequencer
            .prepare(
                &conn,
                USER,
                wallet(),
                ActionIntent::PurchaseClimb {
                    climb_id: 1,
                    price: U256::from(5u64),
                },
            )
            .await
            .unwrap();
        assert_eq!(prepared.tx_type, TxType::Approve);
        assert!(prepared.two_phase);
    }

    let outcome = process_submission(&ctx, USER, tx_hash()).await.unwrap();

    assert!(outcome.user_text.contains("Approval confirmed"));
    let follow_up = outcome.follow_up.expect("follow-up transaction must be emitted");
    assert_eq!(follow_up.tx_type, TxType::PurchaseClimb);

    // The ledger now holds exactly the follow-up, not the approval
    let conn = get_connection(&pool).unwrap();
    let rows = pending::list_for_user(&conn, USER).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].tx_type, TxType::PurchaseClimb);

    // The purchase itself has not confirmed, so the cache must not show it
    assert!(!market::user_holds_climb(&conn, 1, USER).unwrap());
}

#[tokio::test]
async fn confirmed_climb_listing_lands_in_the_cache_and_broadcasts() {
    let (_guard, pool, ctx) = setup(MockGateway {
        balance: U256::from(10u64).pow(U256::from(19u64)), // 10 TOURS
        allowance: U256::from(10u64).pow(U256::from(19u64)),
        receipt: Some(true),
    });

    {
        let conn = get_connection(&pool).unwrap();
        upsert_session(&conn, USER, &format!("{:?}", wallet())).unwrap();
        ctx.sequencer
            .prepare(
                &conn,
                USER,
                wallet(),
                ActionIntent::CreateClimb {
                    name: "Moonlight Arête".into(),
                    location: "North face, third buttress".into(),
                    difficulty: 7,
                    price: U256::from(5u64),
                },
            )
            .await
            .unwrap();
    }

    let outcome = process_submission(&ctx, USER, tx_hash()).await.unwrap();

    assert!(outcome.user_text.contains("listed"));
    assert!(outcome.group_text.is_some(), "new listings broadcast to the group");
    assert!(outcome.follow_up.is_none());

    let conn = get_connection(&pool).unwrap();
    let climb = market::get_climb(&conn, 1).unwrap().expect("cache row must exist");
    assert_eq!(climb.name, "Moonlight Arête");
    assert_eq!(climb.location, "North face, third buttress");
    assert!(pending::list_for_user(&conn, USER).unwrap().is_empty());
}

#[tokio::test]
async fn confirmed_join_lands_in_the_participants_cache() {
    let (_guard, pool, ctx) = setup(MockGateway {
        balance: U256::from(100u64),
        allowance: U256::from(100u64), // covers the fee, so no approve step
        receipt: Some(true),
    });

    {
        let conn = get_connection(&pool).unwrap();
        ctx.sequencer
            .prepare(
                &conn,
                USER,
                wallet(),
                ActionIntent::JoinTournament {
                    tournament_id: 1,
                    entry_fee: U256::from(5u64),
                },
            )
            .await
            .unwrap();
    }

    let outcome = process_submission(&ctx, USER, tx_hash()).await.unwrap();

    assert!(outcome.user_text.contains("You are in"));
    assert!(outcome.follow_up.is_none());

    let conn = get_connection(&pool).unwrap();
    assert_eq!(market::tournament_entry_count(&conn, 1).unwrap(), 1);
    assert!(pending::list_for_user(&conn, USER).unwrap().is_empty());
}

#[tokio::test]
async fn reverted_receipt_clears_the_row_without_cache_update() {
    let (_guard, pool, ctx) = setup(MockGateway {
        balance: U256::from(100u64),
        allowance: U256::from(100u64),
        receipt: Some(false),
    });

    {
        let conn = get_connection(&pool).unwrap();
        ctx.sequencer
            .prepare(
                &conn,
                USER,
                wallet(),
                ActionIntent::JournalEntry {
                    content: "sandbagged again".into(),
                },
            )
            .await
            .unwrap();
    }

    let outcome = process_submission(&ctx, USER, tx_hash()).await.unwrap();

    assert!(outcome.user_text.contains("reverted"));
    assert!(outcome.group_text.is_none());
    assert!(outcome.follow_up.is_none());

    let conn = get_connection(&pool).unwrap();
    // Row resolved, cache untouched
    assert!(pending::list_for_user(&conn, USER).unwrap().is_empty());
    assert!(market::list_journal_entries(&conn, USER, 10).unwrap().is_empty());
}

#[tokio::test]
async fn submission_without_a_pending_tx_is_rejected() {
    let (_guard, _pool, ctx) = setup(MockGateway {
        balance: U256::ZERO,
        allowance: U256::ZERO,
        receipt: Some(true),
    });

    let err = process_submission(&ctx, USER, tx_hash()).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn expired_session_blocks_the_follow_up_step() {
    let (_guard, pool, ctx) = setup(MockGateway {
        balance: U256::from(100u64),
        allowance: U256::ZERO,
        receipt: Some(true),
    });

    {
        let conn = get_connection(&pool).unwrap();
        upsert_session(&conn, USER, &format!("{:?}", wallet())).unwrap();
        ctx.sequencer
            .prepare(
                &conn,
                USER,
                wallet(),
                ActionIntent::JoinTournament {
                    tournament_id: 1,
                    entry_fee: U256::from(5u64),
                },
            )
            .await
            .unwrap();

        // Backdate the session past the TTL while the approval is in flight
        conn.execute(
            "UPDATE sessions SET connected_at = connected_at - 200000 WHERE user_id = ?1",
            rusqlite::params![USER],
        )
        .unwrap();
    }

    let outcome = process_submission(&ctx, USER, tx_hash()).await.unwrap();

    assert!(outcome.follow_up.is_none());
    assert!(outcome.user_text.contains("reconnect"));

    // The approval itself was still resolved
    let conn = get_connection(&pool).unwrap();
    assert!(pending::list_for_user(&conn, USER).unwrap().is_empty());
}
