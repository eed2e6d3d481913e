//! Signed-hash relay: attach the hash to the pending row, wait for the
//! receipt, resolve the row, and — for a confirmed approval — hand the
//! stored next step back to the sequencer.

use std::sync::Arc;

use alloy_primitives::B256;
use rusqlite::Connection;

use tourscore::chain::{ActionIntent, ChainGateway, PreparedTx, Sequencer, TxType};
use tourscore::config;
use tourscore::core::metrics;
use tourscore::core::validation::parse_address;
use tourscore::storage::db::{self, DbPool, SessionState};
use tourscore::storage::pending::{self, PendingTx};
use tourscore::storage::{get_connection, market};
use tourscore::{AppError, AppResult};

use crate::telegram::notifications::relay_lines;

/// Everything the relay needs besides the bot itself.
pub struct RelayContext {
    pub db_pool: Arc<DbPool>,
    pub sequencer: Arc<Sequencer>,
    pub gateway: Arc<dyn ChainGateway>,
}

/// What to tell whom after a submission was processed.
pub struct RelayOutcome {
    pub user_text: String,
    pub group_text: Option<String>,
    /// Step two of an approve-then-act flow, ready for signing
    pub follow_up: Option<PreparedTx>,
}

/// Process a signed hash the external signer POSTed for `user_id`.
///
/// # Errors
///
/// Validation error when the user has no pending transaction awaiting a
/// signature; DB/RPC errors otherwise.
pub async fn process_submission(ctx: &RelayContext, user_id: i64, hash: B256) -> AppResult<RelayOutcome> {
    let pending = {
        let conn = get_connection(&ctx.db_pool)?;
        let pending = pending::latest_unsubmitted(&conn, user_id)?
            .ok_or_else(|| AppError::Validation("no pending transaction awaiting a signature".into()))?;
        pending::attach_hash(&conn, pending.id, &format!("{:?}", hash))?;
        pending
        // the connection drops here; receipt polling must not hold one
    };

    log::info!(
        "Relaying {} tx {:?} for user {} (pending id {})",
        pending.tx_type,
        hash,
        user_id,
        pending.id
    );

    let mut status = None;
    for attempt in 0..config::receipt::POLL_ATTEMPTS {
        if let Some(s) = ctx.gateway.receipt_status(hash).await? {
            status = Some(s);
            break;
        }
        if attempt + 1 < config::receipt::POLL_ATTEMPTS {
            tokio::time::sleep(config::receipt::interval()).await;
        }
    }

    let Some(success) = status else {
        // Not mined within the window. The row keeps its hash; the user can
        // check /pending and the signer may re-submit the same hash later.
        return Ok(RelayOutcome {
            user_text: format!(
                "⏳ Transaction {:?} is not mined yet. It stays pending — check /pending in a bit.",
                hash
            ),
            group_text: None,
            follow_up: None,
        });
    };

    let mut conn = get_connection(&ctx.db_pool)?;
    pending::delete_pending(&conn, pending.id)?;
    let type_label = pending.tx_type.to_string();
    metrics::TX_CONFIRMED_TOTAL
        .with_label_values(&[
            type_label.as_str(),
            if success { "success" } else { "reverted" },
        ])
        .inc();

    let (mut user_text, group_text) = relay_lines(pending.tx_type, success);

    // An approve row's stored intent is the follow-up, which has not run
    // yet — only mirror receipts of the actions themselves.
    if success && pending.tx_type != TxType::Approve {
        apply_cache_update(&mut conn, user_id, &pending, hash);
    }

    let mut follow_up = None;
    if success && pending.tx_type == TxType::Approve {
        match next_step_after_approval(ctx, &conn, user_id, &pending).await {
            Ok(prepared) => follow_up = prepared,
            Err(e) => {
                user_text = format!("{}\n⚠️ Could not build the follow-up transaction: {}", user_text, e);
            }
        }
    }

    Ok(RelayOutcome {
        user_text,
        group_text,
        follow_up,
    })
}

/// Revive the stored intent once its approval confirmed. `Ok(None)` when the
/// approve row carried no next step (should not happen, but tolerated).
async fn next_step_after_approval(
    ctx: &RelayContext,
    conn: &Connection,
    user_id: i64,
    pending: &PendingTx,
) -> AppResult<Option<PreparedTx>> {
    let Some(intent_json) = pending.intent_json.as_deref() else {
        log::warn!("Approve row {} had no stored next step", pending.id);
        return Ok(None);
    };

    match db::get_session_state(conn, user_id, config::session::ttl())? {
        SessionState::Active(session) => {
            let wallet = parse_address(&session.wallet_address)?;
            let prepared = ctx
                .sequencer
                .advance_after_approval(conn, user_id, wallet, intent_json)
                .await?;
            Ok(Some(prepared))
        }
        _ => Err(AppError::Session(
            "your wallet session expired while the approval confirmed — reconnect with /connectwallet and retry".into(),
        )),
    }
}

/// Mirror a confirmed transaction into the off-chain cache. Failures are
/// logged, never surfaced: the chain already has the truth.
fn apply_cache_update(conn: &mut Connection, user_id: i64, pending: &PendingTx, hash: B256) {
    let Some(intent_json) = pending.intent_json.as_deref() else {
        return;
    };
    let intent: ActionIntent = match serde_json::from_str(intent_json) {
        Ok(intent) => intent,
        Err(e) => {
            log::warn!("Unparseable intent on pending row {}: {}", pending.id, e);
            return;
        }
    };

    let result = match intent {
        ActionIntent::JournalEntry { content } => market::insert_journal_entry(conn, user_id, &content),
        ActionIntent::CreateClimb {
            name,
            location,
            difficulty,
            price,
        } => market::cache_new_climb(conn, user_id, &name, &location, difficulty, price).map(|_| ()),
        ActionIntent::PurchaseClimb { climb_id, .. } => {
            market::record_purchase(conn, climb_id, user_id, &format!("{:?}", hash))
        }
        ActionIntent::CreateTournament { entry_fee } => {
            market::cache_new_tournament(conn, user_id, entry_fee).map(|_| ())
        }
        ActionIntent::JoinTournament { tournament_id, .. } => {
            market::record_tournament_entry(conn, tournament_id, user_id, &format!("{:?}", hash))
        }
        ActionIntent::EndTournament { tournament_id, winner } => {
            market::close_tournament(conn, tournament_id, &format!("{:?}", winner)).map(|_| ())
        }
        // Profiles and token buys live on-chain only; approvals cache nothing
        ActionIntent::CreateProfile { .. } | ActionIntent::BuyTokens { .. } => Ok(()),
    };

    if let Err(e) = result {
        log::error!("Cache update after {} for user {} failed: {}", pending.tx_type, user_id, e);
    }
}
