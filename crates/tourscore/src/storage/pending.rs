//! The pending-transaction ledger.
//!
//! One row per in-flight unsigned transaction. The UNIQUE(user_id, tx_type)
//! constraint is the invariant the whole flow leans on: starting a new
//! transaction of a type that already has one in flight is rejected at
//! insert, not checked in handler code.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::chain::TxType;
use crate::core::error::{AppError, AppResult};

/// An in-flight transaction awaiting a client-side signature (or, once
/// `tx_hash` is set, awaiting its receipt).
#[derive(Debug, Clone)]
pub struct PendingTx {
    pub id: i64,
    pub user_id: i64,
    pub tx_type: TxType,
    pub tx_json: String,
    /// Serialized `ActionIntent`: the next-step descriptor on approve rows,
    /// the cache-update source on everything else
    pub intent_json: Option<String>,
    pub tx_hash: Option<String>,
    pub created_at: i64,
}

fn row_to_pending(row: &rusqlite::Row<'_>) -> rusqlite::Result<PendingTx> {
    let tx_type_raw: String = row.get(2)?;
    let tx_type: TxType = tx_type_raw.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(PendingTx {
        id: row.get(0)?,
        user_id: row.get(1)?,
        tx_type,
        tx_json: row.get(3)?,
        intent_json: row.get(4)?,
        tx_hash: row.get(5)?,
        created_at: row.get(6)?,
    })
}

const SELECT_COLS: &str = "id, user_id, tx_type, tx_json, intent_json, tx_hash, created_at";

/// Record a freshly built unsigned transaction.
///
/// Returns `AppError::PendingConflict` when the user already has an
/// unresolved transaction of this type.
pub fn insert_pending(
    conn: &Connection,
    user_id: i64,
    tx_type: TxType,
    tx_json: &str,
    intent_json: Option<&str>,
) -> AppResult<i64> {
    let result = conn.execute(
        "INSERT INTO pending_transactions (user_id, tx_type, tx_json, intent_json, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user_id, tx_type.to_string(), tx_json, intent_json, Utc::now().timestamp()],
    );

    match result {
        Ok(_) => Ok(conn.last_insert_rowid()),
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
            Err(AppError::PendingConflict(tx_type.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// The user's most recent pending transaction without a relayed hash —
/// the one the next POST /tx submission refers to.
pub fn latest_unsubmitted(conn: &Connection, user_id: i64) -> AppResult<Option<PendingTx>> {
    conn.query_row(
        &format!(
            "SELECT {SELECT_COLS} FROM pending_transactions
             WHERE user_id = ?1 AND tx_hash IS NULL
             ORDER BY created_at DESC, id DESC LIMIT 1"
        ),
        params![user_id],
        row_to_pending,
    )
    .optional()
    .map_err(AppError::from)
}

/// All pending rows for a user, newest first (for /pending).
pub fn list_for_user(conn: &Connection, user_id: i64) -> AppResult<Vec<PendingTx>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLS} FROM pending_transactions
         WHERE user_id = ?1 ORDER BY created_at DESC, id DESC"
    ))?;
    let rows = stmt.query_map(params![user_id], row_to_pending)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn get_by_id(conn: &Connection, id: i64) -> AppResult<Option<PendingTx>> {
    conn.query_row(
        &format!("SELECT {SELECT_COLS} FROM pending_transactions WHERE id = ?1"),
        params![id],
        row_to_pending,
    )
    .optional()
    .map_err(AppError::from)
}

/// Attach the signed hash the user relayed back.
pub fn attach_hash(conn: &Connection, id: i64, tx_hash: &str) -> AppResult<()> {
    conn.execute(
        "UPDATE pending_transactions SET tx_hash = ?2 WHERE id = ?1",
        params![id, tx_hash],
    )?;
    Ok(())
}

/// Remove a resolved pending transaction (receipt observed).
pub fn delete_pending(conn: &Connection, id: i64) -> AppResult<()> {
    conn.execute("DELETE FROM pending_transactions WHERE id = ?1", params![id])?;
    Ok(())
}

/// Drop everything the user has in flight (/cancel). Returns how many rows
/// were discarded.
pub fn clear_for_user(conn: &Connection, user_id: i64) -> AppResult<usize> {
    let n = conn.execute(
        "DELETE FROM pending_transactions WHERE user_id = ?1",
        params![user_id],
    )?;
    Ok(n)
}
