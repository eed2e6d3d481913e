//! Off-chain cache of on-chain listings: climbs, purchases, journal entries,
//! tournaments. The chain is the source of truth; these rows exist so /climbs
//! and friends answer without an RPC round-trip.

use alloy_primitives::U256;
use rusqlite::{params, Connection, OptionalExtension};

use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::storage::db::with_immediate_txn;
use crate::storage::obfuscate::{obfuscate, reveal};

/// A cached climb listing. `location` is plaintext here; it is stored
/// obfuscated and only revealed to users who hold the listing.
#[derive(Debug, Clone)]
pub struct Climb {
    pub onchain_id: u64,
    pub creator_id: i64,
    pub name: String,
    pub location: String,
    pub difficulty: u8,
    pub price: U256,
}

#[derive(Debug, Clone)]
pub struct Tournament {
    pub onchain_id: u64,
    pub creator_id: i64,
    pub entry_fee: U256,
    pub active: bool,
    pub winner_address: Option<String>,
}

#[derive(Debug, Clone)]
pub struct JournalEntry {
    pub id: i64,
    pub content: String,
    pub created_at: String,
}

fn parse_units(s: &str) -> AppResult<U256> {
    U256::from_str_radix(s, 10).map_err(|e| AppError::Validation(format!("corrupt units column: {}", e)))
}

fn row_to_climb(row: &rusqlite::Row<'_>) -> rusqlite::Result<(i64, i64, String, String, u8, String)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn climb_from_parts(parts: (i64, i64, String, String, u8, String)) -> AppResult<Climb> {
    let (onchain_id, creator_id, name, location_enc, difficulty, price_units) = parts;
    Ok(Climb {
        onchain_id: onchain_id as u64,
        creator_id,
        name,
        location: reveal(&config::OBFUSCATION_KEY, &location_enc)?,
        difficulty,
        price: parse_units(&price_units)?,
    })
}

/// Next unused on-chain climb id, mirroring the contract's counter.
pub fn next_climb_id(conn: &Connection) -> AppResult<u64> {
    let max: Option<i64> = conn.query_row("SELECT MAX(onchain_id) FROM climbs", [], |row| row.get(0))?;
    Ok(max.unwrap_or(0) as u64 + 1)
}

pub fn insert_climb(conn: &Connection, climb: &Climb) -> AppResult<()> {
    conn.execute(
        "INSERT INTO climbs (onchain_id, creator_id, name, location_enc, difficulty, price_units)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            climb.onchain_id as i64,
            climb.creator_id,
            climb.name,
            obfuscate(&config::OBFUSCATION_KEY, &climb.location),
            climb.difficulty,
            climb.price.to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_climb(conn: &Connection, onchain_id: u64) -> AppResult<Option<Climb>> {
    conn.query_row(
        "SELECT onchain_id, creator_id, name, location_enc, difficulty, price_units
         FROM climbs WHERE onchain_id = ?1",
        params![onchain_id as i64],
        row_to_climb,
    )
    .optional()?
    .map(climb_from_parts)
    .transpose()
}

/// All listings, oldest first (for /climbs).
pub fn list_climbs(conn: &Connection) -> AppResult<Vec<Climb>> {
    let mut stmt = conn.prepare(
        "SELECT onchain_id, creator_id, name, location_enc, difficulty, price_units
         FROM climbs ORDER BY onchain_id",
    )?;
    let rows = stmt.query_map([], row_to_climb)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(climb_from_parts(row?)?);
    }
    Ok(out)
}

/// Allocate the next climb id and insert the listing in one transaction,
/// so two relays confirming at once cannot race the counter. Returns the
/// id the listing landed under.
pub fn cache_new_climb(
    conn: &mut Connection,
    creator_id: i64,
    name: &str,
    location: &str,
    difficulty: u8,
    price: U256,
) -> AppResult<u64> {
    with_immediate_txn(conn, |conn| {
        let onchain_id = next_climb_id(conn)?;
        insert_climb(
            conn,
            &Climb {
                onchain_id,
                creator_id,
                name: name.to_string(),
                location: location.to_string(),
                difficulty,
                price,
            },
        )?;
        Ok(onchain_id)
    })
}

pub fn record_purchase(conn: &Connection, climb_id: u64, buyer_id: i64, tx_hash: &str) -> AppResult<()> {
    conn.execute(
        "INSERT INTO purchases (climb_id, buyer_id, tx_hash) VALUES (?1, ?2, ?3)",
        params![climb_id as i64, buyer_id, tx_hash],
    )?;
    Ok(())
}

/// Whether the user bought (or created) the climb — controls whether the
/// obfuscated location is revealed to them.
pub fn user_holds_climb(conn: &Connection, climb_id: u64, user_id: i64) -> AppResult<bool> {
    let bought: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM purchases WHERE climb_id = ?1 AND buyer_id = ?2)",
        params![climb_id as i64, user_id],
        |row| row.get(0),
    )?;
    if bought {
        return Ok(true);
    }
    let created: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM climbs WHERE onchain_id = ?1 AND creator_id = ?2)",
        params![climb_id as i64, user_id],
        |row| row.get(0),
    )?;
    Ok(created)
}

pub fn insert_journal_entry(conn: &Connection, user_id: i64, content: &str) -> AppResult<()> {
    conn.execute(
        "INSERT INTO journal_entries (user_id, content_enc) VALUES (?1, ?2)",
        params![user_id, obfuscate(&config::OBFUSCATION_KEY, content)],
    )?;
    Ok(())
}

/// The user's latest journal entries, newest first.
pub fn list_journal_entries(conn: &Connection, user_id: i64, limit: usize) -> AppResult<Vec<JournalEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, content_enc, created_at FROM journal_entries
         WHERE user_id = ?1 ORDER BY id DESC LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![user_id, limit as i64], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
    })?;
    let mut out = Vec::new();
    for row in rows {
        let (id, content_enc, created_at) = row?;
        out.push(JournalEntry {
            id,
            content: reveal(&config::OBFUSCATION_KEY, &content_enc)?,
            created_at,
        });
    }
    Ok(out)
}

pub fn next_tournament_id(conn: &Connection) -> AppResult<u64> {
    let max: Option<i64> = conn.query_row("SELECT MAX(onchain_id) FROM tournaments", [], |row| row.get(0))?;
    Ok(max.unwrap_or(0) as u64 + 1)
}

pub fn insert_tournament(conn: &Connection, onchain_id: u64, creator_id: i64, entry_fee: U256) -> AppResult<()> {
    conn.execute(
        "INSERT INTO tournaments (onchain_id, creator_id, entry_fee_units) VALUES (?1, ?2, ?3)",
        params![onchain_id as i64, creator_id, entry_fee.to_string()],
    )?;
    Ok(())
}

/// Allocate the next tournament id and insert it in one transaction
/// (see [`cache_new_climb`]). Returns the new id.
pub fn cache_new_tournament(conn: &mut Connection, creator_id: i64, entry_fee: U256) -> AppResult<u64> {
    with_immediate_txn(conn, |conn| {
        let onchain_id = next_tournament_id(conn)?;
        insert_tournament(conn, onchain_id, creator_id, entry_fee)?;
        Ok(onchain_id)
    })
}

/// Mirror a confirmed joinTournament receipt. Duplicates are ignored: the
/// contract rejects re-joins, so a repeat here is a replayed relay.
pub fn record_tournament_entry(conn: &Connection, tournament_id: u64, user_id: i64, tx_hash: &str) -> AppResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO tournament_entries (tournament_id, user_id, tx_hash) VALUES (?1, ?2, ?3)",
        params![tournament_id as i64, user_id, tx_hash],
    )?;
    Ok(())
}

/// How many climbers are in a tournament (for the join prompt).
pub fn tournament_entry_count(conn: &Connection, tournament_id: u64) -> AppResult<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM tournament_entries WHERE tournament_id = ?1",
        params![tournament_id as i64],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

pub fn get_tournament(conn: &Connection, onchain_id: u64) -> AppResult<Option<Tournament>> {
    conn.query_row(
        "SELECT onchain_id, creator_id, entry_fee_units, active, winner_address
         FROM tournaments WHERE onchain_id = ?1",
        params![onchain_id as i64],
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, bool>(3)?,
                row.get::<_, Option<String>>(4)?,
            ))
        },
    )
    .optional()?
    .map(|(onchain_id, creator_id, fee, active, winner_address)| {
        Ok(Tournament {
            onchain_id: onchain_id as u64,
            creator_id,
            entry_fee: parse_units(&fee)?,
            active,
            winner_address,
        })
    })
    .transpose()
}

pub fn close_tournament(conn: &Connection, onchain_id: u64, winner_address: &str) -> AppResult<bool> {
    let changed = conn.execute(
        "UPDATE tournaments SET active = 0, winner_address = ?2 WHERE onchain_id = ?1 AND active = 1",
        params![onchain_id as i64, winner_address],
    )?;
    Ok(changed > 0)
}
