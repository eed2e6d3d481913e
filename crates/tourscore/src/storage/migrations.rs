use anyhow::{Context, Result};
use rusqlite::Connection;
use std::sync::{Mutex, OnceLock};

use crate::storage::db::with_immediate_txn;

mod embedded {
    use refinery::embed_migrations;

    embed_migrations!("./migrations");
}

static MIGRATION_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

/// Apply the embedded migrations.
///
/// At most one runner per process; a second instance pointed at the same
/// database file queues on the immediate transaction taken by
/// [`with_immediate_txn`] instead of interleaving schema changes.
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let _guard = MIGRATION_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| {
            // Migrations are idempotent, so a runner that panicked in
            // another thread left nothing we cannot simply re-run.
            log::warn!("Migration lock was poisoned, recovering...");
            poisoned.into_inner()
        });

    with_immediate_txn(conn, |conn| {
        embedded::migrations::runner()
            .run(conn)
            .map(|_| ())
            .map_err(anyhow::Error::from)
    })
    .context("apply migrations")
}

/// Migration runner for tests, without the outer transaction wrapper
/// (refinery manages its own transactions internally).
#[doc(hidden)]
pub fn run_migrations_for_test(conn: &mut Connection) -> Result<()> {
    embedded::migrations::runner()
        .run(conn)
        .map(|_| ())
        .context("apply migrations")
}
