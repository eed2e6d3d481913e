use chrono::Utc;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension};
use std::time::Duration;

use crate::core::error::{AppError, AppResult};
use crate::storage::migrations::run_migrations;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// A known Telegram user.
pub struct User {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub created_at: String,
}

/// A wallet session. `connected_at` is unix seconds.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: i64,
    pub wallet_address: String,
    pub connected_at: i64,
}

/// Outcome of a session lookup against the TTL.
#[derive(Debug, Clone)]
pub enum SessionState {
    /// No wallet was ever connected
    Missing,
    /// A session exists but its TTL ran out
    Expired(Session),
    /// Live session
    Active(Session),
}

/// Onboarding application status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum AppStatus {
    Pending,
    Approved,
    Rejected,
}

/// An onboarding application, gating all privileged commands.
#[derive(Debug, Clone)]
pub struct Application {
    pub user_id: i64,
    pub name: String,
    pub location: String,
    pub experience: String,
    pub status: AppStatus,
}

/// How long a writer waits on a locked database before giving up.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// Run `f` inside a `BEGIN IMMEDIATE` transaction after arming the busy
/// timeout: commit on success, best-effort rollback on error. Writers that
/// span several statements (migrations, cache writes that allocate an id
/// and then insert) go through here so a second process blocks instead of
/// interleaving.
pub fn with_immediate_txn<T, E>(
    conn: &mut Connection,
    f: impl FnOnce(&mut Connection) -> Result<T, E>,
) -> Result<T, E>
where
    E: From<rusqlite::Error>,
{
    conn.busy_timeout(BUSY_TIMEOUT).map_err(E::from)?;
    conn.execute_batch("BEGIN IMMEDIATE").map_err(E::from)?;

    match f(conn) {
        Ok(value) => {
            conn.execute_batch("COMMIT").map_err(E::from)?;
            Ok(value)
        }
        Err(err) => {
            let _ = conn.execute_batch("ROLLBACK");
            Err(err)
        }
    }
}

/// Create a new database connection pool
///
/// Initializes a connection pool with up to 10 connections and runs schema
/// migrations on the first connection.
pub fn create_pool(database_path: &str) -> AppResult<DbPool> {
    let manager = SqliteConnectionManager::file(database_path);
    let pool = Pool::builder().max_size(10).build(manager)?;

    let mut conn = pool.get()?;
    run_migrations(&mut conn)?;

    Ok(pool)
}

/// Get a connection from the pool
pub fn get_connection(pool: &DbPool) -> AppResult<DbConnection> {
    pool.get().map_err(AppError::from)
}

/// Insert a user row if it does not exist yet; refreshes the username
/// when it changed on the Telegram side.
pub fn create_user(conn: &Connection, telegram_id: i64, username: Option<String>) -> AppResult<()> {
    conn.execute(
        "INSERT INTO users (telegram_id, username) VALUES (?1, ?2)
         ON CONFLICT(telegram_id) DO UPDATE SET username = excluded.username",
        params![telegram_id, username],
    )?;
    Ok(())
}

pub fn get_user(conn: &Connection, telegram_id: i64) -> AppResult<Option<User>> {
    conn.query_row(
        "SELECT telegram_id, username, created_at FROM users WHERE telegram_id = ?1",
        params![telegram_id],
        |row| {
            Ok(User {
                telegram_id: row.get(0)?,
                username: row.get(1)?,
                created_at: row.get(2)?,
            })
        },
    )
    .optional()
    .map_err(AppError::from)
}

pub fn get_all_users(conn: &Connection) -> AppResult<Vec<User>> {
    let mut stmt = conn.prepare("SELECT telegram_id, username, created_at FROM users")?;
    let rows = stmt.query_map([], |row| {
        Ok(User {
            telegram_id: row.get(0)?,
            username: row.get(1)?,
            created_at: row.get(2)?,
        })
    })?;
    let mut users = Vec::new();
    for row in rows {
        users.push(row?);
    }
    Ok(users)
}

/// Create or overwrite the user's wallet session. Connecting again simply
/// restarts the TTL with the (possibly new) address.
pub fn upsert_session(conn: &Connection, user_id: i64, wallet_address: &str) -> AppResult<()> {
    conn.execute(
        "INSERT INTO sessions (user_id, wallet_address, connected_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(user_id) DO UPDATE SET
             wallet_address = excluded.wallet_address,
             connected_at = excluded.connected_at",
        params![user_id, wallet_address, Utc::now().timestamp()],
    )?;
    Ok(())
}

/// Look up the user's session and classify it against the TTL.
pub fn get_session_state(conn: &Connection, user_id: i64, ttl: Duration) -> AppResult<SessionState> {
    let session = conn
        .query_row(
            "SELECT user_id, wallet_address, connected_at FROM sessions WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(Session {
                    user_id: row.get(0)?,
                    wallet_address: row.get(1)?,
                    connected_at: row.get(2)?,
                })
            },
        )
        .optional()?;

    let Some(session) = session else {
        return Ok(SessionState::Missing);
    };

    let age = Utc::now().timestamp().saturating_sub(session.connected_at);
    if age >= 0 && (age as u64) < ttl.as_secs() {
        Ok(SessionState::Active(session))
    } else {
        Ok(SessionState::Expired(session))
    }
}

/// Submit (or resubmit) an onboarding application. Resubmitting resets the
/// status to pending for a fresh review.
pub fn submit_application(
    conn: &Connection,
    user_id: i64,
    name: &str,
    location: &str,
    experience: &str,
) -> AppResult<()> {
    conn.execute(
        "INSERT INTO applications (user_id, name, location, experience, status)
         VALUES (?1, ?2, ?3, ?4, 'pending')
         ON CONFLICT(user_id) DO UPDATE SET
             name = excluded.name,
             location = excluded.location,
             experience = excluded.experience,
             status = 'pending',
             submitted_at = datetime('now')",
        params![user_id, name, location, experience],
    )?;
    Ok(())
}

pub fn get_application(conn: &Connection, user_id: i64) -> AppResult<Option<Application>> {
    conn.query_row(
        "SELECT user_id, name, location, experience, status FROM applications WHERE user_id = ?1",
        params![user_id],
        |row| {
            let status: String = row.get(4)?;
            Ok(Application {
                user_id: row.get(0)?,
                name: row.get(1)?,
                location: row.get(2)?,
                experience: row.get(3)?,
                status: status.parse().unwrap_or(AppStatus::Pending),
            })
        },
    )
    .optional()
    .map_err(AppError::from)
}

pub fn set_application_status(conn: &Connection, user_id: i64, status: AppStatus) -> AppResult<bool> {
    let changed = conn.execute(
        "UPDATE applications SET status = ?2 WHERE user_id = ?1",
        params![user_id, status.to_string()],
    )?;
    Ok(changed > 0)
}

/// Applications awaiting review, oldest first.
pub fn list_pending_applications(conn: &Connection) -> AppResult<Vec<Application>> {
    let mut stmt = conn.prepare(
        "SELECT user_id, name, location, experience, status
         FROM applications WHERE status = 'pending' ORDER BY submitted_at",
    )?;
    let rows = stmt.query_map([], |row| {
        let status: String = row.get(4)?;
        Ok(Application {
            user_id: row.get(0)?,
            name: row.get(1)?,
            location: row.get(2)?,
            experience: row.get(3)?,
            status: status.parse().unwrap_or(AppStatus::Pending),
        })
    })?;
    let mut apps = Vec::new();
    for row in rows {
        apps.push(row?);
    }
    Ok(apps)
}

/// True when the user's application exists and was approved. This is the
/// gate in front of every privileged command.
pub fn is_approved(conn: &Connection, user_id: i64) -> AppResult<bool> {
    Ok(matches!(
        get_application(conn, user_id)?,
        Some(Application {
            status: AppStatus::Approved,
            ..
        })
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::migrations::run_migrations_for_test;

    fn test_conn() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations_for_test(&mut conn).unwrap();
        conn
    }

    #[test]
    fn immediate_txn_commits_on_success() {
        let mut conn = test_conn();
        with_immediate_txn::<_, AppError>(&mut conn, |conn| {
            create_user(conn, 1, Some("alice".into()))?;
            create_user(conn, 2, Some("bob".into()))?;
            Ok(())
        })
        .unwrap();
        assert!(get_user(&conn, 1).unwrap().is_some());
        assert!(get_user(&conn, 2).unwrap().is_some());
    }

    #[test]
    fn immediate_txn_rolls_back_on_error() {
        let mut conn = test_conn();
        let result = with_immediate_txn(&mut conn, |conn| {
            create_user(conn, 1, None)?;
            Err::<(), _>(AppError::Validation("boom".into()))
        });
        assert!(result.is_err());
        // The first statement must not survive the failed batch
        assert!(get_user(&conn, 1).unwrap().is_none());
    }

    #[test]
    fn create_user_is_idempotent() {
        let conn = test_conn();
        create_user(&conn, 42, Some("alice".into())).unwrap();
        create_user(&conn, 42, Some("alice_renamed".into())).unwrap();
        let user = get_user(&conn, 42).unwrap().unwrap();
        assert_eq!(user.username.as_deref(), Some("alice_renamed"));
    }

    #[test]
    fn missing_session_reports_missing() {
        let conn = test_conn();
        assert!(matches!(
            get_session_state(&conn, 7, Duration::from_secs(60)).unwrap(),
            SessionState::Missing
        ));
    }

    #[test]
    fn fresh_session_is_active() {
        let conn = test_conn();
        upsert_session(&conn, 7, "0x3c499c542cEF5E3811e1192ce70d8cC03d5c3359").unwrap();
        assert!(matches!(
            get_session_state(&conn, 7, Duration::from_secs(60)).unwrap(),
            SessionState::Active(_)
        ));
    }

    #[test]
    fn old_session_is_expired() {
        let conn = test_conn();
        // Backdate the connect timestamp past the TTL
        conn.execute(
            "INSERT INTO sessions (user_id, wallet_address, connected_at) VALUES (7, '0xabc', ?1)",
            params![Utc::now().timestamp() - 120],
        )
        .unwrap();
        assert!(matches!(
            get_session_state(&conn, 7, Duration::from_secs(60)).unwrap(),
            SessionState::Expired(_)
        ));
    }

    #[test]
    fn reconnect_restarts_the_ttl() {
        let conn = test_conn();
        conn.execute(
            "INSERT INTO sessions (user_id, wallet_address, connected_at) VALUES (7, '0xabc', ?1)",
            params![Utc::now().timestamp() - 120],
        )
        .unwrap();
        upsert_session(&conn, 7, "0xdef").unwrap();
        match get_session_state(&conn, 7, Duration::from_secs(60)).unwrap() {
            SessionState::Active(s) => assert_eq!(s.wallet_address, "0xdef"),
            other => panic!("expected active session, got {:?}", other),
        }
    }

    #[test]
    fn application_gating() {
        let conn = test_conn();
        assert!(!is_approved(&conn, 7).unwrap());

        submit_application(&conn, 7, "Alice", "Yosemite", "5 years trad").unwrap();
        assert!(!is_approved(&conn, 7).unwrap());

        set_application_status(&conn, 7, AppStatus::Approved).unwrap();
        assert!(is_approved(&conn, 7).unwrap());

        set_application_status(&conn, 7, AppStatus::Rejected).unwrap();
        assert!(!is_approved(&conn, 7).unwrap());
    }

    #[test]
    fn resubmit_resets_status_to_pending() {
        let conn = test_conn();
        submit_application(&conn, 7, "Alice", "Yosemite", "5 years trad").unwrap();
        set_application_status(&conn, 7, AppStatus::Rejected).unwrap();
        submit_application(&conn, 7, "Alice", "Siurana", "6 years sport").unwrap();
        let app = get_application(&conn, 7).unwrap().unwrap();
        assert_eq!(app.status, AppStatus::Pending);
        assert_eq!(app.location, "Siurana");
    }

    #[test]
    fn set_status_for_unknown_user_changes_nothing() {
        let conn = test_conn();
        assert!(!set_application_status(&conn, 999, AppStatus::Approved).unwrap());
    }
}
