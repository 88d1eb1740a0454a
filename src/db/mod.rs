pub mod models;

use chrono::Utc;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use std::path::Path;

use crate::error::AppResult;
use crate::state::DbPool;

pub const MIGRATIONS: &[(&str, &str)] = &[(
    "001_initial",
    include_str!("../../migrations/001_initial.sql"),
)];

pub fn create_pool(db_path: &Path) -> anyhow::Result<DbPool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Per-connection settings; foreign_keys is not persisted in the file
    let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            ",
        )
    });
    let pool = Pool::builder().max_size(8).build(manager)?;

    let conn = pool.get()?;
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        ",
    )?;

    Ok(pool)
}

/// Ensure the schema exists. Safe to call on every startup.
pub fn run_migrations(pool: &DbPool) -> anyhow::Result<()> {
    let mut conn = pool.get()?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    for (name, sql) in MIGRATIONS {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let already_applied: bool = tx.query_row(
            "SELECT COUNT(*) > 0 FROM schema_version WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;

        if !already_applied {
            tracing::info!("Applying migration: {}", name);
            tx.execute_batch(sql)?;
            tx.execute(
                "INSERT INTO schema_version (name) VALUES (?1)",
                params![name],
            )?;
        }
        tx.commit()?;
    }

    tracing::info!("Database migrations complete");
    Ok(())
}

/// Run `f` inside an immediate write transaction. Any error rolls back.
pub fn write<T>(
    pool: &DbPool,
    f: impl FnOnce(&Transaction<'_>) -> AppResult<T>,
) -> AppResult<T> {
    let mut conn = pool.get()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let out = f(&tx)?;
    tx.commit()?;
    Ok(out)
}

/// Run `f` against one read snapshot.
pub fn read<T>(pool: &DbPool, f: impl FnOnce(&Connection) -> AppResult<T>) -> AppResult<T> {
    let mut conn = pool.get()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
    let out = f(&tx)?;
    tx.finish()?;
    Ok(out)
}

/// Current time in microseconds since the Unix epoch.
pub fn now_micros() -> i64 {
    Utc::now().timestamp_micros()
}

/// Next timestamp for an append-only table: never earlier than the last row.
pub(crate) fn next_timestamp(conn: &Connection, table: &str) -> AppResult<i64> {
    let last: i64 = conn.query_row(
        &format!("SELECT COALESCE(MAX(created_at), 0) FROM {}", table),
        [],
        |row| row.get(0),
    )?;
    Ok(now_micros().max(last + 1))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use tempfile::TempDir;

    /// File-backed pool; every connection sees the same database.
    pub fn test_pool() -> (TempDir, DbPool) {
        let tmp = tempfile::tempdir().unwrap();
        let pool = create_pool(&tmp.path().join("test.db")).unwrap();
        run_migrations(&pool).unwrap();
        (tmp, pool)
    }

    pub fn insert_user(pool: &DbPool, id: &str, username: &str) {
        let conn = pool.get().unwrap();
        conn.execute(
            "INSERT INTO users (id, username, password_hash, created_at) VALUES (?1, ?2, 'x', ?3)",
            params![id, username, now_micros()],
        )
        .unwrap();
    }
}
