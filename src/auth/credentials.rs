use rusqlite::{params, Connection, OptionalExtension};

use crate::db::{self, models::UserId};
use crate::error::{sqlite_code, AppError, AppResult};
use crate::state::DbPool;

pub const MAX_USERNAME_CHARS: usize = 64;
/// bcrypt only looks at the first 72 bytes of its input.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Create a user with a bcrypt-hashed password. Returns the new user id.
pub fn register(pool: &DbPool, username: &str, password: &str, cost: u32) -> AppResult<UserId> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(AppError::InvalidInput(
            "Username and password are required".into(),
        ));
    }
    if username.chars().count() > MAX_USERNAME_CHARS {
        return Err(AppError::InvalidInput(format!(
            "Username must be {} characters or less",
            MAX_USERNAME_CHARS
        )));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AppError::InvalidInput(format!(
            "Password must be {} bytes or less",
            MAX_PASSWORD_BYTES
        )));
    }

    let password_hash = bcrypt::hash(password, cost)?;
    let user_id = UserId::generate();

    db::write(pool, |tx| {
        tx.execute(
            "INSERT INTO users (id, username, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![user_id.as_str(), username, password_hash, db::now_micros()],
        )
        .map_err(|e| match sqlite_code(&e) {
            Some(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE)
            | Some(rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY) => AppError::DuplicateUsername,
            _ => AppError::Database(e),
        })?;
        Ok(())
    })?;

    tracing::info!(user_id = %user_id, username, "Registered user");
    Ok(user_id)
}

/// Check a username/password pair. Unknown users are `NotFound`, wrong passwords `Unauthorized`.
pub fn verify(pool: &DbPool, username: &str, password: &str) -> AppResult<UserId> {
    let username = username.trim();
    let row: Option<(String, String)> = {
        let conn = pool.get()?;
        conn.query_row(
            "SELECT id, password_hash FROM users WHERE username = ?1",
            params![username],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?
    };

    let (id, password_hash) = row.ok_or(AppError::NotFound)?;
    if bcrypt::verify(password, &password_hash)? {
        Ok(UserId(id))
    } else {
        tracing::warn!(username, "Password mismatch");
        Err(AppError::Unauthorized)
    }
}

pub fn username_of(conn: &Connection, user_id: &UserId) -> AppResult<String> {
    conn.query_row(
        "SELECT username FROM users WHERE id = ?1",
        params![user_id.as_str()],
        |row| row.get(0),
    )
    .optional()?
    .ok_or(AppError::NotFound)
}
