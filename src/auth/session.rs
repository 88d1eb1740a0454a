use std::fmt;
use std::sync::Arc;

use chrono::Duration;
use hmac::{Hmac, Mac};
use rand::Rng;
use rusqlite::{params, OptionalExtension};
use sha2::Sha256;

use crate::db::{
    self,
    models::{UserId, Viewer},
};
use crate::error::AppResult;
use crate::state::DbPool;

type HmacSha256 = Hmac<Sha256>;

/// Opaque proof of a prior login: `<session-id>.<hex mac>`.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Never print the token itself.
impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(..)")
    }
}

/// Issues, resolves and revokes session tokens.
///
/// Sessions are rows in the `sessions` table so logout takes effect
/// immediately and survives restarts. Each token also carries an HMAC
/// over its session id keyed by the injected secret, so forged or
/// foreign tokens are rejected before any database lookup.
#[derive(Clone)]
pub struct SessionAuthority {
    secret: Arc<[u8]>,
    ttl: Duration,
}

impl SessionAuthority {
    /// Lifetimes too large for a `Duration` are clamped to the largest one.
    pub fn new(secret: impl AsRef<[u8]>, ttl_hours: u64) -> Self {
        let ttl = i64::try_from(ttl_hours)
            .ok()
            .and_then(Duration::try_hours)
            .unwrap_or(Duration::MAX);
        Self {
            secret: Arc::from(secret.as_ref()),
            ttl,
        }
    }

    /// Create a session for `user_id` and return its token.
    pub fn issue(&self, pool: &DbPool, user_id: &UserId) -> AppResult<SessionToken> {
        let session_id = generate_session_id();
        let now = db::now_micros();
        let expires_at = now.saturating_add(self.ttl.num_microseconds().unwrap_or(i64::MAX));

        db::write(pool, |tx| {
            tx.execute(
                "INSERT INTO sessions (id, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
                params![session_id, user_id.as_str(), now, expires_at],
            )?;
            Ok(())
        })?;

        tracing::debug!(user_id = %user_id, "Issued session");
        Ok(SessionToken(format!("{}.{}", session_id, self.sign(&session_id))))
    }

    /// Map a token to its user. Anything short of a live, correctly signed
    /// session resolves to `Viewer::Anonymous`.
    pub fn resolve(&self, pool: &DbPool, token: Option<&str>) -> AppResult<Viewer> {
        let Some(session_id) = token.and_then(|t| self.verified_session_id(t)) else {
            return Ok(Viewer::Anonymous);
        };

        let conn = pool.get()?;
        let user_id: Option<String> = conn
            .query_row(
                "SELECT u.id FROM sessions s \
                 JOIN users u ON u.id = s.user_id \
                 WHERE s.id = ?1 AND s.expires_at > ?2",
                params![session_id, db::now_micros()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(user_id.map_or(Viewer::Anonymous, |id| Viewer::User(UserId(id))))
    }

    /// Invalidate a token. Unknown or already revoked tokens are ignored.
    pub fn revoke(&self, pool: &DbPool, token: &str) -> AppResult<()> {
        let Some(session_id) = self.verified_session_id(token) else {
            return Ok(());
        };

        db::write(pool, |tx| {
            tx.execute("DELETE FROM sessions WHERE id = ?1", params![session_id])?;
            Ok(())
        })
    }

    /// Delete expired sessions. Returns how many were removed.
    pub fn purge_expired(&self, pool: &DbPool) -> AppResult<usize> {
        let removed = db::write(pool, |tx| {
            Ok(tx.execute(
                "DELETE FROM sessions WHERE expires_at <= ?1",
                params![db::now_micros()],
            )?)
        })?;
        if removed > 0 {
            tracing::info!("Purged {} expired sessions", removed);
        }
        Ok(removed)
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size")
    }

    fn sign(&self, session_id: &str) -> String {
        let mut mac = self.mac();
        mac.update(session_id.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn verified_session_id<'a>(&self, token: &'a str) -> Option<&'a str> {
        let (session_id, signature) = token.trim().split_once('.')?;
        let signature = hex::decode(signature).ok()?;
        let mut mac = self.mac();
        mac.update(session_id.as_bytes());
        mac.verify_slice(&signature).ok()?;
        Some(session_id)
    }
}

/// Generate a random 32-byte hex session id.
fn generate_session_id() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    hex::encode(bytes)
}

/// Generate a random secret for when none is configured.
pub fn generate_secret() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(bytes)
}
