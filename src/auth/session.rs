use axum::http::{header, HeaderMap};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::AppResult;
use crate::state::DbPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Valid(i64),
    Expired,
    NotFound,
}

/// Owns session issuance, lookup and revocation. A user holds at most one
/// session: logging in again replaces the previous token.
#[derive(Clone)]
pub struct SessionStore {
    pool: DbPool,
    hours: u64,
}

impl SessionStore {
    pub fn new(pool: DbPool, hours: u64) -> Self {
        Self { pool, hours }
    }

    pub fn hours(&self) -> u64 {
        self.hours
    }

    /// Create a session for `user_id` and return its token.
    pub fn issue(&self, user_id: i64) -> AppResult<String> {
        let mut conn = self.pool.get()?;
        let token = uuid::Uuid::new_v4().to_string();

        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM sessions WHERE user_id = ?1 OR expires_at <= datetime('now')",
            params![user_id],
        )?;
        tx.execute(
            "INSERT INTO sessions (user_id, token, expires_at)
             VALUES (?1, ?2, datetime('now', ?3))",
            params![user_id, token, format!("+{} hours", self.hours)],
        )?;
        tx.commit()?;

        Ok(token)
    }

    pub fn validate(&self, token: &str) -> AppResult<SessionStatus> {
        let conn = self.pool.get()?;
        Ok(self.validate_on(&conn, token)?)
    }

    /// Same as [`validate`](Self::validate) on a connection the caller already holds.
    pub fn validate_on(&self, conn: &Connection, token: &str) -> rusqlite::Result<SessionStatus> {
        if token.trim().is_empty() {
            return Ok(SessionStatus::NotFound);
        }
        let row: Option<(i64, bool)> = conn
            .query_row(
                "SELECT user_id, expires_at > datetime('now') FROM sessions WHERE token = ?1",
                params![token],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        Ok(match row {
            Some((user_id, true)) => SessionStatus::Valid(user_id),
            Some((_, false)) => SessionStatus::Expired,
            None => SessionStatus::NotFound,
        })
    }

    /// Delete a session by token. Returns whether a row was removed.
    pub fn revoke(&self, token: &str) -> AppResult<bool> {
        let conn = self.pool.get()?;
        let removed = conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
        Ok(removed > 0)
    }

    pub fn purge_expired(&self) -> AppResult<usize> {
        let conn = self.pool.get()?;
        let purged = conn.execute(
            "DELETE FROM sessions WHERE expires_at <= datetime('now')",
            [],
        )?;
        Ok(purged)
    }
}

pub fn session_cookie(name: &str, token: &str, hours: u64) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        name,
        token,
        hours * 3600
    )
}

pub fn clear_session_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", name)
}

/// Value of cookie `name` across every `Cookie` header, if present and non-empty.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .find_map(|cookie| {
            let (key, val) = cookie.trim().split_once('=')?;
            (key.trim() == name).then(|| val.trim())
        })
        .filter(|v| !v.is_empty())
}
