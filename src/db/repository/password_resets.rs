use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::parse_uuid;
use crate::db::DatabaseError;

/// Store a password-reset token (hashed) valid until `expires_at`.
pub fn insert_reset(
    conn: &Connection,
    token_hash: &str,
    user_id: &Uuid,
    expires_at: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO password_resets (token_hash, user_id, expires_at, used)
         VALUES (?1, ?2, ?3, 0)",
        params![token_hash, user_id.to_string(), expires_at.to_rfc3339()],
    )?;
    Ok(())
}

/// Validate and burn a reset token. Returns the owning user when the token
/// exists, is unused, and has not expired; the token is marked used in the
/// same call so it can never be replayed.
pub fn consume_reset(
    conn: &Connection,
    token_hash: &str,
    now: DateTime<Utc>,
) -> Result<Option<Uuid>, DatabaseError> {
    let row: Option<(String, String, i64)> = conn
        .query_row(
            "SELECT user_id, expires_at, used FROM password_resets WHERE token_hash = ?1",
            params![token_hash],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;

    let (user_id, expires_at, used) = match row {
        Some(r) => r,
        None => return Ok(None),
    };

    if used != 0 {
        return Ok(None);
    }
    let expired = DateTime::parse_from_rfc3339(&expires_at)
        .map(|t| t.with_timezone(&Utc) < now)
        .unwrap_or(true);
    if expired {
        return Ok(None);
    }

    conn.execute(
        "UPDATE password_resets SET used = 1 WHERE token_hash = ?1",
        params![token_hash],
    )?;
    parse_uuid("password_resets.user_id", &user_id).map(Some)
}
