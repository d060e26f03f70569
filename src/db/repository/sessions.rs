use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::parse_uuid;
use crate::db::DatabaseError;

/// Store a new session. Only the SHA-256 hash of the bearer token is kept.
pub fn insert_session(
    conn: &Connection,
    token_hash: &str,
    user_id: &Uuid,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO sessions (token_hash, user_id, created_at) VALUES (?1, ?2, ?3)",
        params![token_hash, user_id.to_string(), chrono::Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

/// Resolve a token hash to its owner, if the session exists.
pub fn find_user_by_token(
    conn: &Connection,
    token_hash: &str,
) -> Result<Option<Uuid>, DatabaseError> {
    let id: Option<String> = conn
        .query_row(
            "SELECT user_id FROM sessions WHERE token_hash = ?1",
            params![token_hash],
            |row| row.get(0),
        )
        .optional()?;
    id.map(|v| parse_uuid("sessions.user_id", &v)).transpose()
}

pub fn delete_session(conn: &Connection, token_hash: &str) -> Result<(), DatabaseError> {
    conn.execute("DELETE FROM sessions WHERE token_hash = ?1", params![token_hash])?;
    Ok(())
}
