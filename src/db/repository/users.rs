use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::parse_uuid;
use crate::db::DatabaseError;
use crate::models::User;

pub fn insert_user(conn: &Connection, user: &User) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO users (id, name, email, password_hash, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            user.id.to_string(),
            user.name,
            user.email,
            user.password_hash,
            user.created_at,
        ],
    )?;
    Ok(())
}

pub fn find_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, name, email, password_hash, created_at FROM users WHERE email = ?1",
            params![email],
            user_row,
        )
        .optional()?;
    row.map(user_from_row).transpose()
}

pub fn find_user_by_id(conn: &Connection, id: &Uuid) -> Result<Option<User>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, name, email, password_hash, created_at FROM users WHERE id = ?1",
            params![id.to_string()],
            user_row,
        )
        .optional()?;
    row.map(user_from_row).transpose()
}

pub fn update_user_password(
    conn: &Connection,
    id: &Uuid,
    password_hash: &str,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE users SET password_hash = ?1 WHERE id = ?2",
        params![password_hash, id.to_string()],
    )?;
    Ok(())
}

type UserRow = (String, String, String, String, String);

fn user_row(row: &rusqlite::Row) -> rusqlite::Result<UserRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn user_from_row(row: UserRow) -> Result<User, DatabaseError> {
    Ok(User {
        id: parse_uuid("users.id", &row.0)?,
        name: row.1,
        email: row.2,
        password_hash: row.3,
        created_at: row.4,
    })
}
