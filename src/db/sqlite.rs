use std::path::Path;

use rusqlite::Connection;

use super::DatabaseError;

/// Open a SQLite connection to the given path and bootstrap the schema.
pub fn open_database(path: &Path) -> Result<Connection, DatabaseError> {
    let conn = Connection::open(path)?;
    configure_pragmas(&conn)?;
    bootstrap_schema(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing).
pub fn open_memory_database() -> Result<Connection, DatabaseError> {
    let conn = Connection::open_in_memory()?;
    configure_pragmas(&conn)?;
    bootstrap_schema(&conn)?;
    Ok(conn)
}

fn configure_pragmas(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA foreign_keys=ON;",
    )?;
    Ok(())
}

/// One-shot schema bootstrap. Idempotent; there is no migration machinery.
pub fn bootstrap_schema(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
             id            TEXT PRIMARY KEY,
             name          TEXT NOT NULL,
             email         TEXT NOT NULL UNIQUE,
             password_hash TEXT NOT NULL,
             created_at    TEXT NOT NULL
         );

         CREATE TABLE IF NOT EXISTS sessions (
             token_hash TEXT PRIMARY KEY,
             user_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
             created_at TEXT NOT NULL
         );

         CREATE TABLE IF NOT EXISTS password_resets (
             token_hash TEXT PRIMARY KEY,
             user_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
             expires_at TEXT NOT NULL,
             used       INTEGER NOT NULL DEFAULT 0
         );

         CREATE TABLE IF NOT EXISTS categories (
             id      TEXT PRIMARY KEY,
             user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
             name    TEXT NOT NULL,
             kind    TEXT NOT NULL,
             color   TEXT
         );

         CREATE TABLE IF NOT EXISTS transactions (
             id          TEXT PRIMARY KEY,
             user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
             category_id TEXT REFERENCES categories(id) ON DELETE SET NULL,
             kind        TEXT NOT NULL,
             description TEXT,
             amount      REAL NOT NULL,
             date        TEXT NOT NULL
         );

         CREATE INDEX IF NOT EXISTS idx_categories_user ON categories(user_id);
         CREATE INDEX IF NOT EXISTS idx_transactions_user ON transactions(user_id);",
    )?;
    Ok(())
}

/// Count tables in the database (for verification).
pub fn count_tables(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}
