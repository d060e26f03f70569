use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{parse_date, parse_uuid};
use crate::db::DatabaseError;
use crate::models::{Transaction, TransactionKind};

pub fn insert_transaction(conn: &Connection, tx: &Transaction) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO transactions (id, user_id, category_id, kind, description, amount, date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            tx.id.to_string(),
            tx.user_id.to_string(),
            tx.category_id.map(|id| id.to_string()),
            tx.kind.as_str(),
            tx.description,
            tx.amount,
            tx.date.to_string(),
        ],
    )?;
    Ok(())
}

pub fn list_transactions(
    conn: &Connection,
    user_id: &Uuid,
) -> Result<Vec<Transaction>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, category_id, kind, description, amount, date
         FROM transactions WHERE user_id = ?1 ORDER BY date DESC, rowid DESC",
    )?;
    let rows = stmt.query_map(params![user_id.to_string()], transaction_row)?;

    let mut transactions = Vec::new();
    for row in rows {
        transactions.push(transaction_from_row(row?)?);
    }
    Ok(transactions)
}

pub fn count_transactions(conn: &Connection, user_id: &Uuid) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM transactions WHERE user_id = ?1",
        params![user_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}

type TransactionRow = (String, String, Option<String>, String, Option<String>, f64, String);

fn transaction_row(row: &rusqlite::Row) -> rusqlite::Result<TransactionRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn transaction_from_row(row: TransactionRow) -> Result<Transaction, DatabaseError> {
    Ok(Transaction {
        id: parse_uuid("transactions.id", &row.0)?,
        user_id: parse_uuid("transactions.user_id", &row.1)?,
        category_id: row
            .2
            .as_deref()
            .map(|v| parse_uuid("transactions.category_id", v))
            .transpose()?,
        kind: TransactionKind::from_str(&row.3)?,
        description: row.4,
        amount: row.5,
        date: parse_date("transactions.date", &row.6)?,
    })
}
