//! Materialization: turns an extracted receipt into a stored transaction.
//!
//! A receipt with no positive amount is skipped rather than rejected, and a
//! storage error downgrades to a typed outcome instead of failing the
//! request. Either way the caller still gets the extraction back.

use std::sync::Mutex;

use chrono::Local;
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use super::categorize::resolve_category;
use super::extractor::ExtractedReceipt;
use crate::db::repository::transactions::insert_transaction;
use crate::models::{Transaction, TransactionKind};

/// Compact echo of a stored transaction, returned to the frontend alongside
/// the extraction.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionSummary {
    pub id: Uuid,
    pub descricao: Option<String>,
    pub valor: f64,
    pub tipo: TransactionKind,
}

/// What materialization did with the receipt. `PersistFailed` is a normal
/// outcome, not an error: extraction already succeeded and the caller reports
/// it with the extraction attached.
#[derive(Debug, Clone)]
pub enum MaterializeOutcome {
    Created(TransactionSummary),
    /// No positive amount, nothing worth storing.
    Skipped,
    PersistFailed,
}

/// Materialize one extracted receipt for `owner_id`. Missing kind defaults to
/// expense, missing date to today (server local time).
pub fn materialize(
    db: &Mutex<Connection>,
    owner_id: &Uuid,
    receipt: &ExtractedReceipt,
) -> MaterializeOutcome {
    let amount = match receipt.amount {
        Some(v) if v > 0.0 => v,
        _ => {
            tracing::info!(amount = ?receipt.amount, "no positive amount, skipping transaction");
            return MaterializeOutcome::Skipped;
        }
    };

    let kind = receipt.kind.unwrap_or(TransactionKind::Expense);
    let date = receipt
        .occurred_on
        .unwrap_or_else(|| Local::now().date_naive());

    let conn = match db.lock() {
        Ok(conn) => conn,
        Err(poisoned) => poisoned.into_inner(),
    };

    let category_id = resolve_category(
        &conn,
        owner_id,
        receipt.suggested_category.as_deref(),
        receipt.kind,
    )
    .map(|c| c.id);

    let transaction = Transaction {
        id: Uuid::new_v4(),
        user_id: *owner_id,
        category_id,
        kind,
        description: receipt.description.clone(),
        amount,
        date,
    };

    if let Err(e) = insert_transaction(&conn, &transaction) {
        tracing::error!(error = %e, "failed to persist extracted transaction");
        return MaterializeOutcome::PersistFailed;
    }

    tracing::info!(
        transaction_id = %transaction.id,
        amount = transaction.amount,
        kind = %transaction.kind.as_str(),
        categorized = category_id.is_some(),
        "transaction created from receipt"
    );

    MaterializeOutcome::Created(TransactionSummary {
        id: transaction.id,
        descricao: transaction.description,
        valor: transaction.amount,
        tipo: transaction.kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::db::repository::categories::insert_category;
    use crate::db::repository::transactions::{count_transactions, list_transactions};
    use crate::db::repository::users::insert_user;
    use crate::models::{Category, User};
    use crate::pipeline::extractor::RECEIPT_CONFIDENCE;
    use chrono::NaiveDate;

    fn seeded_user(conn: &Connection) -> Uuid {
        let id = Uuid::new_v4();
        let user = User {
            id,
            name: "Ana".into(),
            email: format!("{id}@example.com"),
            password_hash: "hash".into(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        insert_user(conn, &user).unwrap();
        id
    }

    fn receipt(amount: Option<f64>) -> ExtractedReceipt {
        ExtractedReceipt {
            amount,
            description: Some("Almoço".into()),
            kind: Some(TransactionKind::Expense),
            occurred_on: Some(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()),
            suggested_category: Some("Alimentação".into()),
            confidence: RECEIPT_CONFIDENCE,
            raw_text: "Processado via Gemini AI".into(),
        }
    }

    #[test]
    fn creates_transaction_with_resolved_category() {
        let db = Mutex::new(open_memory_database().unwrap());
        let owner = seeded_user(&db.lock().unwrap());
        let category = Category {
            id: Uuid::new_v4(),
            user_id: owner,
            name: "Alimentação".into(),
            kind: TransactionKind::Expense,
            color: None,
        };
        insert_category(&db.lock().unwrap(), &category).unwrap();

        let outcome = materialize(&db, &owner, &receipt(Some(25.50)));

        let summary = match outcome {
            MaterializeOutcome::Created(s) => s,
            other => panic!("expected Created, got {other:?}"),
        };
        assert_eq!(summary.valor, 25.50);
        assert_eq!(summary.tipo, TransactionKind::Expense);

        let conn = db.lock().unwrap();
        let stored = list_transactions(&conn, &owner).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].category_id, Some(category.id));
        assert_eq!(
            stored[0].date,
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
        );
    }

    #[test]
    fn creates_uncategorized_when_nothing_matches() {
        let db = Mutex::new(open_memory_database().unwrap());
        let owner = seeded_user(&db.lock().unwrap());

        let outcome = materialize(&db, &owner, &receipt(Some(10.0)));
        assert!(matches!(outcome, MaterializeOutcome::Created(_)));

        let conn = db.lock().unwrap();
        let stored = list_transactions(&conn, &owner).unwrap();
        assert_eq!(stored[0].category_id, None);
    }

    #[test]
    fn missing_amount_is_skipped() {
        let db = Mutex::new(open_memory_database().unwrap());
        let owner = Uuid::new_v4();

        assert!(matches!(
            materialize(&db, &owner, &receipt(None)),
            MaterializeOutcome::Skipped
        ));
        assert_eq!(count_transactions(&db.lock().unwrap(), &owner).unwrap(), 0);
    }

    #[test]
    fn zero_and_negative_amounts_are_skipped() {
        let db = Mutex::new(open_memory_database().unwrap());
        let owner = Uuid::new_v4();

        assert!(matches!(
            materialize(&db, &owner, &receipt(Some(0.0))),
            MaterializeOutcome::Skipped
        ));
        assert!(matches!(
            materialize(&db, &owner, &receipt(Some(-3.0))),
            MaterializeOutcome::Skipped
        ));
        assert_eq!(count_transactions(&db.lock().unwrap(), &owner).unwrap(), 0);
    }

    #[test]
    fn insert_failure_becomes_persist_failed() {
        let db = Mutex::new(open_memory_database().unwrap());
        let owner = Uuid::new_v4();
        db.lock()
            .unwrap()
            .execute_batch("DROP TABLE transactions")
            .unwrap();

        assert!(matches!(
            materialize(&db, &owner, &receipt(Some(25.50))),
            MaterializeOutcome::PersistFailed
        ));
    }

    #[test]
    fn missing_kind_defaults_to_expense() {
        let db = Mutex::new(open_memory_database().unwrap());
        let owner = seeded_user(&db.lock().unwrap());
        let mut r = receipt(Some(8.0));
        r.kind = None;

        let summary = match materialize(&db, &owner, &r) {
            MaterializeOutcome::Created(s) => s,
            other => panic!("expected Created, got {other:?}"),
        };
        assert_eq!(summary.tipo, TransactionKind::Expense);
    }

    #[test]
    fn missing_date_defaults_to_today() {
        let db = Mutex::new(open_memory_database().unwrap());
        let owner = seeded_user(&db.lock().unwrap());
        let mut r = receipt(Some(8.0));
        r.occurred_on = None;

        materialize(&db, &owner, &r);

        let conn = db.lock().unwrap();
        let stored = list_transactions(&conn, &owner).unwrap();
        assert_eq!(stored[0].date, Local::now().date_naive());
    }
}
