//! Pipeline orchestration: extract, optionally materialize, always release
//! the staged upload.
//!
//! The staged file is deleted on every exit path, success or failure. Both
//! runs are synchronous and expected to be driven from a blocking task; the
//! Gemini call dominates the latency.

use std::sync::Mutex;

use rusqlite::Connection;
use uuid::Uuid;

use super::extractor::{ExtractError, ExtractedReceipt, ReceiptExtractor};
use super::intake::StagedUpload;
use super::materialize::{materialize, MaterializeOutcome};

/// Run the receipt pipeline and store a transaction for `owner_id`.
/// Consumes the upload and releases its file before returning, on every
/// path.
pub fn run_create(
    extractor: &dyn ReceiptExtractor,
    db: &Mutex<Connection>,
    owner_id: &Uuid,
    staged: StagedUpload,
) -> Result<(ExtractedReceipt, MaterializeOutcome), ExtractError> {
    let _span =
        tracing::info_span!("receipt_pipeline", owner = %owner_id, mode = "create").entered();

    let receipt = extract_and_release(extractor, staged)?;
    let outcome = materialize(db, owner_id, &receipt);
    Ok((receipt, outcome))
}

/// Run extraction only; nothing is ever persisted. The staged file is
/// released just the same.
pub fn run_preview(
    extractor: &dyn ReceiptExtractor,
    owner_id: &Uuid,
    staged: StagedUpload,
) -> Result<ExtractedReceipt, ExtractError> {
    let _span =
        tracing::info_span!("receipt_pipeline", owner = %owner_id, mode = "preview").entered();

    extract_and_release(extractor, staged)
}

fn extract_and_release(
    extractor: &dyn ReceiptExtractor,
    staged: StagedUpload,
) -> Result<ExtractedReceipt, ExtractError> {
    let extracted = extractor.extract(staged.path());
    staged.release();
    extracted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::db::repository::transactions::count_transactions;
    use crate::db::repository::users::insert_user;
    use crate::models::{TransactionKind, User};
    use crate::pipeline::extractor::{MockExtractor, RECEIPT_CONFIDENCE};
    use crate::pipeline::intake::{stage_upload, UploadField};
    use std::path::PathBuf;

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

    fn stage_fixture(dir: &std::path::Path) -> (StagedUpload, PathBuf) {
        let staged = stage_upload(
            dir,
            UploadField {
                original_name: "nota.jpg".into(),
                declared_mime: "image/jpeg".into(),
                bytes: b"fake-jpeg".to_vec(),
            },
            1024,
        )
        .unwrap();
        let path = staged.path().to_path_buf();
        (staged, path)
    }

    fn sample_receipt() -> ExtractedReceipt {
        ExtractedReceipt {
            amount: Some(25.50),
            description: Some("Almoço".into()),
            kind: Some(TransactionKind::Expense),
            occurred_on: None,
            suggested_category: None,
            confidence: RECEIPT_CONFIDENCE,
            raw_text: "Processado via Gemini AI".into(),
        }
    }

    #[test]
    fn create_materializes_and_releases_file() {
        let tmp = tempfile::tempdir().unwrap();
        let db = Mutex::new(open_memory_database().unwrap());
        let owner = seeded_user(&db.lock().unwrap());
        let (staged, path) = stage_fixture(tmp.path());

        let extractor = MockExtractor::returning(sample_receipt());
        let (_, outcome) = run_create(&extractor, &db, &owner, staged).unwrap();

        assert!(matches!(outcome, MaterializeOutcome::Created(_)));
        assert!(!path.exists(), "staged file must be deleted");
        assert_eq!(count_transactions(&db.lock().unwrap(), &owner).unwrap(), 1);
    }

    #[test]
    fn preview_stores_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let db = Mutex::new(open_memory_database().unwrap());
        let owner = Uuid::new_v4();
        let (staged, path) = stage_fixture(tmp.path());

        let extractor = MockExtractor::returning(sample_receipt());
        let receipt = run_preview(&extractor, &owner, staged).unwrap();

        assert_eq!(receipt.amount, Some(25.50));
        assert!(!path.exists());
        assert_eq!(count_transactions(&db.lock().unwrap(), &owner).unwrap(), 0);
    }

    #[test]
    fn extraction_failure_still_releases_file() {
        let tmp = tempfile::tempdir().unwrap();
        let db = Mutex::new(open_memory_database().unwrap());
        let owner = Uuid::new_v4();
        let (staged, path) = stage_fixture(tmp.path());

        let extractor = MockExtractor::failing("imagem ilegível");
        let err = run_create(&extractor, &db, &owner, staged).unwrap_err();

        assert!(matches!(err, ExtractError::ExtractionFailed(_)));
        assert!(!path.exists(), "staged file must be deleted on failure too");
        assert_eq!(count_transactions(&db.lock().unwrap(), &owner).unwrap(), 0);
    }

    #[test]
    fn misconfiguration_still_releases_file() {
        let tmp = tempfile::tempdir().unwrap();
        let db = Mutex::new(open_memory_database().unwrap());
        let owner = Uuid::new_v4();
        let (staged, path) = stage_fixture(tmp.path());

        let extractor = MockExtractor::misconfigured();
        let err = run_create(&extractor, &db, &owner, staged).unwrap_err();

        assert!(matches!(err, ExtractError::Misconfigured(_)));
        assert!(!path.exists());
    }

    #[test]
    fn skip_outcome_is_reported_with_receipt() {
        let tmp = tempfile::tempdir().unwrap();
        let db = Mutex::new(open_memory_database().unwrap());
        let owner = Uuid::new_v4();
        let (staged, _path) = stage_fixture(tmp.path());

        let mut receipt = sample_receipt();
        receipt.amount = None;
        let extractor = MockExtractor::returning(receipt);
        let (receipt, outcome) = run_create(&extractor, &db, &owner, staged).unwrap();

        assert!(matches!(outcome, MaterializeOutcome::Skipped));
        assert_eq!(receipt.amount, None);
    }

    #[test]
    fn persistence_failure_still_releases_file() {
        let tmp = tempfile::tempdir().unwrap();
        let db = Mutex::new(open_memory_database().unwrap());
        let owner = Uuid::new_v4();
        let (staged, path) = stage_fixture(tmp.path());
        db.lock()
            .unwrap()
            .execute_batch("DROP TABLE transactions")
            .unwrap();

        let extractor = MockExtractor::returning(sample_receipt());
        let (_, outcome) = run_create(&extractor, &db, &owner, staged).unwrap();

        assert!(matches!(outcome, MaterializeOutcome::PersistFailed));
        assert!(!path.exists());
    }
}
