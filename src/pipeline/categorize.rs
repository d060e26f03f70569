//! Category resolution for extracted receipts.
//!
//! Two ordered strategies, first hit wins:
//! 1. case-insensitive substring match on the model's suggested name;
//! 2. first stored category of the transaction's kind.
//!
//! No match is a normal outcome: the transaction is stored uncategorized.
//! Lookup failures are logged and treated as no-match, never surfaced to the
//! pipeline.

use rusqlite::Connection;
use uuid::Uuid;

use crate::db::repository::categories;
use crate::models::{Category, TransactionKind};

/// Resolve a category for the owner from the model's suggestion and the
/// transaction kind. Ownership is enforced at the query level so one user's
/// categories never leak into another's match.
pub fn resolve_category(
    conn: &Connection,
    owner_id: &Uuid,
    suggested: Option<&str>,
    kind: Option<TransactionKind>,
) -> Option<Category> {
    if let Some(category) = match_by_suggested_name(conn, owner_id, suggested) {
        tracing::debug!(category = %category.name, "category matched by suggestion");
        return Some(category);
    }
    if let Some(category) = fallback_by_kind(conn, owner_id, kind) {
        tracing::debug!(category = %category.name, "category matched by kind fallback");
        return Some(category);
    }
    tracing::debug!(?suggested, ?kind, "no category matched, storing uncategorized");
    None
}

/// Substring match against the suggested name, ties broken by store order.
fn match_by_suggested_name(
    conn: &Connection,
    owner_id: &Uuid,
    suggested: Option<&str>,
) -> Option<Category> {
    let fragment = suggested.map(str::trim).filter(|s| !s.is_empty())?;

    match categories::find_categories_by_name_like(conn, owner_id, fragment) {
        Ok(mut matches) => {
            if matches.is_empty() {
                None
            } else {
                Some(matches.remove(0))
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "category name lookup failed, skipping match");
            None
        }
    }
}

fn fallback_by_kind(
    conn: &Connection,
    owner_id: &Uuid,
    kind: Option<TransactionKind>,
) -> Option<Category> {
    let kind = kind?;

    match categories::find_first_category_by_kind(conn, owner_id, kind) {
        Ok(found) => found,
        Err(e) => {
            tracing::warn!(error = %e, "category kind lookup failed, skipping match");
            None
        }
    }
}
