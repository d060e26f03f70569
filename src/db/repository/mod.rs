pub mod categories;
pub mod password_resets;
pub mod sessions;
pub mod transactions;
pub mod users;

use chrono::NaiveDate;
use uuid::Uuid;

use super::DatabaseError;

/// Parse a TEXT column holding a UUID.
pub(crate) fn parse_uuid(column: &str, value: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(value).map_err(|_| DatabaseError::InvalidUuid {
        column: column.into(),
        value: value.into(),
    })
}

/// Parse a TEXT column holding a YYYY-MM-DD date.
pub(crate) fn parse_date(column: &str, value: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| DatabaseError::InvalidDate {
        column: column.into(),
        value: value.into(),
    })
}
