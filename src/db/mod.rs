pub mod repository;
pub mod sqlite;

pub use sqlite::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Invalid UUID in column {column}: {value}")]
    InvalidUuid { column: String, value: String },

    #[error("Invalid date in column {column}: {value}")]
    InvalidDate { column: String, value: String },
}
