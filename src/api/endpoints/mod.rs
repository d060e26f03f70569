//! API endpoint handlers. Each module corresponds to one frontend feature.

pub mod auth;
pub mod categories;
pub mod health;
pub mod ocr;
pub mod password;
pub mod transactions;
