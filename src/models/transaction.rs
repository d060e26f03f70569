use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use super::enums::TransactionKind;

/// A persisted financial transaction. One row per movement of money.
#[derive(Debug, Clone, Serialize)]
pub struct Transaction {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub user_id: Uuid,
    #[serde(rename = "categoria_id")]
    pub category_id: Option<Uuid>,
    #[serde(rename = "tipo")]
    pub kind: TransactionKind,
    #[serde(rename = "descricao")]
    pub description: Option<String>,
    #[serde(rename = "valor")]
    pub amount: f64,
    #[serde(rename = "data")]
    pub date: NaiveDate,
}
