use serde::Serialize;
use uuid::Uuid;

use super::enums::TransactionKind;

/// A user-owned spending/income category. Wire keys follow the frontend
/// contract (Portuguese).
#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub user_id: Uuid,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "tipo")]
    pub kind: TransactionKind,
    #[serde(rename = "cor")]
    pub color: Option<String>,
}
