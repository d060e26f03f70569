use uuid::Uuid;

/// A registered account. Never serialized directly — endpoints expose a
/// trimmed view without the password hash.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}
