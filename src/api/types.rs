//! Shared types for the HTTP API layer.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::mailer::Mailer;
use crate::pipeline::extractor::ReceiptExtractor;

// ═══════════════════════════════════════════════════════════
// API context — shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes and middleware. The extractor and
/// mailer are trait objects so tests can substitute mocks without touching
/// the router.
#[derive(Clone)]
pub struct ApiContext {
    pub db: Arc<Mutex<Connection>>,
    pub extractor: Arc<dyn ReceiptExtractor>,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<AppConfig>,
}

impl ApiContext {
    pub fn new(
        db: Arc<Mutex<Connection>>,
        extractor: Arc<dyn ReceiptExtractor>,
        mailer: Arc<dyn Mailer>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            db,
            extractor,
            mailer,
            config,
        }
    }

    /// Lock the shared connection, recovering from a poisoned mutex. A
    /// panicked request must not wedge the whole server.
    pub fn lock_db(&self) -> std::sync::MutexGuard<'_, Connection> {
        match self.db.lock() {
            Ok(conn) => conn,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Authenticated user — injected by auth middleware
// ═══════════════════════════════════════════════════════════

/// Authenticated user context, injected into request extensions by the auth
/// middleware after token validation.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: Uuid,
}

// ═══════════════════════════════════════════════════════════
// Tokens and password hashing
// ═══════════════════════════════════════════════════════════

/// Hash a bearer or reset token with SHA-256 for at-rest storage. Only the
/// hash ever touches the database.
pub fn hash_token(token: &str) -> String {
    use base64::Engine;
    use sha2::{Digest, Sha256};

    let digest = Sha256::digest(token.as_bytes());
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest)
}

/// Generate a random opaque token (URL-safe base64, 32 bytes of entropy).
pub fn generate_token() -> String {
    use base64::Engine;

    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// PBKDF2 password hash in PHC string format (salt embedded).
pub fn hash_password(password: &str) -> Result<String, pbkdf2::password_hash::Error> {
    use pbkdf2::password_hash::{rand_core::OsRng, PasswordHasher, SaltString};
    use pbkdf2::Pbkdf2;

    let salt = SaltString::generate(&mut OsRng);
    Ok(Pbkdf2.hash_password(password.as_bytes(), &salt)?.to_string())
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    use pbkdf2::password_hash::{PasswordHash, PasswordVerifier};
    use pbkdf2::Pbkdf2;

    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Pbkdf2.verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique_and_opaque() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert!(a.len() >= 43); // 32 bytes base64url
    }

    #[test]
    fn token_hash_is_deterministic_and_distinct() {
        let token = generate_token();
        assert_eq!(hash_token(&token), hash_token(&token));
        assert_ne!(hash_token(&token), token);
    }

    #[test]
    fn password_roundtrip_verifies() {
        let hash = hash_password("segredo123").unwrap();
        assert!(verify_password("segredo123", &hash));
        assert!(!verify_password("errada", &hash));
    }

    #[test]
    fn same_password_hashes_differently() {
        let a = hash_password("segredo123").unwrap();
        let b = hash_password("segredo123").unwrap();
        assert_ne!(a, b); // random salt
    }

    #[test]
    fn garbage_stored_hash_never_verifies() {
        assert!(!verify_password("segredo123", "not-a-phc-string"));
    }
}
