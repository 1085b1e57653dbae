//! One-way secret primitives.
//!
//! Passwords are stored as salted Argon2id PHC strings. Bearer tokens are
//! stored as a SHA-256 digest so a presented token can be re-hashed and
//! matched against the store; the raw string is never persisted.

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use sha2::{Digest, Sha256};

use authgate_core::{AuthError, AuthResult};

/// Hash a plaintext password with a fresh random salt.
pub fn hash_password(plaintext: &str) -> AuthResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::internal(format!("password hashing failed: {e}")))
}

/// Check a plaintext password against a stored PHC hash.
///
/// A malformed stored hash verifies as `false`.
pub fn verify_password(plaintext: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Deterministic digest of a bearer string, hex-encoded.
pub fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
