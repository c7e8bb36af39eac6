//! # Password hashing and verification: Argon2id
//!
//! Identity stores own password hashing; the auth flows only transport the
//! plaintext to them. Both store implementations use these two functions:
//!
//! - [`hash_password`]: random salt from [`OsRng`], default Argon2id
//!   parameters, PHC-format output (e.g. `$argon2id$v=19$m=19456,t=2,p=1$...`),
//!   stored in `identities.password_hash`.
//!
//! - [`verify_password`]: parses a PHC-format hash and checks the plaintext.
//!   `Ok(true)` on match, `Ok(false)` on mismatch, `Err` if the stored hash is
//!   malformed (a store-side fault, not a bad credential).

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::StoreError;

/// Hash a password using Argon2id. Returns a PHC-format string.
pub fn hash_password(password: &str) -> Result<String, StoreError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| StoreError::Unavailable(format!("failed to hash password: {e}")))?;
    Ok(hash.to_string())
}

/// Verify a password against a PHC-format hash string.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, StoreError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| StoreError::Unavailable(format!("invalid stored password hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
