//! Password hashing and verification.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand_core::OsRng;

use crate::error::ServerError;

/// Hash a plaintext password into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, ServerError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ServerError::Internal(format!("Password hashing failed: {e}")))?;
    Ok(hash.to_string())
}

/// Verify a plaintext password against a stored PHC string.
///
/// An unparseable stored hash counts as a failed verification rather
/// than an error; login must not reveal anything about the account state.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("secret1").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("secret1", &hash));
        assert!(!verify_password("secret2", &hash));
    }

    #[test]
    fn hashes_are_salted() {
        let first = hash_password("secret1").unwrap();
        let second = hash_password("secret1").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn garbage_stored_hash_never_verifies() {
        assert!(!verify_password("secret1", "not-a-phc-string"));
    }
}
