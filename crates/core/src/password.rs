//! Argon2id password hashing, verification, and strength policy.
//!
//! All password hashes use the Argon2id variant with a cryptographically
//! random salt generated via [`OsRng`]. The PHC string format is used for
//! storage so that algorithm parameters and salt are embedded in the hash
//! itself.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::error::CoreError;

/// Minimum accepted password length.
const MIN_PASSWORD_LEN: usize = 8;

/// Hash a plaintext password using Argon2id with a random salt.
///
/// Returns the PHC-formatted hash string.
pub fn hash_password(password: &str) -> Result<String, CoreError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default(); // Argon2id with default params
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| CoreError::Internal(format!("password hashing failed: {e}")))?;
    Ok(hash.to_string())
}

/// Verify a plaintext password against a stored PHC-formatted hash.
///
/// Returns `Ok(true)` if the password matches, `Ok(false)` if it does not.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, CoreError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| CoreError::Internal(format!("stored password hash is corrupt: {e}")))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(CoreError::Internal(format!(
            "password verification failed: {e}"
        ))),
    }
}

/// Validate that a password meets the strength policy: minimum length plus
/// at least one uppercase letter, one digit, and one special character.
pub fn validate_password_strength(password: &str) -> Result<(), CoreError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(CoreError::PasswordTooWeak(format!(
            "must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(CoreError::PasswordTooWeak(
            "must contain an uppercase letter".into(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(CoreError::PasswordTooWeak("must contain a digit".into()));
    }
    if !password.chars().any(|c| !c.is_ascii_alphanumeric()) {
        return Err(CoreError::PasswordTooWeak(
            "must contain a special character".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let hash = hash_password("Password123!").expect("hashing should succeed");
        assert!(
            hash.starts_with("$argon2id$"),
            "expected argon2id PHC prefix"
        );

        let verified = verify_password("Password123!", &hash).expect("verify should succeed");
        assert!(verified, "correct password should verify as true");
    }

    #[test]
    fn wrong_password_fails_verification() {
        let hash = hash_password("Password123!").expect("hashing should succeed");
        let verified = verify_password("Password124!", &hash).expect("verify should succeed");
        assert!(!verified, "wrong password should verify as false");
    }

    #[test]
    fn policy_accepts_strong_password() {
        assert!(validate_password_strength("Password123!").is_ok());
    }

    #[test]
    fn policy_rejects_short_password() {
        assert_matches!(
            validate_password_strength("Pw1!"),
            Err(CoreError::PasswordTooWeak(msg)) if msg.contains("8 characters")
        );
    }

    #[test]
    fn policy_rejects_missing_uppercase() {
        assert_matches!(
            validate_password_strength("password123!"),
            Err(CoreError::PasswordTooWeak(msg)) if msg.contains("uppercase")
        );
    }

    #[test]
    fn policy_rejects_missing_digit() {
        assert_matches!(
            validate_password_strength("Password!!"),
            Err(CoreError::PasswordTooWeak(msg)) if msg.contains("digit")
        );
    }

    #[test]
    fn policy_rejects_missing_special() {
        assert_matches!(
            validate_password_strength("Password123"),
            Err(CoreError::PasswordTooWeak(msg)) if msg.contains("special")
        );
    }
}
