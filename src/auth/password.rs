//! Password hashing with a per-call random salt.
//!
//! Stored form is `hex(salt):hex(derived_key)` so `verify` can re-derive with
//! the embedded salt. The KDF is Argon2id with the crate defaults, which are
//! deliberately slow and memory-hard.

use argon2::Argon2;
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;

use super::constant_time_eq;

const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;

// Argon2 refuses outputs shorter than this; anything smaller in a stored hash
// is malformed and can never verify.
const MIN_KEY_LEN: usize = 4;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Password hashing failed")]
    HashingFailed,
}

/// Hash a password with a fresh random salt.
///
/// # Errors
///
/// Returns an error if the OS RNG or the KDF fails.
pub fn hash(password: &str) -> Result<String, PasswordError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng
        .try_fill_bytes(&mut salt)
        .map_err(|_| PasswordError::HashingFailed)?;

    let mut key = [0u8; KEY_LEN];
    Argon2::default()
        .hash_password_into(password.as_bytes(), &salt, &mut key)
        .map_err(|_| PasswordError::HashingFailed)?;

    Ok(format!("{}:{}", hex::encode(salt), hex::encode(key)))
}

/// Verify a password against a stored `hex(salt):hex(key)` hash.
///
/// Malformed stored hashes (missing separator, bad hex, undersized key)
/// return false rather than erroring into caller-visible state. The final
/// comparison is constant time.
#[must_use]
pub fn verify(password: &str, stored: &str) -> bool {
    let Some((salt_hex, key_hex)) = stored.split_once(':') else {
        return false;
    };
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    let Ok(stored_key) = hex::decode(key_hex) else {
        return false;
    };
    if salt.is_empty() || stored_key.len() < MIN_KEY_LEN {
        return false;
    }

    // Derive to the stored key's length so comparison is length-uniform.
    let mut derived = vec![0u8; stored_key.len()];
    if Argon2::default()
        .hash_password_into(password.as_bytes(), &salt, &mut derived)
        .is_err()
    {
        return false;
    }

    constant_time_eq(&stored_key, &derived)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_round_trip() {
        let password = "correct horse battery staple";
        let stored = hash(password).expect("hash should succeed");

        assert!(verify(password, &stored));
        assert!(!verify("wrong password", &stored));
    }

    #[test]
    fn same_password_hashes_differently() {
        let password = "same password";
        let first = hash(password).expect("hash should succeed");
        let second = hash(password).expect("hash should succeed");

        // Fresh salt per call.
        assert_ne!(first, second);
        assert!(verify(password, &first));
        assert!(verify(password, &second));
    }

    #[test]
    fn stored_form_is_salt_colon_key_hex() {
        let stored = hash("pw").expect("hash should succeed");
        let (salt_hex, key_hex) = stored.split_once(':').expect("separator present");
        assert_eq!(salt_hex.len(), SALT_LEN * 2);
        assert_eq!(key_hex.len(), KEY_LEN * 2);
        assert!(hex::decode(salt_hex).is_ok());
        assert!(hex::decode(key_hex).is_ok());
    }

    #[test]
    fn malformed_stored_hashes_never_verify() {
        assert!(!verify("pw", ""));
        assert!(!verify("pw", "no-separator"));
        assert!(!verify("pw", "nothex:nothex"));
        assert!(!verify("pw", ":abcd1234"));
        assert!(!verify("pw", "abcd1234:"));
        // Undersized derived key.
        assert!(!verify("pw", "abcd1234abcd1234:ab"));
    }
}
