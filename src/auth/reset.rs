//! Password-reset tokens.
//!
//! The raw token is high-entropy random and only ever handed to the caller
//! for out-of-band delivery; the database stores a SHA-256 hash plus an
//! expiry. Consuming a token is a single conditional update in storage
//! (match hash and expiry, then clear), which is what makes it single-use.

use anyhow::{Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

const RESET_TOKEN_BYTES: usize = 32;

/// Create a new reset token for an email link.
///
/// # Errors
///
/// Returns an error if the OS RNG fails.
pub fn generate_reset_token() -> Result<String> {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate reset token")?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Hash a reset token so the raw value never touches the database.
#[must_use]
pub fn hash_reset_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// The reset state stored against a user: the token hash and its expiry.
/// Redemption clears it, so a consumed token leaves `None` behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReset {
    pub token_hash: String,
    pub expires_at: i64,
}

/// Whether a presented token hash redeems the pending reset right now.
///
/// This is the contract the storage layer enforces in its single conditional
/// update: the hash must match and the expiry must be strictly in the future.
/// A cleared slot (already redeemed, or never requested) redeems nothing.
#[must_use]
pub fn redeemable(pending: Option<&PendingReset>, presented_hash: &str, now: i64) -> bool {
    pending.is_some_and(|pending| {
        pending.token_hash == presented_hash && pending.expires_at > now
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_unique_and_high_entropy() {
        let first = generate_reset_token().expect("rng should work");
        let second = generate_reset_token().expect("rng should work");
        assert_ne!(first, second);

        let decoded = URL_SAFE_NO_PAD
            .decode(first.as_bytes())
            .expect("base64url");
        assert_eq!(decoded.len(), RESET_TOKEN_BYTES);
    }

    #[test]
    fn hash_is_stable_and_discriminating() {
        let first = hash_reset_token("token");
        let second = hash_reset_token("token");
        let different = hash_reset_token("other");
        assert_eq!(first, second);
        assert_ne!(first, different);
        // sha256 hex
        assert_eq!(first.len(), 64);
    }

    fn pending(expires_at: i64) -> PendingReset {
        PendingReset {
            token_hash: hash_reset_token("the-token"),
            expires_at,
        }
    }

    #[test]
    fn fresh_matching_token_redeems() {
        let slot = pending(200);
        assert!(redeemable(Some(&slot), &hash_reset_token("the-token"), 100));
    }

    #[test]
    fn second_redemption_fails_once_the_slot_is_cleared() {
        let slot = pending(200);
        let presented = hash_reset_token("the-token");
        assert!(redeemable(Some(&slot), &presented, 100));
        // Redemption clears the stored state; the same token now matches
        // nothing.
        assert!(!redeemable(None, &presented, 100));
    }

    #[test]
    fn expired_but_matching_token_is_rejected() {
        let slot = pending(99);
        assert!(!redeemable(Some(&slot), &hash_reset_token("the-token"), 100));
        // The boundary itself is already expired.
        let slot = pending(100);
        assert!(!redeemable(Some(&slot), &hash_reset_token("the-token"), 100));
    }

    #[test]
    fn wrong_token_never_redeems() {
        let slot = pending(200);
        assert!(!redeemable(Some(&slot), &hash_reset_token("other"), 100));
    }
}
