//! ID and secret generation utilities
//!
//! Entity IDs are prefixed, Stripe-style (`acct_…`, `tok_…`), with at least
//! 96 bits of entropy and a URL-safe encoding. Secrets (password-reset
//! tokens) are unprefixed, fixed-length random strings.

use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use rand::{TryRngCore, rngs::OsRng};

/// Number of random bytes backing a reset secret. 256 bits, matching the
/// strength of the original recovery-token generator.
pub const SECRET_BYTES: usize = 32;

/// Generate a prefixed ID with 96 bits of entropy
///
/// The ID format is: `{prefix}_{random_string}`, where the random string is
/// base64 URL-safe encoded without padding.
pub fn generate_prefixed_id(prefix: &str) -> String {
    let mut bytes = [0u8; 12];
    OsRng.try_fill_bytes(&mut bytes).unwrap();

    let encoded = BASE64_URL_SAFE_NO_PAD.encode(bytes);

    format!("{prefix}_{encoded}")
}

/// Generate a fixed-length, URL-safe random secret from [`SECRET_BYTES`]
/// bytes of OS entropy.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    OsRng.try_fill_bytes(&mut bytes).unwrap();

    BASE64_URL_SAFE_NO_PAD.encode(bytes)
}

/// Validate that a prefixed ID has the expected format
pub fn validate_prefixed_id(id: &str, expected_prefix: &str) -> bool {
    if !id.starts_with(&format!("{expected_prefix}_")) {
        return false;
    }

    let random_part = &id[expected_prefix.len() + 1..];

    match BASE64_URL_SAFE_NO_PAD.decode(random_part) {
        Ok(decoded) => decoded.len() >= 12, // At least 96 bits
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_prefixed_id() {
        let id = generate_prefixed_id("acct");
        assert!(id.starts_with("acct_"));

        // Ensure uniqueness
        let id2 = generate_prefixed_id("acct");
        assert_ne!(id, id2);
    }

    #[test]
    fn test_validate_prefixed_id() {
        let id = generate_prefixed_id("acct");
        assert!(validate_prefixed_id(&id, "acct"));
        assert!(!validate_prefixed_id(&id, "tok"));

        assert!(!validate_prefixed_id("acct", "acct"));
        assert!(!validate_prefixed_id("acct_", "acct"));
        assert!(!validate_prefixed_id("acct_invalid!", "acct"));
    }

    #[test]
    fn test_generate_secret_fixed_length() {
        let secret = generate_secret();
        let secret2 = generate_secret();

        // 32 bytes base64url without padding is always 43 characters
        assert_eq!(secret.len(), 43);
        assert_eq!(secret.len(), secret2.len());
        assert_ne!(secret, secret2);
    }

    #[test]
    fn test_ids_are_url_safe() {
        let id = generate_prefixed_id("acct");
        assert!(
            id.chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
        );

        let secret = generate_secret();
        assert!(
            secret
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
        );
    }
}
