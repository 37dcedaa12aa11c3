//! Credential comparison and payload signing for the Sentinel core.
//!
//! Two narrow jobs live here, both security-sensitive enough to want their own
//! small, heavily-tested crate rather than being inlined at each call site:
//!
//! - [`keys_match`]: constant-time comparison of an agent's presented API key
//!   against the validator's stored key.
//! - [`sign`] / [`verify`]: HMAC-SHA256 over a webhook body, hex-encoded.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Compares two API keys without leaking timing information about where they
/// first differ. Differing lengths are still constant-time with respect to the
/// shorter key's length; an attacker cannot use either property to bisect a key.
pub fn keys_match(presented: &str, expected: &str) -> bool {
    let presented = presented.as_bytes();
    let expected = expected.as_bytes();
    if presented.len() != expected.len() {
        return false;
    }
    presented.ct_eq(expected).into()
}

/// Computes the hex-encoded `HMAC-SHA256(body, secret)` used for the
/// `X-Sentinel-Signature` header.
pub fn sign(body: &[u8], secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts a key of any length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Recomputes the signature for `body` under `secret` and compares it in constant
/// time against `signature` (expected to be the hex string from a
/// `X-Sentinel-Signature` header).
pub fn verify(body: &[u8], secret: &str, signature: &str) -> bool {
    keys_match(&sign(body, secret), signature)
}

/// Generates a new random API key, hex-encoded. Used when provisioning a new
/// `Agent`/`Validator` pairing outside of this crate's direct scope, but kept here
/// alongside the comparison it will eventually be compared with.
pub fn generate_api_key() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_keys_compare_equal() {
        assert!(keys_match("same-key", "same-key"));
    }

    #[test]
    fn differing_keys_compare_unequal() {
        assert!(!keys_match("key-a", "key-b"));
        assert!(!keys_match("short", "a-much-longer-key"));
    }

    #[test]
    fn signature_round_trips() {
        let body = br#"{"event":"validator.unhealthy"}"#;
        let secret = "whsec_test";
        let signature = sign(body, secret);
        assert!(verify(body, secret, &signature));
        assert!(!verify(body, "wrong-secret", &signature));
    }

    #[test]
    fn generated_keys_are_not_trivially_equal() {
        let a = generate_api_key();
        let b = generate_api_key();
        assert_ne!(a, b);
        assert_eq!(a.len(), 64); // 32 bytes, hex-encoded
    }
}
