//! The legacy htdigest credential hash.
//!
//! The stored value is `MD5(user ":" realm ":" password)` rendered as 32
//! lowercase hexadecimal characters, which is what Apache's `mod_auth_digest`
//! expects to find in the password file (the `HA1` value of RFC 2617).
//!
//! # Security Warning
//!
//! MD5 is cryptographically broken. The scheme is fixed by the file format and
//! is implemented only for compatibility with existing htdigest files.

use md5::{Digest, Md5};

/// Length of a rendered digest, in characters.
pub const DIGEST_LEN: usize = 32;

/// Compute the digest for a user, realm and password.
///
/// No validation happens here; see [`crate::Record::new`] for the checked
/// constructor.
pub fn compute_digest(user: &str, realm: &str, secret: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(user.as_bytes());
    hasher.update(b":");
    hasher.update(realm.as_bytes());
    hasher.update(b":");
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Verify a password against a stored digest.
///
/// Hex case in `digest` is ignored. The comparison does not short-circuit on
/// the first differing byte.
pub fn verify_digest(user: &str, realm: &str, secret: &str, digest: &str) -> bool {
    let computed = compute_digest(user, realm, secret);
    computed.len() == digest.len()
        && computed
            .bytes()
            .zip(digest.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b.to_ascii_lowercase()))
            == 0
}
