//! Authentication primitives: salted password hashing, opaque session
//! tokens, and constant-time comparison.

use sha2::{Digest, Sha256};

/// Stretching rounds for the password digest.
const HASH_ROUNDS: u32 = 10_000;

/// Hashes a password with a fresh random salt.
///
/// Stored form is `<salt-hex>$<digest-hex>`.
pub fn hash_password(password: &str) -> String {
    let salt = hex::encode(rand::random::<u128>().to_be_bytes());
    format!("{salt}${}", digest(&salt, password))
}

/// Verifies a password against a stored `<salt-hex>$<digest-hex>` value.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, expected)) = stored.split_once('$') else {
        return false;
    };

    constant_time_eq(&digest(salt, password), expected)
}

fn digest(salt: &str, password: &str) -> String {
    let mut acc = Sha256::new()
        .chain_update(salt.as_bytes())
        .chain_update(password.as_bytes())
        .finalize();

    for _ in 1..HASH_ROUNDS {
        acc = Sha256::digest(&acc);
    }

    hex::encode(acc)
}

/// Generates an opaque session token. The ulid prefix keeps tokens
/// sortable in debug output; the random suffix carries the entropy.
pub fn generate_token() -> String {
    format!(
        "{}{}",
        rusty_ulid::generate_ulid_string(),
        hex::encode(rand::random::<u128>().to_be_bytes())
    )
}

/// Compares two strings in constant time.
///
/// This prevents timing attacks by ensuring the comparison takes the same
/// amount of time regardless of where (or if) the values differ.
///
/// Returns `false` if either value is empty.
pub fn constant_time_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();

    // Empty values are never valid
    if provided.is_empty() || expected.is_empty() {
        return false;
    }

    // Length mismatch - still compare to maintain constant time
    // We compare all bytes of the shorter string, then account for length diff
    let len_match = provided.len() == expected.len();

    // XOR accumulator: if any byte differs, result will be non-zero
    let mut diff: u8 = 0;
    for (a, b) in provided.iter().zip(expected.iter()) {
        diff |= a ^ b;
    }

    // Both conditions must be true: same length AND all bytes match
    len_match && diff == 0
}

/// Extracts the bearer token from an Authorization header value.
///
/// Expected format: "Bearer <token>"
/// Returns `None` if the header doesn't match the expected format.
pub fn extract_bearer_token(header: &str) -> Option<&str> {
    let header = header.trim();

    // Case-insensitive "Bearer " prefix check (RFC 6750 allows case-insensitive)
    if header.len() < 7 {
        return None;
    }

    let (prefix, token) = header.split_at(7);
    if prefix.eq_ignore_ascii_case("Bearer ") {
        let token = token.trim();
        if token.is_empty() {
            None
        } else {
            Some(token)
        }
    } else {
        None
    }
}
