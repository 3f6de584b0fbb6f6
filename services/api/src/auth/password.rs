//! services/api/src/auth/password.rs
//!
//! Salted, iterated password hashing (PBKDF2-HMAC-SHA256). The salt and the
//! derived bytes are both base64-encoded and concatenated, so the stored value
//! is self-contained and verifiable without a separate salt column.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

const SALT_LEN: usize = 16;
const ITERATIONS: u32 = 100_000;
const KEY_LEN: usize = 32;

/// Derives a salted hash for the given password, encoded as
/// `base64(salt):base64(derived)`.
pub fn hash(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);

    let mut derived = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, ITERATIONS, &mut derived);

    format!("{}:{}", STANDARD.encode(salt), STANDARD.encode(derived))
}

/// Re-derives with the salt embedded in `stored` and compares the derived
/// bytes. A malformed stored value is simply a failed verification, never an
/// error.
pub fn verify(password: &str, stored: &str) -> bool {
    let Some((salt_b64, hash_b64)) = stored.split_once(':') else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (STANDARD.decode(salt_b64), STANDARD.decode(hash_b64)) else {
        return false;
    };

    let mut derived = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, ITERATIONS, &mut derived);

    // Not constant-time across the "malformed hash" early returns above;
    // see DESIGN.md for the hardening note.
    derived.as_slice() == expected.as_slice()
}
