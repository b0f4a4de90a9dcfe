// ============================
// crates/backend-lib/src/auth/token_generator.rs
// ============================
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
/** Secure random identifiers for authentication
This module provides cryptographically secure random values used as
token identifiers (`jti`) and as freshly generated signing secrets. */
use rand::RngCore;

/// Size of a token identifier in bytes (128 bits of entropy)
const TOKEN_ID_BYTES: usize = 16;

/// Size of a generated signing secret in bytes (256 bits of entropy)
const SECRET_BYTES: usize = 32;

/** Generate a unique token identifier
Two tokens for the same user issued within the same second still differ,
so removing one from the ledger never removes the other. */
pub fn generate_token_id() -> String {
    generate_secure_token_with_size(TOKEN_ID_BYTES)
}

/** Generate a random secret suitable for `jwt.secret`
# Returns
A base64 URL-safe encoded string without padding (43 chars) */
pub fn generate_signing_secret() -> String {
    generate_secure_token_with_size(SECRET_BYTES)
}

/** Generate a cryptographically secure random token with specified size
# Arguments
* `bytes` - The size of the random token in bytes
# Returns
A base64 URL-safe encoded string without padding */
pub fn generate_secure_token_with_size(bytes: usize) -> String {
    let mut buffer = vec![0u8; bytes];
    rand::rng().fill_bytes(&mut buffer);
    URL_SAFE_NO_PAD.encode(buffer)
}
