use rand::{rngs::OsRng, RngCore};

/// Entropy of a bearer token in bytes (256 bits)
pub const ACCESS_TOKEN_BYTES: usize = 32;

/// Generate an opaque bearer token: 32 bytes from the OS RNG, hex encoded.
pub fn generate_access_token() -> String {
    let mut bytes = [0u8; ACCESS_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
