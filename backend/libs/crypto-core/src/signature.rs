// HMAC-SHA256 signatures, hex encoded.
// Verification goes through `Mac::verify_slice`, which compares in constant time.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::CryptoError;

type HmacSha256 = Hmac<Sha256>;

/// Sign `payload` with `secret`, returning the lowercase hex digest.
pub fn sign_hex(secret: &[u8], payload: &[u8]) -> Result<String, CryptoError> {
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| CryptoError::InvalidKey)?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify a hex encoded signature over `payload`.
///
/// Returns `Ok(false)` for a well-formed but wrong signature and
/// `Err(MalformedSignature)` when the signature is not hex at all.
pub fn verify_hex(secret: &[u8], payload: &[u8], signature_hex: &str) -> Result<bool, CryptoError> {
    let provided = hex::decode(signature_hex.trim()).map_err(|_| CryptoError::MalformedSignature)?;

    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| CryptoError::InvalidKey)?;
    mac.update(payload);
    Ok(mac.verify_slice(&provided).is_ok())
}
