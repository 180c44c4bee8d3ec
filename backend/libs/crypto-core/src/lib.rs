//! Cryptographic primitives for the rental backend.
//!
//! - [`signature`]: HMAC-SHA256 signing and constant-time verification of
//!   payment gateway callbacks
//! - [`token`]: opaque bearer tokens for streaming entitlements
//! - [`jwt`]: identity tokens issued by the auth service
pub mod jwt;
pub mod signature;
pub mod token;

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid key material")]
    InvalidKey,
    #[error("malformed signature")]
    MalformedSignature,
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}
