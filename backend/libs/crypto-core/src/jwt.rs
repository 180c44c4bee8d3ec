/// Identity tokens for the rental backend
///
/// The auth service signs bearer tokens with a shared HS256 secret; the
/// payments and admin routes only need to validate them. Keys live in a
/// [`JwtKeys`] value that is built once at startup and passed to whoever needs
/// it, so tests can construct their own keys without touching process state.
///
/// ```rust
/// use crypto_core::jwt::JwtKeys;
///
/// let keys = JwtKeys::from_secret("dev-secret");
/// let token = keys.issue("U10001", false).unwrap();
/// let claims = keys.validate(&token).unwrap();
/// assert_eq!(claims.sub, "U10001");
/// ```
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::CryptoError;

const ACCESS_TOKEN_EXPIRY_MINUTES: i64 = 15;

const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

/// Claims carried by an identity token
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Human readable user id, e.g. `U10001`
    pub sub: String,
    #[serde(default)]
    pub is_admin: bool,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtKeys")
            .field("algorithm", &JWT_ALGORITHM)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl JwtKeys {
    pub fn from_secret(secret: &str) -> Self {
        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Issue a short-lived access token.
    pub fn issue(&self, user_id: &str, is_admin: bool) -> Result<String, CryptoError> {
        self.issue_with_ttl(user_id, is_admin, Duration::minutes(ACCESS_TOKEN_EXPIRY_MINUTES))
    }

    pub fn issue_with_ttl(
        &self,
        user_id: &str,
        is_admin: bool,
        ttl: Duration,
    ) -> Result<String, CryptoError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            is_admin,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        Ok(encode(&Header::new(JWT_ALGORITHM), &claims, &self.encoding)?)
    }

    /// Validate signature and expiry, returning the claims.
    pub fn validate(&self, token: &str) -> Result<Claims, CryptoError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)?;
        Ok(data.claims)
    }
}
