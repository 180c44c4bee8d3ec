/// Bearer identity extractors
///
/// Tokens are HS256 JWTs issued by the auth service. The verifying keys are
/// registered as `web::Data<JwtKeys>` on the app.
use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use crypto_core::jwt::{Claims, JwtKeys};
use futures::future::{ready, Ready};
use tracing::debug;

use crate::error::AppError;

/// Authenticated caller.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_id: String,
    pub is_admin: bool,
}

impl From<Claims> for Caller {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            is_admin: claims.is_admin,
        }
    }
}

/// Caller that may be a guest. A missing or unusable token means guest.
#[derive(Debug, Clone)]
pub struct MaybeCaller(pub Option<Caller>);

impl MaybeCaller {
    pub fn user_id(&self) -> Option<String> {
        self.0.as_ref().map(|c| c.user_id.clone())
    }
}

/// Caller whose token carries the admin flag.
#[derive(Debug, Clone)]
pub struct AdminCaller(pub Caller);

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn authenticate(req: &HttpRequest) -> Result<Caller, AppError> {
    let token = bearer_token(req).ok_or(AppError::MissingToken)?;

    let keys = req
        .app_data::<web::Data<JwtKeys>>()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("JWT keys not configured")))?;

    let claims = keys
        .validate(token)
        .map_err(|e| AppError::Unauthorized(e.to_string()))?;

    Ok(Caller::from(claims))
}

impl FromRequest for Caller {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

impl FromRequest for MaybeCaller {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let caller = match authenticate(req) {
            Ok(caller) => Some(caller),
            Err(AppError::MissingToken) => None,
            Err(e) => {
                debug!(error = %e, "Ignoring unusable bearer token, continuing as guest");
                None
            }
        };
        ready(Ok(MaybeCaller(caller)))
    }
}

impl FromRequest for AdminCaller {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = authenticate(req).and_then(|caller| {
            if caller.is_admin {
                Ok(AdminCaller(caller))
            } else {
                Err(AppError::Forbidden)
            }
        });
        ready(result)
    }
}
