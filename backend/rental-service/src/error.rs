/// Error types for rental-service
///
/// Expected negative outcomes (invalid signature, expired access, existing
/// entitlement) are modelled as result enums in the services. The variants
/// here are failures the HTTP layer turns into an `ErrorResponse`.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use error_types::{error_codes, error_types as kinds, ErrorResponse};

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Movie, payment or access absent. Carries the stable error code.
    #[error("{1}")]
    NotFound(&'static str, String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Authentication required")]
    MissingToken,

    #[error("Invalid token: {0}")]
    Unauthorized(String),

    #[error("Admin privileges required")]
    Forbidden,

    #[error("{1}")]
    Conflict(&'static str, String),

    /// Payment could not be confirmed. Never carries signature detail.
    #[error("Payment could not be confirmed")]
    PaymentNotConfirmed,

    /// Gateway unreachable or rejected the request; the client may retry.
    #[error("Payment gateway unavailable: {0}")]
    UpstreamGateway(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn movie_not_found(movie_id: &str) -> Self {
        AppError::NotFound(
            error_codes::MOVIE_NOT_FOUND,
            format!("Movie {} not found", movie_id),
        )
    }

    pub fn payment_not_found(payment_id: &str) -> Self {
        AppError::NotFound(
            error_codes::PAYMENT_NOT_FOUND,
            format!("Payment {} not found", payment_id),
        )
    }

    pub fn access_not_found(access_id: &str) -> Self {
        AppError::NotFound(
            error_codes::ACCESS_NOT_FOUND,
            format!("Access {} not found", access_id),
        )
    }

    pub fn invalid_transition(payment_id: &str, detail: &str) -> Self {
        AppError::Conflict(
            error_codes::INVALID_TRANSITION,
            format!("Payment {} cannot transition: {}", payment_id, detail),
        )
    }

    /// Stable machine readable code sent to clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(code, _) | AppError::Conflict(code, _) => code,
            AppError::BadRequest(_) => error_codes::INVALID_REQUEST,
            AppError::MissingToken => error_codes::TOKEN_MISSING,
            AppError::Unauthorized(_) => error_codes::TOKEN_INVALID,
            AppError::Forbidden => error_codes::ADMIN_REQUIRED,
            AppError::PaymentNotConfirmed => error_codes::PAYMENT_NOT_CONFIRMED,
            AppError::UpstreamGateway(_) => error_codes::GATEWAY_UNAVAILABLE,
            AppError::Database(_) => error_codes::DATABASE_ERROR,
            AppError::Internal(_) => error_codes::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            AppError::NotFound(..) => kinds::NOT_FOUND_ERROR,
            AppError::BadRequest(_) => kinds::VALIDATION_ERROR,
            AppError::MissingToken | AppError::Unauthorized(_) => kinds::AUTHENTICATION_ERROR,
            AppError::Forbidden => kinds::AUTHORIZATION_ERROR,
            AppError::Conflict(..) => kinds::CONFLICT_ERROR,
            AppError::PaymentNotConfirmed => kinds::PAYMENT_ERROR,
            AppError::UpstreamGateway(_) => kinds::SERVICE_UNAVAILABLE_ERROR,
            AppError::Database(_) | AppError::Internal(_) => kinds::SERVER_ERROR,
        }
    }

    /// Message that is safe to show to clients.
    fn public_message(&self) -> String {
        match self {
            AppError::Database(_) => "Database error occurred".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::UpstreamGateway(_) => {
                "Payment gateway is unavailable, please retry".to_string()
            }
            AppError::Unauthorized(_) => "Invalid or expired token".to_string(),
            other => other.to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(..) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::PaymentNotConfirmed => StatusCode::BAD_REQUEST,
            AppError::MissingToken | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Conflict(..) => StatusCode::CONFLICT,
            AppError::UpstreamGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        match self {
            AppError::Database(e) => tracing::error!(error = ?e, "Database error"),
            AppError::Internal(e) => tracing::error!(error = ?e, "Internal error"),
            AppError::UpstreamGateway(detail) => {
                tracing::warn!(detail = %detail, "Payment gateway failure")
            }
            _ => {}
        }

        let response = ErrorResponse::new(
            status.canonical_reason().unwrap_or("Error"),
            &self.public_message(),
            status.as_u16(),
            self.error_type(),
            self.code(),
        );

        HttpResponse::build(status).json(response)
    }
}
