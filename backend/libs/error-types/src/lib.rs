//! Unified JSON error envelope shared by the rental backend.
//!
//! Every HTTP error leaves the service in this shape so the admin console and
//! the mobile client can branch on `code` instead of parsing messages.
use serde::{Deserialize, Serialize};

/// Unified API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always `false`; lets clients test one field for both success and error bodies
    pub success: bool,

    /// HTTP reason phrase
    pub error: String,

    /// Human readable message, safe to show to end users
    pub message: String,

    /// HTTP status code
    pub status: u16,

    /// Error category, one of the constants in [`error_types`]
    pub error_type: String,

    /// Stable machine readable code, one of the constants in [`error_codes`]
    pub code: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// RFC 3339 timestamp
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str, status: u16, error_type: &str, code: &str) -> Self {
        Self {
            success: false,
            error: error.to_string(),
            message: message.to_string(),
            status,
            error_type: error_type.to_string(),
            code: code.to_string(),
            details: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Stable error codes
pub mod error_codes {
    // Catalog
    pub const MOVIE_NOT_FOUND: &str = "MOVIE_NOT_FOUND";

    // Payments
    pub const PAYMENT_NOT_FOUND: &str = "PAYMENT_NOT_FOUND";
    pub const PAYMENT_NOT_CONFIRMED: &str = "PAYMENT_NOT_CONFIRMED";
    pub const ALREADY_ENTITLED: &str = "ALREADY_ENTITLED";
    pub const GATEWAY_UNAVAILABLE: &str = "GATEWAY_UNAVAILABLE";
    pub const INVALID_TRANSITION: &str = "INVALID_TRANSITION";

    // Access
    pub const ACCESS_NOT_FOUND: &str = "ACCESS_NOT_FOUND";

    // Authentication
    pub const TOKEN_INVALID: &str = "TOKEN_INVALID";
    pub const TOKEN_MISSING: &str = "TOKEN_MISSING";
    pub const ADMIN_REQUIRED: &str = "ADMIN_REQUIRED";

    // Identifiers
    pub const ALLOCATION_EXHAUSTED: &str = "ALLOCATION_EXHAUSTED";

    // Generic
    pub const INVALID_REQUEST: &str = "INVALID_REQUEST";
    pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
    pub const INTERNAL_SERVER_ERROR: &str = "INTERNAL_SERVER_ERROR";
}

/// Error categories
pub mod error_types {
    pub const VALIDATION_ERROR: &str = "validation_error";
    pub const AUTHENTICATION_ERROR: &str = "authentication_error";
    pub const AUTHORIZATION_ERROR: &str = "authorization_error";
    pub const NOT_FOUND_ERROR: &str = "not_found_error";
    pub const CONFLICT_ERROR: &str = "conflict_error";
    pub const PAYMENT_ERROR: &str = "payment_error";
    pub const SERVER_ERROR: &str = "server_error";
    pub const SERVICE_UNAVAILABLE_ERROR: &str = "service_unavailable_error";
}
