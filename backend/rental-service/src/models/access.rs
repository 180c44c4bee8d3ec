use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Payment status mirrored onto the access at mint time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum AccessPaymentStatus {
    Pending,
    Success,
    Failed,
    Refunded,
}

/// Why an access cannot be used for playback right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidReason {
    /// Unknown token, or a known token presented from another device
    NotFound,
    Expired,
    PaymentNotSuccessful,
}

impl InvalidReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Expired => "expired",
            Self::PaymentNotSuccessful => "payment_not_successful",
        }
    }
}

/// A time-boxed, device-bound right to stream one movie.
///
/// `expiry_time` is fixed when the access is minted. Revocation collapses it
/// to the revocation instant; nothing else moves it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Access {
    pub access_id: String,
    /// Bearer capability. Never included in list responses.
    #[serde(skip_serializing)]
    pub token: String,
    pub user_id: Option<String>,
    pub movie_id: String,
    pub device_id: Option<String>,
    pub payment_id: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub expiry_time: DateTime<Utc>,
    pub playback_started: bool,
    pub payment_status: AccessPaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Access {
    /// Expiry and payment-status rules for playback, evaluated at `now`.
    ///
    /// The server gate and client-side cached checks both go through this, so
    /// a cached check can only ever be stricter than the server, never looser.
    pub fn evaluate(&self, now: DateTime<Utc>) -> Result<(), InvalidReason> {
        if now >= self.expiry_time {
            return Err(InvalidReason::Expired);
        }
        if self.payment_status != AccessPaymentStatus::Success {
            return Err(InvalidReason::PaymentNotSuccessful);
        }
        Ok(())
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.evaluate(now).is_ok()
    }
}

#[derive(Debug, Clone)]
pub struct NewAccess {
    pub access_id: String,
    pub token: String,
    pub user_id: Option<String>,
    pub movie_id: String,
    pub device_id: String,
    pub payment_id: String,
    pub expiry_time: DateTime<Utc>,
    pub payment_status: AccessPaymentStatus,
}
