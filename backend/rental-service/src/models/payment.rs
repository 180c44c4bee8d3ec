use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Payment lifecycle. Transitions only move forward:
/// created -> initiated -> success | failed, success -> refunded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum PaymentStatus {
    Created,
    Initiated,
    Success,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Initiated => "initiated",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }

    /// States a payment may be in for a move to `self` to be legal.
    pub fn predecessors(&self) -> &'static [PaymentStatus] {
        match self {
            Self::Created => &[],
            Self::Initiated => &[Self::Created],
            Self::Success | Self::Failed => &[Self::Created, Self::Initiated],
            Self::Refunded => &[Self::Success],
        }
    }

    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        next.predecessors().contains(self)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed | Self::Refunded)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub payment_id: String,
    /// None for guest checkout
    pub user_id: Option<String>,
    pub gateway: String,
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
    pub amount_minor: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub device_id: String,
    pub movie_id: String,
    /// Set once verification has minted an access
    pub access_id: Option<String>,
    pub meta: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub payment_id: String,
    pub user_id: Option<String>,
    pub gateway: String,
    pub gateway_order_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub device_id: String,
    pub movie_id: String,
    pub meta: Option<serde_json::Value>,
}

/// Conditional status update. Optional fields are only written when `Some`.
#[derive(Debug, Clone)]
pub struct PaymentTransition {
    pub to: PaymentStatus,
    pub gateway_payment_id: Option<String>,
    pub user_id: Option<String>,
    pub meta: Option<serde_json::Value>,
}

impl PaymentTransition {
    pub fn to(status: PaymentStatus) -> Self {
        Self {
            to: status,
            gateway_payment_id: None,
            user_id: None,
            meta: None,
        }
    }

    pub fn with_gateway_payment_id(mut self, id: impl Into<String>) -> Self {
        self.gateway_payment_id = Some(id.into());
        self
    }

    pub fn with_user_id(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn with_meta(mut self, meta: serde_json::Value) -> Self {
        self.meta = Some(meta);
        self
    }
}

/// Renders a minor-unit amount as a two-decimal major-unit string (10000 -> "100.00").
pub fn format_minor(amount_minor: i64) -> String {
    let sign = if amount_minor < 0 { "-" } else { "" };
    let abs = amount_minor.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}
