/// Payment gateway client
///
/// Orders are opened against Razorpay's Orders API; payment confirmation is
/// checked by recomputing the HMAC-SHA256 signature Razorpay attaches to the
/// checkout callback (`hex(hmac(key_secret, "{order_id}|{payment_id}"))`).
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::GatewayConfig;
use crate::error::AppError;

/// Sentinel accepted in place of a real signature by builds with the
/// `simulated-payments` feature when the runtime flag is also on.
#[cfg(feature = "simulated-payments")]
pub const SIMULATED_SIGNATURE: &str = "simulated_signature";

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Unavailable(String),

    #[error("gateway rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("gateway misconfigured: {0}")]
    Misconfigured(String),
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        AppError::UpstreamGateway(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub amount_minor: i64,
    pub currency: String,
    /// Our payment identifier, echoed back by the gateway
    pub receipt: String,
    pub movie_id: String,
    pub device_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub status: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Gateway name persisted on each payment
    fn name(&self) -> &str;

    /// Public key handed to the client-side checkout
    fn public_key(&self) -> &str;

    async fn create_order(&self, request: OrderRequest) -> Result<GatewayOrder, GatewayError>;

    /// Constant-time check of the checkout callback signature.
    fn verify_signature(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> Result<bool, GatewayError>;
}

#[derive(Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
    notes: OrderNotes<'a>,
}

#[derive(Serialize)]
struct OrderNotes<'a> {
    movie_id: &'a str,
    device_id: &'a str,
}

pub struct RazorpayGateway {
    name: String,
    http_client: HttpClient,
    base_url: String,
    key_id: String,
    key_secret: String,
    #[cfg_attr(not(feature = "simulated-payments"), allow(dead_code))]
    allow_simulated_signature: bool,
}

impl RazorpayGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let http_client = HttpClient::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| GatewayError::Misconfigured(e.to_string()))?;

        if config.allow_simulated_signature {
            if cfg!(feature = "simulated-payments") {
                warn!("Simulated payment signatures are ENABLED; never use this build in production");
            } else {
                warn!("allow_simulated_signature is set but this build has no simulated-payments support; ignoring");
            }
        }

        Ok(Self {
            name: config.name.clone(),
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
            allow_simulated_signature: config.allow_simulated_signature,
        })
    }

    #[cfg(feature = "simulated-payments")]
    fn is_simulated(&self, signature: &str) -> bool {
        self.allow_simulated_signature && signature == SIMULATED_SIGNATURE
    }

    #[cfg(not(feature = "simulated-payments"))]
    fn is_simulated(&self, _signature: &str) -> bool {
        false
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    fn name(&self) -> &str {
        &self.name
    }

    fn public_key(&self) -> &str {
        &self.key_id
    }

    async fn create_order(&self, request: OrderRequest) -> Result<GatewayOrder, GatewayError> {
        if self.key_id.is_empty() || self.key_secret.is_empty() {
            return Err(GatewayError::Misconfigured("missing API credentials".into()));
        }

        let body = CreateOrderBody {
            amount: request.amount_minor,
            currency: &request.currency,
            receipt: &request.receipt,
            notes: OrderNotes {
                movie_id: &request.movie_id,
                device_id: &request.device_id,
            },
        };

        let response = self
            .http_client
            .post(format!("{}/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let order: GatewayOrder = response
            .json()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("invalid order response: {}", e)))?;

        info!(
            gateway_order_id = %order.id,
            receipt = %request.receipt,
            amount = order.amount,
            "Gateway order created"
        );
        Ok(order)
    }

    fn verify_signature(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> Result<bool, GatewayError> {
        if self.is_simulated(signature) {
            warn!(gateway_order_id = %gateway_order_id, "Accepting simulated payment signature");
            return Ok(true);
        }
        verify_checkout_signature(
            &self.key_secret,
            gateway_order_id,
            gateway_payment_id,
            signature,
        )
    }
}

/// Checks `signature` against `hex(hmac_sha256(secret, "{order_id}|{payment_id}"))`.
/// A signature that is not valid hex is a mismatch, not an error.
pub fn verify_checkout_signature(
    secret: &str,
    gateway_order_id: &str,
    gateway_payment_id: &str,
    signature: &str,
) -> Result<bool, GatewayError> {
    let payload = format!("{}|{}", gateway_order_id, gateway_payment_id);
    match crypto_core::signature::verify_hex(secret.as_bytes(), payload.as_bytes(), signature) {
        Ok(valid) => Ok(valid),
        Err(crypto_core::CryptoError::MalformedSignature) => Ok(false),
        Err(e) => Err(GatewayError::Misconfigured(e.to_string())),
    }
}

/// Signature the gateway would attach for this order/payment pair.
pub fn sign_checkout(
    secret: &str,
    gateway_order_id: &str,
    gateway_payment_id: &str,
) -> Result<String, GatewayError> {
    let payload = format!("{}|{}", gateway_order_id, gateway_payment_id);
    crypto_core::signature::sign_hex(secret.as_bytes(), payload.as_bytes())
        .map_err(|e| GatewayError::Misconfigured(e.to_string()))
}
