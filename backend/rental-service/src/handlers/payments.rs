/// Payment and playback endpoints used by the mobile client
use actix_web::{http::StatusCode, web, HttpResponse};
use chrono::{DateTime, Utc};
use error_types::{error_codes, error_types as kinds, ErrorResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::{Caller, MaybeCaller};
use crate::models::{format_minor, Access, InvalidReason};
use crate::services::{
    AccessDecision, AccessGate, CreateOrderInput, OrderOutcome, OrderService, VerifyInput,
    VerifyOutcome,
};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, max = 64))]
    pub movie_id: String,
    #[validate(length(min = 1, max = 128))]
    pub device_id: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    #[validate(length(min = 1, max = 64))]
    pub order_id: String,
    pub movie_id: Option<String>,
    #[validate(length(min = 1))]
    pub razorpay_order_id: String,
    #[validate(length(min = 1))]
    pub razorpay_payment_id: String,
    #[validate(length(min = 1))]
    pub razorpay_signature: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ValidateAccessRequest {
    #[validate(length(min = 1))]
    pub token: String,
    #[validate(length(min = 1, max = 128))]
    pub device_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AccessSummary<'a> {
    access_id: &'a str,
    movie_id: &'a str,
    expiry_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_time: Option<DateTime<Utc>>,
    playback_started: bool,
}

impl<'a> From<&'a Access> for AccessSummary<'a> {
    fn from(access: &'a Access) -> Self {
        Self {
            access_id: &access.access_id,
            movie_id: &access.movie_id,
            expiry_time: access.expiry_time,
            start_time: access.start_time,
            playback_started: access.playback_started,
        }
    }
}

fn validate_body<T: Validate>(body: &T) -> Result<()> {
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

/// POST /payments/create-order
pub async fn create_order(
    caller: MaybeCaller,
    orders: web::Data<OrderService>,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse> {
    validate_body(&*body)?;
    let body = body.into_inner();

    let outcome = orders
        .create_order(CreateOrderInput {
            movie_id: body.movie_id,
            device_id: body.device_id,
            user_id: caller.user_id(),
        })
        .await?;

    match outcome {
        OrderOutcome::Created(order) => {
            let payment = order.payment;
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "orderId": payment.payment_id,
                "razorpayOrderId": payment.gateway_order_id,
                "amount": format_minor(payment.amount_minor),
                "amountMinor": payment.amount_minor,
                "currency": payment.currency,
                "key": order.key,
            })))
        }
        OrderOutcome::AlreadyEntitled(access) => {
            let body = ErrorResponse::new(
                "Conflict",
                "You already have active access to this movie on this device",
                StatusCode::CONFLICT.as_u16(),
                kinds::CONFLICT_ERROR,
                error_codes::ALREADY_ENTITLED,
            )
            .with_details(json!({ "access": AccessSummary::from(&access) }));
            Ok(HttpResponse::Conflict().json(body))
        }
    }
}

/// POST /payments/verify
pub async fn verify_payment(
    caller: MaybeCaller,
    orders: web::Data<OrderService>,
    body: web::Json<VerifyRequest>,
) -> Result<HttpResponse> {
    validate_body(&*body)?;
    let body = body.into_inner();

    let outcome = orders
        .verify(VerifyInput {
            payment_id: body.order_id,
            movie_id: body.movie_id,
            gateway_order_id: body.razorpay_order_id,
            gateway_payment_id: body.razorpay_payment_id,
            signature: body.razorpay_signature,
            user_id: caller.user_id(),
        })
        .await?;

    match outcome {
        VerifyOutcome::Granted(granted) => {
            let access = granted.access;
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "message": "Payment verified",
                "access": {
                    "accessId": access.access_id,
                    "token": access.token,
                    "expiryTime": access.expiry_time,
                    "movieId": access.movie_id,
                    "moviePath": granted.movie_path,
                }
            })))
        }
        VerifyOutcome::InvalidSignature => Err(AppError::PaymentNotConfirmed),
    }
}

/// POST /payments/validate-access
pub async fn validate_access(
    gate: web::Data<AccessGate>,
    body: web::Json<ValidateAccessRequest>,
) -> Result<HttpResponse> {
    validate_body(&*body)?;

    match gate.validate(&body.token, &body.device_id).await? {
        AccessDecision::Valid(valid) => {
            let access = valid.access;
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "valid": true,
                "access": {
                    "accessId": access.access_id,
                    "movieId": access.movie_id,
                    "expiryTime": access.expiry_time,
                    "startTime": access.start_time,
                    "playbackStarted": access.playback_started,
                    "moviePath": valid.movie_path,
                }
            })))
        }
        AccessDecision::Invalid(reason) => {
            let (status, message) = match reason {
                InvalidReason::NotFound => (StatusCode::NOT_FOUND, "Access not found"),
                InvalidReason::Expired => (StatusCode::OK, "Access expired"),
                InvalidReason::PaymentNotSuccessful => (StatusCode::OK, "Payment not successful"),
            };
            Ok(HttpResponse::build(status).json(json!({
                "success": false,
                "valid": false,
                "reason": reason,
                "message": message,
            })))
        }
    }
}

/// GET /payments/my-purchases
pub async fn my_purchases(caller: Caller, orders: web::Data<OrderService>) -> Result<HttpResponse> {
    let purchases = orders.purchases_for_user(&caller.user_id).await?;

    let purchases: Vec<_> = purchases
        .iter()
        .map(|p| {
            json!({
                "paymentId": p.payment.payment_id,
                "movieId": p.payment.movie_id,
                "amount": format_minor(p.payment.amount_minor),
                "amountMinor": p.payment.amount_minor,
                "currency": p.payment.currency,
                "access": p.access.as_ref().map(AccessSummary::from),
                "createdAt": p.payment.created_at,
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "purchases": purchases,
    })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/payments")
            .route("/create-order", web::post().to(create_order))
            .route("/verify", web::post().to(verify_payment))
            .route("/validate-access", web::post().to(validate_access))
            .route("/my-purchases", web::get().to(my_purchases)),
    );
}
