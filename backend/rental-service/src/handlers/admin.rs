/// Administrative endpoints (admin bearer token required)
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::error::Result;
use crate::middleware::AdminCaller;
use crate::services::{AccessGate, OrderService};

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 500;

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

impl LimitQuery {
    fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

/// GET /admin/access
pub async fn list_access(
    _admin: AdminCaller,
    gate: web::Data<AccessGate>,
    query: web::Query<LimitQuery>,
) -> Result<HttpResponse> {
    let access_list = gate.list_accesses(query.limit()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "accessList": access_list,
    })))
}

/// DELETE /admin/access/{access_id}
pub async fn revoke_access(
    admin: AdminCaller,
    gate: web::Data<AccessGate>,
    access_id: web::Path<String>,
) -> Result<HttpResponse> {
    let access = gate.revoke(&access_id).await?;
    tracing::info!(
        admin_id = %admin.0.user_id,
        access_id = %access.access_id,
        "Admin revoked access"
    );
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Access revoked",
    })))
}

/// GET /admin/payments
pub async fn list_payments(
    _admin: AdminCaller,
    orders: web::Data<OrderService>,
    query: web::Query<LimitQuery>,
) -> Result<HttpResponse> {
    let payments = orders.list_payments(query.limit()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "payments": payments,
    })))
}

/// POST /admin/payments/{payment_id}/refund
pub async fn refund_payment(
    admin: AdminCaller,
    orders: web::Data<OrderService>,
    payment_id: web::Path<String>,
) -> Result<HttpResponse> {
    let payment = orders.refund(&payment_id).await?;
    tracing::info!(
        admin_id = %admin.0.user_id,
        payment_id = %payment.payment_id,
        "Admin refunded payment"
    );
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "payment": payment,
    })))
}

/// POST /admin/payments/reconcile
pub async fn reconcile_payments(
    _admin: AdminCaller,
    orders: web::Data<OrderService>,
    query: web::Query<LimitQuery>,
) -> Result<HttpResponse> {
    let report = orders.reconcile(query.limit()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "minted": report.minted.len(),
        "accessIds": report.minted,
        "failedPaymentIds": report.failed,
    })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/access", web::get().to(list_access))
            .route("/access/{access_id}", web::delete().to(revoke_access))
            .route("/payments", web::get().to(list_payments))
            .route("/payments/reconcile", web::post().to(reconcile_payments))
            .route("/payments/{payment_id}/refund", web::post().to(refund_payment)),
    );
}
