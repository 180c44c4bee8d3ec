/// HTTP handlers
///
/// - payments: order, verify, validate-access, my-purchases
/// - admin: access and payment administration
/// - health: liveness and readiness probes
pub mod admin;
pub mod health;
pub mod payments;

use actix_web::web;

/// Registers every route of the service.
pub fn configure(cfg: &mut web::ServiceConfig) {
    health::configure(cfg);
    payments::configure(cfg);
    admin::configure(cfg);
}
