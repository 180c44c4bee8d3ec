/// Data models for rental-service
///
/// - Movie: catalog entry referenced by payments and access grants
/// - Payment: ledger row with forward-only status transitions
/// - Access: time-boxed, device-bound streaming entitlement
pub mod access;
pub mod movie;
pub mod payment;

pub use access::{Access, AccessPaymentStatus, InvalidReason, NewAccess};
pub use movie::{Movie, MovieStatus};
pub use payment::{format_minor, NewPayment, Payment, PaymentStatus, PaymentTransition};
