/// Business logic for rental-service
///
/// - id_allocator: human readable identifiers under concurrent inserts
/// - gateway: payment gateway client and checkout signature checks
/// - orders: order creation, verification, reconciliation and refunds
/// - access_gate: per-playback validation and revocation
pub mod access_gate;
pub mod gateway;
pub mod id_allocator;
pub mod orders;

pub use access_gate::{AccessDecision, AccessGate, ValidAccess};
pub use gateway::{GatewayError, GatewayOrder, OrderRequest, PaymentGateway, RazorpayGateway};
pub use id_allocator::{IdAllocator, Sequence, SEQUENCE_SEED};
pub use orders::{
    CreateOrderInput, CreatedOrder, GrantedAccess, OrderOutcome, OrderService, Purchase,
    ReconcileReport, VerifyInput, VerifyOutcome,
};
