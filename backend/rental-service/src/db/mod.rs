/// Database access layer
///
/// Each store is a trait so the workflow can run against PostgreSQL in
/// production and against in-memory fakes in tests. All correctness-critical
/// coordination happens in single conditional statements and uniqueness
/// constraints; there is no application-level locking.
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{Access, Movie, NewAccess, NewPayment, Payment, PaymentTransition};

pub mod access_repo;
pub mod movie_repo;
pub mod payment_repo;
pub mod sequence_repo;

pub use access_repo::PgAccessStore;
pub use movie_repo::PgMovieStore;
pub use payment_repo::PgPaymentStore;
pub use sequence_repo::PgSequenceStore;

pub type StoreResult<T> = std::result::Result<T, sqlx::Error>;

/// Backing store for identifier sequences.
#[async_trait]
pub trait SequenceStore: Send + Sync {
    /// Atomically advances the named counter and returns the new value.
    /// A counter that does not exist yet starts at `seed`.
    async fn next_value(&self, sequence: &str, seed: i64) -> StoreResult<i64>;

    /// Records `id` as issued. Returns `false` if it was issued before.
    async fn claim(&self, sequence: &str, id: &str) -> StoreResult<bool>;
}

#[async_trait]
pub trait MovieStore: Send + Sync {
    async fn find_by_movie_id(&self, movie_id: &str) -> StoreResult<Option<Movie>>;
}

/// Payment ledger.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn insert(&self, payment: NewPayment) -> StoreResult<Payment>;

    async fn find_by_payment_id(&self, payment_id: &str) -> StoreResult<Option<Payment>>;

    /// Applies a forward-only status change. Returns `None` when the current
    /// status does not allow `transition.to` (illegal move or lost race).
    async fn transition(
        &self,
        payment_id: &str,
        transition: PaymentTransition,
    ) -> StoreResult<Option<Payment>>;

    /// Links the minted access. Only sets `access_id` when still unset and
    /// returns the row as stored afterwards.
    async fn link_access(&self, payment_id: &str, access_id: &str) -> StoreResult<Option<Payment>>;

    async fn list_recent(&self, limit: i64) -> StoreResult<Vec<Payment>>;

    /// Successful payments made by `user_id`, newest first.
    async fn list_settled_for_user(&self, user_id: &str) -> StoreResult<Vec<Payment>>;

    /// Successful payments that never got an access linked, oldest first.
    async fn find_settled_without_access(&self, limit: i64) -> StoreResult<Vec<Payment>>;
}

/// Entitlement store.
#[async_trait]
pub trait AccessStore: Send + Sync {
    /// Inserts the access unless one already exists for the same payment.
    /// Returns the stored access and whether this call created it.
    async fn insert_for_payment(&self, access: NewAccess) -> StoreResult<(Access, bool)>;

    async fn find_by_payment_id(&self, payment_id: &str) -> StoreResult<Option<Access>>;

    async fn find_by_access_id(&self, access_id: &str) -> StoreResult<Option<Access>>;

    /// Exact (token, device) lookup.
    async fn find_by_token_and_device(
        &self,
        token: &str,
        device_id: &str,
    ) -> StoreResult<Option<Access>>;

    /// An unexpired, successfully paid access for this movie on this device.
    async fn find_active_for_device(
        &self,
        movie_id: &str,
        device_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Access>>;

    /// Sets `playback_started` and `start_time` if playback has not started.
    /// Returns the updated access, or `None` when another call got there first.
    async fn mark_playback_started(
        &self,
        access_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Access>>;

    /// Collapses the expiry to `now` (an already-earlier expiry is kept).
    async fn revoke(&self, access_id: &str, now: DateTime<Utc>) -> StoreResult<Option<Access>>;

    async fn list_recent(&self, limit: i64) -> StoreResult<Vec<Access>>;
}
