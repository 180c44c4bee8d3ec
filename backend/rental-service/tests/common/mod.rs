//! Shared fixtures: an in-memory implementation of every store trait and a
//! fake payment gateway that signs like the real one.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use rental_service::db::{AccessStore, MovieStore, PaymentStore, SequenceStore, StoreResult};
use rental_service::models::{
    Access, Movie, MovieStatus, NewAccess, NewPayment, Payment, PaymentStatus, PaymentTransition,
};
use rental_service::services::gateway::{sign_checkout, verify_checkout_signature};
use rental_service::services::{
    AccessGate, GatewayError, GatewayOrder, IdAllocator, OrderRequest, OrderService,
    PaymentGateway,
};

pub const GATEWAY_SECRET: &str = "test_key_secret";
pub const GATEWAY_KEY: &str = "rzp_test_key";
pub const GRACE_SECS: i64 = 1800;

pub fn movie(movie_id: &str, price_minor: i64, duration_seconds: i32) -> Movie {
    let now = Utc::now();
    Movie {
        movie_id: movie_id.to_string(),
        title: format!("Movie {}", movie_id),
        description: None,
        duration_seconds,
        price_minor,
        currency: "INR".to_string(),
        file_path: format!("https://media.example.com/{}/master.m3u8", movie_id),
        poster_path: None,
        status: MovieStatus::Published,
        created_at: now,
        updated_at: now,
    }
}

fn unavailable() -> sqlx::Error {
    sqlx::Error::PoolTimedOut
}

#[derive(Default)]
pub struct MockStore {
    movies: Mutex<HashMap<String, Movie>>,
    payments: Mutex<HashMap<String, Payment>>,
    accesses: Mutex<HashMap<String, Access>>,
    sequences: Mutex<HashMap<String, i64>>,
    issued: Mutex<HashSet<(String, String)>>,
    pub fail_access_inserts: AtomicBool,
    pub fail_sequences: AtomicBool,
    /// Fails the next `revoke` call only.
    pub fail_next_revoke: AtomicBool,
}

impl MockStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn add_movie(&self, movie: Movie) {
        self.movies.lock().await.insert(movie.movie_id.clone(), movie);
    }

    /// Simulates catalog edits after purchase.
    pub async fn update_movie_duration(&self, movie_id: &str, duration_seconds: i32) {
        if let Some(movie) = self.movies.lock().await.get_mut(movie_id) {
            movie.duration_seconds = duration_seconds;
        }
    }

    pub async fn payment(&self, payment_id: &str) -> Option<Payment> {
        self.payments.lock().await.get(payment_id).cloned()
    }

    pub async fn payment_count(&self) -> usize {
        self.payments.lock().await.len()
    }

    pub async fn access(&self, access_id: &str) -> Option<Access> {
        self.accesses.lock().await.get(access_id).cloned()
    }

    pub async fn access_count(&self) -> usize {
        self.accesses.lock().await.len()
    }

    /// Marks an identifier as issued, as legacy rows would.
    pub async fn preissue(&self, sequence: &str, id: &str) {
        self.issued
            .lock()
            .await
            .insert((sequence.to_string(), id.to_string()));
    }

    /// Moves an access expiry into the past.
    pub async fn expire_access(&self, access_id: &str) {
        if let Some(access) = self.accesses.lock().await.get_mut(access_id) {
            access.expiry_time = Utc::now() - Duration::seconds(1);
        }
    }
}

#[async_trait]
impl SequenceStore for MockStore {
    async fn next_value(&self, sequence: &str, seed: i64) -> StoreResult<i64> {
        if self.fail_sequences.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let mut sequences = self.sequences.lock().await;
        let value = sequences
            .entry(sequence.to_string())
            .and_modify(|v| *v += 1)
            .or_insert(seed);
        Ok(*value)
    }

    async fn claim(&self, sequence: &str, id: &str) -> StoreResult<bool> {
        if self.fail_sequences.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(self
            .issued
            .lock()
            .await
            .insert((sequence.to_string(), id.to_string())))
    }
}

#[async_trait]
impl MovieStore for MockStore {
    async fn find_by_movie_id(&self, movie_id: &str) -> StoreResult<Option<Movie>> {
        Ok(self.movies.lock().await.get(movie_id).cloned())
    }
}

#[async_trait]
impl PaymentStore for MockStore {
    async fn insert(&self, payment: NewPayment) -> StoreResult<Payment> {
        let mut payments = self.payments.lock().await;
        if payments.contains_key(&payment.payment_id) {
            return Err(sqlx::Error::Protocol(format!(
                "duplicate payment_id {}",
                payment.payment_id
            )));
        }
        let now = Utc::now();
        let stored = Payment {
            payment_id: payment.payment_id.clone(),
            user_id: payment.user_id,
            gateway: payment.gateway,
            gateway_order_id: payment.gateway_order_id,
            gateway_payment_id: None,
            amount_minor: payment.amount_minor,
            currency: payment.currency,
            status: PaymentStatus::Created,
            device_id: payment.device_id,
            movie_id: payment.movie_id,
            access_id: None,
            meta: payment.meta,
            created_at: now,
            updated_at: now,
        };
        payments.insert(payment.payment_id, stored.clone());
        Ok(stored)
    }

    async fn find_by_payment_id(&self, payment_id: &str) -> StoreResult<Option<Payment>> {
        Ok(self.payments.lock().await.get(payment_id).cloned())
    }

    async fn transition(
        &self,
        payment_id: &str,
        transition: PaymentTransition,
    ) -> StoreResult<Option<Payment>> {
        let mut payments = self.payments.lock().await;
        let Some(payment) = payments.get_mut(payment_id) else {
            return Ok(None);
        };
        if !payment.status.can_transition_to(transition.to) {
            return Ok(None);
        }
        payment.status = transition.to;
        if let Some(id) = transition.gateway_payment_id {
            payment.gateway_payment_id = Some(id);
        }
        if let Some(user_id) = transition.user_id {
            payment.user_id = Some(user_id);
        }
        if let Some(meta) = transition.meta {
            payment.meta = Some(meta);
        }
        payment.updated_at = Utc::now();
        Ok(Some(payment.clone()))
    }

    async fn link_access(&self, payment_id: &str, access_id: &str) -> StoreResult<Option<Payment>> {
        let mut payments = self.payments.lock().await;
        Ok(payments.get_mut(payment_id).map(|payment| {
            if payment.access_id.is_none() {
                payment.access_id = Some(access_id.to_string());
            }
            payment.clone()
        }))
    }

    async fn list_recent(&self, limit: i64) -> StoreResult<Vec<Payment>> {
        let mut all: Vec<_> = self.payments.lock().await.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all.truncate(limit as usize);
        Ok(all)
    }

    async fn list_settled_for_user(&self, user_id: &str) -> StoreResult<Vec<Payment>> {
        let mut settled: Vec<_> = self
            .payments
            .lock()
            .await
            .values()
            .filter(|p| p.user_id.as_deref() == Some(user_id) && p.status == PaymentStatus::Success)
            .cloned()
            .collect();
        settled.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(settled)
    }

    async fn find_settled_without_access(&self, limit: i64) -> StoreResult<Vec<Payment>> {
        let mut orphans: Vec<_> = self
            .payments
            .lock()
            .await
            .values()
            .filter(|p| p.status == PaymentStatus::Success && p.access_id.is_none())
            .cloned()
            .collect();
        orphans.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        orphans.truncate(limit as usize);
        Ok(orphans)
    }
}

#[async_trait]
impl AccessStore for MockStore {
    async fn insert_for_payment(&self, access: NewAccess) -> StoreResult<(Access, bool)> {
        if self.fail_access_inserts.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let mut accesses = self.accesses.lock().await;
        if let Some(existing) = accesses
            .values()
            .find(|a| a.payment_id.as_deref() == Some(access.payment_id.as_str()))
        {
            return Ok((existing.clone(), false));
        }
        let now = Utc::now();
        let stored = Access {
            access_id: access.access_id.clone(),
            token: access.token,
            user_id: access.user_id,
            movie_id: access.movie_id,
            device_id: Some(access.device_id),
            payment_id: Some(access.payment_id),
            start_time: None,
            expiry_time: access.expiry_time,
            playback_started: false,
            payment_status: access.payment_status,
            created_at: now,
            updated_at: now,
        };
        accesses.insert(access.access_id, stored.clone());
        Ok((stored, true))
    }

    async fn find_by_payment_id(&self, payment_id: &str) -> StoreResult<Option<Access>> {
        Ok(self
            .accesses
            .lock()
            .await
            .values()
            .find(|a| a.payment_id.as_deref() == Some(payment_id))
            .cloned())
    }

    async fn find_by_access_id(&self, access_id: &str) -> StoreResult<Option<Access>> {
        Ok(self.accesses.lock().await.get(access_id).cloned())
    }

    async fn find_by_token_and_device(
        &self,
        token: &str,
        device_id: &str,
    ) -> StoreResult<Option<Access>> {
        Ok(self
            .accesses
            .lock()
            .await
            .values()
            .find(|a| a.token == token && a.device_id.as_deref() == Some(device_id))
            .cloned())
    }

    async fn find_active_for_device(
        &self,
        movie_id: &str,
        device_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Access>> {
        Ok(self
            .accesses
            .lock()
            .await
            .values()
            .filter(|a| a.movie_id == movie_id && a.device_id.as_deref() == Some(device_id))
            .filter(|a| a.is_active(now))
            .max_by_key(|a| a.expiry_time)
            .cloned())
    }

    async fn mark_playback_started(
        &self,
        access_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Access>> {
        let mut accesses = self.accesses.lock().await;
        match accesses.get_mut(access_id) {
            Some(access) if !access.playback_started => {
                access.playback_started = true;
                access.start_time = Some(now);
                Ok(Some(access.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn revoke(&self, access_id: &str, now: DateTime<Utc>) -> StoreResult<Option<Access>> {
        if self.fail_next_revoke.swap(false, Ordering::SeqCst) {
            return Err(unavailable());
        }
        let mut accesses = self.accesses.lock().await;
        Ok(accesses.get_mut(access_id).map(|access| {
            access.expiry_time = access.expiry_time.min(now);
            access.clone()
        }))
    }

    async fn list_recent(&self, limit: i64) -> StoreResult<Vec<Access>> {
        let mut all: Vec<_> = self.accesses.lock().await.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all.truncate(limit as usize);
        Ok(all)
    }
}

/// Gateway double. Orders get sequential ids; signatures are real HMACs
/// over `GATEWAY_SECRET`.
#[derive(Default)]
pub struct FakeGateway {
    orders: AtomicU64,
    pub unavailable: AtomicBool,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sign(gateway_order_id: &str, gateway_payment_id: &str) -> String {
        sign_checkout(GATEWAY_SECRET, gateway_order_id, gateway_payment_id).unwrap()
    }

    pub fn orders_created(&self) -> u64 {
        self.orders.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    fn name(&self) -> &str {
        "razorpay"
    }

    fn public_key(&self) -> &str {
        GATEWAY_KEY
    }

    async fn create_order(&self, request: OrderRequest) -> Result<GatewayOrder, GatewayError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("connection refused".into()));
        }
        let n = self.orders.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(GatewayOrder {
            id: format!("order_test_{}", n),
            amount: request.amount_minor,
            currency: request.currency,
            status: "created".into(),
        })
    }

    fn verify_signature(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> Result<bool, GatewayError> {
        verify_checkout_signature(GATEWAY_SECRET, gateway_order_id, gateway_payment_id, signature)
    }
}

pub struct TestHarness {
    pub store: Arc<MockStore>,
    pub gateway: Arc<FakeGateway>,
    pub orders: OrderService,
    pub gate: AccessGate,
}

impl TestHarness {
    pub fn new() -> Self {
        let store = MockStore::new();
        let gateway = FakeGateway::new();
        let ids = IdAllocator::new(store.clone(), 5, std::time::Duration::from_millis(1));

        let orders = OrderService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            gateway.clone(),
            ids,
            Duration::seconds(GRACE_SECS),
        );
        let gate = AccessGate::new(store.clone(), store.clone());

        Self {
            store,
            gateway,
            orders,
            gate,
        }
    }

    /// Harness with one published movie: 100.00 INR, one hour long.
    pub async fn with_movie(movie_id: &str) -> Self {
        let harness = Self::new();
        harness.store.add_movie(movie(movie_id, 10000, 3600)).await;
        harness
    }
}
