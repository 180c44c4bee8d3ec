/// Order/verify workflow
///
/// Turns a priced gateway order into a settled payment and exactly one
/// access grant per payment. Every step that can race is a single
/// conditional write in the stores:
///
/// - payment status moves only forward (`PaymentStore::transition`)
/// - access minting is keyed on the payment id (`AccessStore::insert_for_payment`)
/// - the payment -> access link is set once (`PaymentStore::link_access`)
///
/// A verify retried after a partial failure, or the reconciliation sweep,
/// therefore converges on the same single access.
use chrono::{Duration, Utc};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::db::{AccessStore, MovieStore, PaymentStore};
use crate::error::{AppError, Result};
use crate::models::{
    Access, AccessPaymentStatus, Movie, NewAccess, NewPayment, Payment, PaymentStatus,
    PaymentTransition,
};
use crate::services::gateway::{OrderRequest, PaymentGateway};
use crate::services::id_allocator::{IdAllocator, Sequence};

#[derive(Debug, Clone)]
pub struct CreateOrderInput {
    pub movie_id: String,
    pub device_id: String,
    /// None for guest checkout
    pub user_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreatedOrder {
    pub payment: Payment,
    /// Public gateway key for the client-side checkout
    pub key: String,
}

#[derive(Debug, Clone)]
pub enum OrderOutcome {
    Created(CreatedOrder),
    /// The device already holds a live paid access for this movie
    AlreadyEntitled(Access),
}

#[derive(Debug, Clone)]
pub struct VerifyInput {
    pub payment_id: String,
    /// When present, must match the movie the order was opened for
    pub movie_id: Option<String>,
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GrantedAccess {
    pub access: Access,
    pub movie_path: String,
}

#[derive(Debug, Clone)]
pub enum VerifyOutcome {
    Granted(GrantedAccess),
    InvalidSignature,
}

#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    pub minted: Vec<String>,
    pub failed: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Purchase {
    pub payment: Payment,
    pub access: Option<Access>,
}

pub struct OrderService {
    movies: Arc<dyn MovieStore>,
    payments: Arc<dyn PaymentStore>,
    accesses: Arc<dyn AccessStore>,
    gateway: Arc<dyn PaymentGateway>,
    ids: IdAllocator,
    grace_period: Duration,
}

impl OrderService {
    pub fn new(
        movies: Arc<dyn MovieStore>,
        payments: Arc<dyn PaymentStore>,
        accesses: Arc<dyn AccessStore>,
        gateway: Arc<dyn PaymentGateway>,
        ids: IdAllocator,
        grace_period: Duration,
    ) -> Self {
        Self {
            movies,
            payments,
            accesses,
            gateway,
            ids,
            grace_period,
        }
    }

    /// Opens a gateway order for the movie's current price.
    ///
    /// No payment row is written unless the gateway confirmed the order.
    /// Two concurrent calls for the same (movie, device) can both pass the
    /// entitlement check; only payments that later verify mint access.
    pub async fn create_order(&self, input: CreateOrderInput) -> Result<OrderOutcome> {
        let movie = self.load_movie(&input.movie_id).await?;

        if let Some(active) = self
            .accesses
            .find_active_for_device(&movie.movie_id, &input.device_id, Utc::now())
            .await?
        {
            info!(
                movie_id = %movie.movie_id,
                device_id = %input.device_id,
                access_id = %active.access_id,
                "Device already entitled, order rejected"
            );
            return Ok(OrderOutcome::AlreadyEntitled(active));
        }

        let payment_id = self.ids.next_id(Sequence::Payment).await;

        let order = self
            .gateway
            .create_order(OrderRequest {
                amount_minor: movie.price_minor,
                currency: movie.currency.clone(),
                receipt: payment_id.clone(),
                movie_id: movie.movie_id.clone(),
                device_id: input.device_id.clone(),
            })
            .await?;

        if order.amount != movie.price_minor {
            warn!(
                payment_id = %payment_id,
                gateway_amount = order.amount,
                price_minor = movie.price_minor,
                "Gateway order amount differs from movie price"
            );
        }

        let payment = self
            .payments
            .insert(NewPayment {
                payment_id,
                user_id: input.user_id,
                gateway: self.gateway.name().to_string(),
                gateway_order_id: order.id.clone(),
                amount_minor: movie.price_minor,
                currency: movie.currency.clone(),
                device_id: input.device_id,
                movie_id: movie.movie_id.clone(),
                meta: Some(json!({
                    "order": {
                        "id": order.id,
                        "amount": order.amount,
                        "currency": order.currency,
                        "status": order.status,
                    }
                })),
            })
            .await?;

        info!(
            payment_id = %payment.payment_id,
            movie_id = %payment.movie_id,
            device_id = %payment.device_id,
            gateway_order_id = %payment.gateway_order_id,
            guest = payment.user_id.is_none(),
            "Order created"
        );

        Ok(OrderOutcome::Created(CreatedOrder {
            payment,
            key: self.gateway.public_key().to_string(),
        }))
    }

    /// Settles a payment from the checkout callback and returns its access.
    ///
    /// Idempotent: verifying an already successful payment again returns the
    /// access minted the first time (minting it now if an earlier attempt
    /// stopped short).
    pub async fn verify(&self, input: VerifyInput) -> Result<VerifyOutcome> {
        let payment = self
            .payments
            .find_by_payment_id(&input.payment_id)
            .await?
            .ok_or_else(|| AppError::payment_not_found(&input.payment_id))?;

        if let Some(movie_id) = &input.movie_id {
            if movie_id != &payment.movie_id {
                return Err(AppError::BadRequest(
                    "Order does not belong to this movie".into(),
                ));
            }
        }

        if payment.status.is_terminal() {
            info!(
                payment_id = %payment.payment_id,
                status = %payment.status,
                "Verify on settled-negative payment"
            );
            return Err(AppError::PaymentNotConfirmed);
        }

        // The signature is recomputed over the order id we stored, so a
        // callback carrying some other order id can never match.
        let signature_ok = input.gateway_order_id == payment.gateway_order_id
            && self.gateway.verify_signature(
                &payment.gateway_order_id,
                &input.gateway_payment_id,
                &input.signature,
            )?;

        if !signature_ok {
            return self.reject_signature(&payment).await;
        }

        let settled = if payment.status == PaymentStatus::Success {
            payment
        } else {
            self.settle(&payment, &input).await?
        };

        let (access, movie, _) = self.mint_access(&settled).await?;
        Ok(VerifyOutcome::Granted(GrantedAccess {
            access,
            movie_path: movie.file_path,
        }))
    }

    async fn reject_signature(&self, payment: &Payment) -> Result<VerifyOutcome> {
        if payment.status == PaymentStatus::Success {
            warn!(
                payment_id = %payment.payment_id,
                "Invalid signature on already successful payment, status unchanged"
            );
            return Ok(VerifyOutcome::InvalidSignature);
        }

        let failed = self
            .payments
            .transition(
                &payment.payment_id,
                PaymentTransition::to(PaymentStatus::Failed)
                    .with_meta(json!({ "failureReason": "signature_mismatch" })),
            )
            .await?;

        match failed {
            Some(_) => warn!(
                payment_id = %payment.payment_id,
                "Payment signature mismatch, payment marked failed"
            ),
            None => warn!(
                payment_id = %payment.payment_id,
                "Payment signature mismatch, payment already settled concurrently"
            ),
        }
        Ok(VerifyOutcome::InvalidSignature)
    }

    async fn settle(&self, payment: &Payment, input: &VerifyInput) -> Result<Payment> {
        let transition = PaymentTransition::to(PaymentStatus::Success)
            .with_gateway_payment_id(input.gateway_payment_id.clone())
            .with_user_id(input.user_id.clone());

        if let Some(updated) = self
            .payments
            .transition(&payment.payment_id, transition)
            .await?
        {
            info!(
                payment_id = %updated.payment_id,
                gateway_payment_id = %input.gateway_payment_id,
                "Payment marked success"
            );
            return Ok(updated);
        }

        // Lost the race: whoever won decides the outcome.
        let current = self
            .payments
            .find_by_payment_id(&payment.payment_id)
            .await?
            .ok_or_else(|| AppError::payment_not_found(&payment.payment_id))?;

        if current.status == PaymentStatus::Success {
            Ok(current)
        } else {
            warn!(
                payment_id = %current.payment_id,
                status = %current.status,
                "Payment settled concurrently without success"
            );
            Err(AppError::PaymentNotConfirmed)
        }
    }

    /// Mints the access for a successful payment, or returns the one that
    /// already exists. The boolean is true when this call created it.
    async fn mint_access(&self, payment: &Payment) -> Result<(Access, Movie, bool)> {
        let movie = self.load_movie(&payment.movie_id).await?;

        let (access, created) = match self.accesses.find_by_payment_id(&payment.payment_id).await? {
            Some(existing) => (existing, false),
            None => {
                let access_id = self.ids.next_id(Sequence::Access).await;
                let expiry_time = Utc::now() + movie.duration() + self.grace_period;

                self.accesses
                    .insert_for_payment(NewAccess {
                        access_id,
                        token: crypto_core::token::generate_access_token(),
                        user_id: payment.user_id.clone(),
                        movie_id: movie.movie_id.clone(),
                        device_id: payment.device_id.clone(),
                        payment_id: payment.payment_id.clone(),
                        expiry_time,
                        payment_status: AccessPaymentStatus::Success,
                    })
                    .await?
            }
        };

        if payment.access_id.as_deref() != Some(access.access_id.as_str()) {
            self.payments
                .link_access(&payment.payment_id, &access.access_id)
                .await?;
        }

        if created {
            info!(
                payment_id = %payment.payment_id,
                access_id = %access.access_id,
                device_id = %payment.device_id,
                expiry_time = %access.expiry_time,
                "Access granted"
            );
        }
        Ok((access, movie, created))
    }

    /// Mints missing accesses for successful payments that have none.
    pub async fn reconcile(&self, limit: i64) -> Result<ReconcileReport> {
        let orphans = self.payments.find_settled_without_access(limit).await?;
        let mut report = ReconcileReport::default();

        for payment in orphans {
            match self.mint_access(&payment).await {
                Ok((access, _, _)) => report.minted.push(access.access_id),
                Err(e) => {
                    error!(
                        payment_id = %payment.payment_id,
                        error = %e,
                        "Failed to reconcile payment"
                    );
                    report.failed.push(payment.payment_id);
                }
            }
        }

        if !report.minted.is_empty() || !report.failed.is_empty() {
            info!(
                minted = report.minted.len(),
                failed = report.failed.len(),
                "Reconciliation finished"
            );
        }
        Ok(report)
    }

    /// Marks a successful payment refunded and collapses its access expiry.
    ///
    /// An already refunded payment skips the transition and only revokes, so
    /// a refund interrupted between the two steps can be retried.
    pub async fn refund(&self, payment_id: &str) -> Result<Payment> {
        let payment = self
            .payments
            .find_by_payment_id(payment_id)
            .await?
            .ok_or_else(|| AppError::payment_not_found(payment_id))?;

        let status = payment.status;
        let refunded = match status {
            PaymentStatus::Refunded => payment,
            _ => self.mark_refunded(payment_id).await?,
        };

        let access = match &refunded.access_id {
            Some(access_id) => self.accesses.find_by_access_id(access_id).await?,
            None => self.accesses.find_by_payment_id(payment_id).await?,
        };
        if let Some(access) = access {
            self.accesses.revoke(&access.access_id, Utc::now()).await?;
            info!(
                payment_id = %payment_id,
                access_id = %access.access_id,
                "Access revoked by refund"
            );
        }

        info!(payment_id = %payment_id, "Payment refunded");
        Ok(refunded)
    }

    async fn mark_refunded(&self, payment_id: &str) -> Result<Payment> {
        if let Some(updated) = self
            .payments
            .transition(payment_id, PaymentTransition::to(PaymentStatus::Refunded))
            .await?
        {
            return Ok(updated);
        }

        // Lost the race to a concurrent refund, or the status never allowed it.
        let current = self
            .payments
            .find_by_payment_id(payment_id)
            .await?
            .ok_or_else(|| AppError::payment_not_found(payment_id))?;
        let status = current.status;
        match status {
            PaymentStatus::Refunded => Ok(current),
            status => Err(AppError::invalid_transition(
                payment_id,
                &format!("status is {}", status),
            )),
        }
    }

    pub async fn list_payments(&self, limit: i64) -> Result<Vec<Payment>> {
        Ok(self.payments.list_recent(limit).await?)
    }

    /// Successful purchases of `user_id` with their access, newest first.
    pub async fn purchases_for_user(&self, user_id: &str) -> Result<Vec<Purchase>> {
        let payments = self.payments.list_settled_for_user(user_id).await?;
        let mut purchases = Vec::with_capacity(payments.len());
        for payment in payments {
            let access = self.accesses.find_by_payment_id(&payment.payment_id).await?;
            purchases.push(Purchase { payment, access });
        }
        Ok(purchases)
    }

    async fn load_movie(&self, movie_id: &str) -> Result<Movie> {
        self.movies
            .find_by_movie_id(movie_id)
            .await?
            .ok_or_else(|| AppError::movie_not_found(movie_id))
    }
}
