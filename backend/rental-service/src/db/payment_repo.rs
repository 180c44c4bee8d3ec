/// Payment ledger repository
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use super::{PaymentStore, StoreResult};
use crate::models::{NewPayment, Payment, PaymentStatus, PaymentTransition};

const PAYMENT_COLUMNS: &str = "payment_id, user_id, gateway, gateway_order_id, gateway_payment_id, \
     amount_minor, currency, status, device_id, movie_id, access_id, meta, created_at, updated_at";

#[derive(Clone)]
pub struct PgPaymentStore {
    pool: PgPool,
}

impl PgPaymentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentStore for PgPaymentStore {
    async fn insert(&self, payment: NewPayment) -> StoreResult<Payment> {
        let sql = format!(
            r#"
            INSERT INTO payments (
                payment_id, user_id, gateway, gateway_order_id, amount_minor,
                currency, status, device_id, movie_id, meta
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {PAYMENT_COLUMNS}
            "#
        );

        let stored = sqlx::query_as::<_, Payment>(&sql)
            .bind(&payment.payment_id)
            .bind(&payment.user_id)
            .bind(&payment.gateway)
            .bind(&payment.gateway_order_id)
            .bind(payment.amount_minor)
            .bind(&payment.currency)
            .bind(PaymentStatus::Created)
            .bind(&payment.device_id)
            .bind(&payment.movie_id)
            .bind(&payment.meta)
            .fetch_one(&self.pool)
            .await?;

        debug!(payment_id = %stored.payment_id, "Payment row inserted");
        Ok(stored)
    }

    async fn find_by_payment_id(&self, payment_id: &str) -> StoreResult<Option<Payment>> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE payment_id = $1");
        sqlx::query_as::<_, Payment>(&sql)
            .bind(payment_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn transition(
        &self,
        payment_id: &str,
        transition: PaymentTransition,
    ) -> StoreResult<Option<Payment>> {
        let allowed_from: Vec<String> = transition
            .to
            .predecessors()
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();

        let sql = format!(
            r#"
            UPDATE payments
            SET status = $2,
                gateway_payment_id = COALESCE($3, gateway_payment_id),
                user_id = COALESCE($4, user_id),
                meta = COALESCE($5, meta),
                updated_at = NOW()
            WHERE payment_id = $1 AND status = ANY($6)
            RETURNING {PAYMENT_COLUMNS}
            "#
        );

        let updated = sqlx::query_as::<_, Payment>(&sql)
            .bind(payment_id)
            .bind(transition.to)
            .bind(&transition.gateway_payment_id)
            .bind(&transition.user_id)
            .bind(&transition.meta)
            .bind(&allowed_from)
            .fetch_optional(&self.pool)
            .await?;

        if updated.is_none() {
            debug!(
                payment_id = %payment_id,
                to = %transition.to,
                "Payment transition not applied"
            );
        }
        Ok(updated)
    }

    async fn link_access(&self, payment_id: &str, access_id: &str) -> StoreResult<Option<Payment>> {
        sqlx::query(
            r#"
            UPDATE payments
            SET access_id = $2, updated_at = NOW()
            WHERE payment_id = $1 AND access_id IS NULL
            "#,
        )
        .bind(payment_id)
        .bind(access_id)
        .execute(&self.pool)
        .await?;

        self.find_by_payment_id(payment_id).await
    }

    async fn list_recent(&self, limit: i64) -> StoreResult<Vec<Payment>> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments ORDER BY created_at DESC LIMIT $1"
        );
        sqlx::query_as::<_, Payment>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
    }

    async fn list_settled_for_user(&self, user_id: &str) -> StoreResult<Vec<Payment>> {
        let sql = format!(
            r#"
            SELECT {PAYMENT_COLUMNS}
            FROM payments
            WHERE user_id = $1 AND status = $2
            ORDER BY created_at DESC
            "#
        );
        sqlx::query_as::<_, Payment>(&sql)
            .bind(user_id)
            .bind(PaymentStatus::Success)
            .fetch_all(&self.pool)
            .await
    }

    async fn find_settled_without_access(&self, limit: i64) -> StoreResult<Vec<Payment>> {
        let sql = format!(
            r#"
            SELECT {PAYMENT_COLUMNS}
            FROM payments
            WHERE status = $1 AND access_id IS NULL
            ORDER BY created_at ASC
            LIMIT $2
            "#
        );
        sqlx::query_as::<_, Payment>(&sql)
            .bind(PaymentStatus::Success)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
    }
}
