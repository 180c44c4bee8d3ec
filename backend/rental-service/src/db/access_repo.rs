/// Entitlement (access grant) repository
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;

use super::{AccessStore, StoreResult};
use crate::models::{Access, AccessPaymentStatus, NewAccess};

const ACCESS_COLUMNS: &str = "access_id, token, user_id, movie_id, device_id, payment_id, \
     start_time, expiry_time, playback_started, payment_status, created_at, updated_at";

#[derive(Clone)]
pub struct PgAccessStore {
    pool: PgPool,
}

impl PgAccessStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessStore for PgAccessStore {
    async fn insert_for_payment(&self, access: NewAccess) -> StoreResult<(Access, bool)> {
        let sql = format!(
            r#"
            INSERT INTO access_grants (
                access_id, token, user_id, movie_id, device_id, payment_id,
                expiry_time, playback_started, payment_status
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE, $8)
            ON CONFLICT (payment_id) DO NOTHING
            RETURNING {ACCESS_COLUMNS}
            "#
        );

        let inserted = sqlx::query_as::<_, Access>(&sql)
            .bind(&access.access_id)
            .bind(&access.token)
            .bind(&access.user_id)
            .bind(&access.movie_id)
            .bind(&access.device_id)
            .bind(&access.payment_id)
            .bind(access.expiry_time)
            .bind(access.payment_status)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(created) = inserted {
            return Ok((created, true));
        }

        debug!(payment_id = %access.payment_id, "Access already minted for payment");
        match self.find_by_payment_id(&access.payment_id).await? {
            Some(existing) => Ok((existing, false)),
            None => Err(sqlx::Error::RowNotFound),
        }
    }

    async fn find_by_payment_id(&self, payment_id: &str) -> StoreResult<Option<Access>> {
        let sql = format!("SELECT {ACCESS_COLUMNS} FROM access_grants WHERE payment_id = $1");
        sqlx::query_as::<_, Access>(&sql)
            .bind(payment_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_by_access_id(&self, access_id: &str) -> StoreResult<Option<Access>> {
        let sql = format!("SELECT {ACCESS_COLUMNS} FROM access_grants WHERE access_id = $1");
        sqlx::query_as::<_, Access>(&sql)
            .bind(access_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_by_token_and_device(
        &self,
        token: &str,
        device_id: &str,
    ) -> StoreResult<Option<Access>> {
        let sql = format!(
            "SELECT {ACCESS_COLUMNS} FROM access_grants WHERE token = $1 AND device_id = $2"
        );
        sqlx::query_as::<_, Access>(&sql)
            .bind(token)
            .bind(device_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_active_for_device(
        &self,
        movie_id: &str,
        device_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Access>> {
        let sql = format!(
            r#"
            SELECT {ACCESS_COLUMNS}
            FROM access_grants
            WHERE movie_id = $1
              AND device_id = $2
              AND expiry_time > $3
              AND payment_status = $4
            ORDER BY expiry_time DESC
            LIMIT 1
            "#
        );
        sqlx::query_as::<_, Access>(&sql)
            .bind(movie_id)
            .bind(device_id)
            .bind(now)
            .bind(AccessPaymentStatus::Success)
            .fetch_optional(&self.pool)
            .await
    }

    async fn mark_playback_started(
        &self,
        access_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Access>> {
        let sql = format!(
            r#"
            UPDATE access_grants
            SET playback_started = TRUE, start_time = $2, updated_at = NOW()
            WHERE access_id = $1 AND playback_started = FALSE
            RETURNING {ACCESS_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Access>(&sql)
            .bind(access_id)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
    }

    async fn revoke(&self, access_id: &str, now: DateTime<Utc>) -> StoreResult<Option<Access>> {
        let sql = format!(
            r#"
            UPDATE access_grants
            SET expiry_time = LEAST(expiry_time, $2), updated_at = NOW()
            WHERE access_id = $1
            RETURNING {ACCESS_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Access>(&sql)
            .bind(access_id)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
    }

    async fn list_recent(&self, limit: i64) -> StoreResult<Vec<Access>> {
        let sql = format!(
            "SELECT {ACCESS_COLUMNS} FROM access_grants ORDER BY created_at DESC LIMIT $1"
        );
        sqlx::query_as::<_, Access>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
    }
}
