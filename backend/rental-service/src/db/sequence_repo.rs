/// Identifier sequence repository
use async_trait::async_trait;
use sqlx::PgPool;

use super::{SequenceStore, StoreResult};

#[derive(Clone)]
pub struct PgSequenceStore {
    pool: PgPool,
}

impl PgSequenceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SequenceStore for PgSequenceStore {
    async fn next_value(&self, sequence: &str, seed: i64) -> StoreResult<i64> {
        let value: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO id_sequences (name, value, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (name)
            DO UPDATE SET value = id_sequences.value + 1, updated_at = NOW()
            RETURNING value
            "#,
        )
        .bind(sequence)
        .bind(seed)
        .fetch_one(&self.pool)
        .await?;

        Ok(value)
    }

    async fn claim(&self, sequence: &str, id: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO issued_ids (sequence_name, issued_id, issued_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (sequence_name, issued_id) DO NOTHING
            "#,
        )
        .bind(sequence)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
