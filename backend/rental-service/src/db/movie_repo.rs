/// Movie repository (read-only for the rental flow)
use async_trait::async_trait;
use sqlx::PgPool;

use super::{MovieStore, StoreResult};
use crate::models::Movie;

#[derive(Clone)]
pub struct PgMovieStore {
    pool: PgPool,
}

impl PgMovieStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MovieStore for PgMovieStore {
    async fn find_by_movie_id(&self, movie_id: &str) -> StoreResult<Option<Movie>> {
        sqlx::query_as::<_, Movie>(
            r#"
            SELECT movie_id, title, description, duration_seconds, price_minor, currency,
                   file_path, poster_path, status, created_at, updated_at
            FROM movies
            WHERE movie_id = $1
            "#,
        )
        .bind(movie_id)
        .fetch_optional(&self.pool)
        .await
    }
}
