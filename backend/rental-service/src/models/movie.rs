use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum MovieStatus {
    Draft,
    Published,
    Archived,
}

/// Catalog entry. Only read by the rental flow.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub movie_id: String,
    pub title: String,
    pub description: Option<String>,
    pub duration_seconds: i32,
    /// Price in the currency's minor unit (paise for INR)
    pub price_minor: i64,
    pub currency: String,
    /// Media locator handed to the player once access is granted
    pub file_path: String,
    pub poster_path: Option<String>,
    pub status: MovieStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Movie {
    pub fn duration(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::from(self.duration_seconds))
    }
}
