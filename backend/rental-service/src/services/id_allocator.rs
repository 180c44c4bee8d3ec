/// Human readable identifier allocation (PAY10001, ACC10001, ...)
///
/// Each sequence is an atomic counter row. Every issued identifier is also
/// claimed under a uniqueness constraint so a reset counter cannot produce
/// a duplicate. Identifiers written by other means (imports, the backfill
/// migration) are only skipped once they are claimed too. A lost claim is
/// retried with exponential backoff and jitter; once retries are exhausted
/// the allocator degrades to a timestamp-derived identifier instead of
/// failing.
use chrono::Utc;
use error_types::error_codes;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::db::SequenceStore;

/// First value handed out by every sequence.
pub const SEQUENCE_SEED: i64 = 10001;

const MAX_BACKOFF: Duration = Duration::from_millis(500);
const FALLBACK_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sequence {
    Movie,
    User,
    Payment,
    Access,
}

impl Sequence {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Movie => "M",
            Self::User => "U",
            Self::Payment => "PAY",
            Self::Access => "ACC",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::User => "user",
            Self::Payment => "payment",
            Self::Access => "access",
        }
    }

    fn format(&self, value: i64) -> String {
        format!("{}{}", self.prefix(), value)
    }
}

#[derive(Clone)]
pub struct IdAllocator {
    store: Arc<dyn SequenceStore>,
    max_retries: u32,
    initial_backoff: Duration,
}

impl IdAllocator {
    pub fn new(store: Arc<dyn SequenceStore>, max_retries: u32, initial_backoff: Duration) -> Self {
        Self {
            store,
            max_retries,
            initial_backoff,
        }
    }

    /// Returns a fresh identifier for `sequence`. Never fails.
    pub async fn next_id(&self, sequence: Sequence) -> String {
        let mut backoff = self.initial_backoff;

        for attempt in 0..=self.max_retries {
            match self.try_allocate(sequence).await {
                Ok(Some(id)) => {
                    debug!(sequence = sequence.name(), id = %id, "Identifier allocated");
                    return id;
                }
                Ok(None) => {
                    debug!(
                        sequence = sequence.name(),
                        attempt = attempt + 1,
                        "Identifier already issued, retrying"
                    );
                }
                Err(e) => {
                    warn!(
                        sequence = sequence.name(),
                        attempt = attempt + 1,
                        error = %e,
                        "Identifier allocation failed"
                    );
                }
            }

            if attempt < self.max_retries {
                tokio::time::sleep(jittered(backoff)).await;
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
        }

        self.fallback_id(sequence).await
    }

    async fn try_allocate(&self, sequence: Sequence) -> Result<Option<String>, sqlx::Error> {
        let value = self.store.next_value(sequence.name(), SEQUENCE_SEED).await?;
        let id = sequence.format(value);
        if self.store.claim(sequence.name(), &id).await? {
            Ok(Some(id))
        } else {
            Ok(None)
        }
    }

    async fn fallback_id(&self, sequence: Sequence) -> String {
        warn!(
            sequence = sequence.name(),
            error_code = error_codes::ALLOCATION_EXHAUSTED,
            max_retries = self.max_retries,
            "Sequence allocation exhausted, issuing timestamp identifier"
        );

        let mut id = timestamp_id(sequence);
        for _ in 0..FALLBACK_ATTEMPTS {
            match self.store.claim(sequence.name(), &id).await {
                Ok(true) => return id,
                Ok(false) => id = timestamp_id(sequence),
                // Store unavailable: the timestamp id is still unique in practice.
                Err(_) => return id,
            }
        }
        id
    }
}

/// `<prefix><unix micros><3 random digits>`
fn timestamp_id(sequence: Sequence) -> String {
    let micros = Utc::now().timestamp_micros();
    let suffix: u16 = rand::thread_rng().gen_range(0..1000);
    format!("{}{}{:03}", sequence.prefix(), micros, suffix)
}

/// ±30% jitter.
fn jittered(base: Duration) -> Duration {
    let factor = 1.0 + rand::thread_rng().gen_range(-0.3..0.3);
    Duration::from_millis((base.as_millis() as f64 * factor) as u64)
}
