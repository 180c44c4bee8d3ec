/// Per-playback access validation and administrative revocation
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

use crate::db::{AccessStore, MovieStore};
use crate::error::{AppError, Result};
use crate::models::{Access, InvalidReason};

#[derive(Debug, Clone)]
pub struct ValidAccess {
    pub access: Access,
    pub movie_path: String,
}

#[derive(Debug, Clone)]
pub enum AccessDecision {
    Valid(ValidAccess),
    Invalid(InvalidReason),
}

pub struct AccessGate {
    accesses: Arc<dyn AccessStore>,
    movies: Arc<dyn MovieStore>,
}

impl AccessGate {
    pub fn new(accesses: Arc<dyn AccessStore>, movies: Arc<dyn MovieStore>) -> Self {
        Self { accesses, movies }
    }

    /// Authoritative check for `token` presented from `device_id`.
    ///
    /// A token from the wrong device is reported exactly like an unknown
    /// token. The first valid call starts playback; later calls leave
    /// `start_time` untouched.
    pub async fn validate(&self, token: &str, device_id: &str) -> Result<AccessDecision> {
        let Some(access) = self
            .accesses
            .find_by_token_and_device(token, device_id)
            .await?
        else {
            debug!(device_id = %device_id, "Access lookup missed");
            return Ok(AccessDecision::Invalid(InvalidReason::NotFound));
        };

        let now = Utc::now();
        if let Err(reason) = access.evaluate(now) {
            info!(
                access_id = %access.access_id,
                reason = reason.as_str(),
                "Access denied"
            );
            return Ok(AccessDecision::Invalid(reason));
        }

        let access = if access.playback_started {
            access
        } else {
            self.start_playback(access, now).await?
        };

        let movie = self
            .movies
            .find_by_movie_id(&access.movie_id)
            .await?
            .ok_or_else(|| AppError::movie_not_found(&access.movie_id))?;

        Ok(AccessDecision::Valid(ValidAccess {
            access,
            movie_path: movie.file_path,
        }))
    }

    async fn start_playback(&self, access: Access, now: chrono::DateTime<Utc>) -> Result<Access> {
        if let Some(started) = self
            .accesses
            .mark_playback_started(&access.access_id, now)
            .await?
        {
            info!(access_id = %started.access_id, "Playback started");
            return Ok(started);
        }

        // A concurrent validate flipped it first; report its start time.
        Ok(self
            .accesses
            .find_by_access_id(&access.access_id)
            .await?
            .unwrap_or(access))
    }

    /// Revokes an access by collapsing its expiry to now.
    pub async fn revoke(&self, access_id: &str) -> Result<Access> {
        let revoked = self
            .accesses
            .revoke(access_id, Utc::now())
            .await?
            .ok_or_else(|| AppError::access_not_found(access_id))?;

        info!(access_id = %access_id, "Access revoked");
        Ok(revoked)
    }

    pub async fn list_accesses(&self, limit: i64) -> Result<Vec<Access>> {
        Ok(self.accesses.list_recent(limit).await?)
    }
}
