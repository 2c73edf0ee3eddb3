//! Per-address login rate limiting.
//!
//! Tracks failed attempts by source address, independently of any account:
//! one malicious address is throttled no matter how many accounts it
//! targets, and the check never depends on whether an attempted email
//! exists.

use std::sync::Arc;

use chrono::Utc;

use crate::{
    Error,
    error::AuthError,
    repositories::IpAttemptRepository,
    storage::{IpAttempt, RateLimitConfig},
};

/// Service for per-address attempt tracking.
///
/// # Thread Safety
///
/// This service is thread-safe and can be shared across multiple tasks.
/// The underlying repository handles concurrent access appropriately.
pub struct RateLimitService<R: IpAttemptRepository> {
    repository: Arc<R>,
    config: RateLimitConfig,
}

impl<R: IpAttemptRepository> RateLimitService<R> {
    /// Create a new RateLimitService.
    pub fn new(repository: Arc<R>, config: RateLimitConfig) -> Self {
        Self { repository, config }
    }

    /// Get the current configuration.
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Check whether an address may attempt a login.
    ///
    /// Fails with [`AuthError::AddressBlocked`] carrying the remaining wait
    /// when a block is still in its window. A counter whose last attempt is
    /// older than the stale window is treated as reset, whether or not the
    /// background reaper has run.
    pub async fn check_allowed(&self, address: &str) -> Result<(), Error> {
        let Some(attempt) = self.repository.find(address).await? else {
            return Ok(());
        };

        if let Some(retry_after_seconds) = attempt.retry_after_seconds() {
            tracing::warn!(address = %address, retry_after_seconds, "Address is rate limited");
            return Err(Error::Auth(AuthError::AddressBlocked {
                retry_after_seconds,
            }));
        }

        Ok(())
    }

    /// Record a failed attempt from an address.
    ///
    /// Returns the updated tracking entry.
    pub async fn record_failure(&self, address: &str) -> Result<IpAttempt, Error> {
        let attempt = self
            .repository
            .record_failure(
                address,
                self.config.max_failed_attempts,
                self.config.block_duration,
                self.config.stale_after,
            )
            .await?;

        if attempt.is_blocked() {
            tracing::info!(
                address = %address,
                failed_attempts = attempt.failed_attempts,
                "Address blocked after repeated failures"
            );
        }

        Ok(attempt)
    }

    /// Drop the address's tracking entry entirely (successful login).
    pub async fn clear(&self, address: &str) -> Result<(), Error> {
        self.repository.clear(address).await
    }

    /// Start the background cleanup task.
    ///
    /// Removes entries idle past the retention window. Storage reclamation
    /// only; `check_allowed` re-evaluates validity at read time regardless.
    pub fn start_cleanup_task(
        &self,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        let repository = Arc::clone(&self.repository);
        let retention = self.config.retention;

        // Cleanup runs hourly
        const CLEANUP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(3600);

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(CLEANUP_INTERVAL);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        let cutoff = Utc::now() - retention;
                        match repository.delete_stale(cutoff).await {
                            Ok(count) if count > 0 => {
                                tracing::info!(count, "Cleaned up stale address attempt records");
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "Failed to clean up address attempt records");
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("Shutting down rate limit cleanup task");
                        break;
                    }
                }
            }
        })
    }
}
