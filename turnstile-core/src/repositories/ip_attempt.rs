use crate::{Error, storage::IpAttempt};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

/// Repository for per-address attempt tracking
///
/// Keyed by source address only; whether any account exists for the
/// attempted login never reaches this layer. `record_failure` carries the
/// same atomicity contract as the account counter.
#[async_trait]
pub trait IpAttemptRepository: Send + Sync + 'static {
    /// Look up the tracking entry for an address
    async fn find(&self, address: &str) -> Result<Option<IpAttempt>, Error>;

    /// Atomically record a failed attempt from an address.
    ///
    /// Creates the entry on first failure. A counter whose last attempt is
    /// older than `stale_after` restarts at one. The block timestamp is set
    /// to now + `block_for` only when the post-increment count reaches
    /// `max_attempts` and the address is not already blocked.
    async fn record_failure(
        &self,
        address: &str,
        max_attempts: u32,
        block_for: Duration,
        stale_after: Duration,
    ) -> Result<IpAttempt, Error>;

    /// Delete the tracking entry entirely (successful login from this
    /// address)
    async fn clear(&self, address: &str) -> Result<(), Error>;

    /// Delete entries whose last attempt predates `cutoff`. Storage
    /// reclamation only; validity is always re-checked at read time.
    ///
    /// Returns the number of entries deleted.
    async fn delete_stale(&self, cutoff: DateTime<Utc>) -> Result<u64, Error>;
}
