use crate::{Error, account::AccountId, storage::ResetToken};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Repository for single-use password-reset tokens
#[async_trait]
pub trait ResetTokenRepository: Send + Sync + 'static {
    /// Create a fresh reset token for an account.
    ///
    /// Deletes the account's prior unused tokens in the same operation, so
    /// at most one unused token exists per account at any time.
    async fn create(
        &self,
        account_id: &AccountId,
        secret: &str,
        expires_at: DateTime<Utc>,
        requested_from: &str,
    ) -> Result<ResetToken, Error>;

    /// Look up a token by secret, returning it only while unused and
    /// unexpired. Wrong secret, expired, and already-used all come back as
    /// `None`.
    async fn find_valid(&self, secret: &str) -> Result<Option<ResetToken>, Error>;

    /// Atomically flip the used flag.
    ///
    /// Returns `true` for the single caller that wins the transition;
    /// `false` if the token was already used, expired, or never existed.
    async fn consume(&self, secret: &str) -> Result<bool, Error>;

    /// Delete tokens that expired before `now`. Storage reclamation only.
    ///
    /// Returns the number of tokens deleted.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, Error>;
}
