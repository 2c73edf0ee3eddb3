use crate::{
    Error,
    account::AccountId,
    storage::{RevocationReason, RevokedToken},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Repository for the token revocation list
#[async_trait]
pub trait RevokedTokenRepository: Send + Sync + 'static {
    /// Record a token as revoked. Idempotent: revoking an already-revoked
    /// fingerprint is a no-op, not an error, and the original entry is kept.
    async fn revoke(
        &self,
        fingerprint: &str,
        account_id: Option<&AccountId>,
        reason: RevocationReason,
    ) -> Result<(), Error>;

    /// Whether a fingerprint is on the revocation list
    async fn is_revoked(&self, fingerprint: &str) -> Result<bool, Error>;

    /// Look up a revocation entry (diagnostics)
    async fn find(&self, fingerprint: &str) -> Result<Option<RevokedToken>, Error>;

    /// Delete entries revoked before `cutoff`.
    ///
    /// Safe only when the cutoff is at least one token lifetime in the
    /// past: any purged token has already expired on its own.
    ///
    /// Returns the number of entries deleted.
    async fn delete_revoked_before(&self, cutoff: DateTime<Utc>) -> Result<u64, Error>;
}
