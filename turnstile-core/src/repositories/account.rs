use crate::{
    Error,
    account::{Account, AccountId},
    storage::NewAccountRecord,
};
use async_trait::async_trait;
use chrono::Duration;

/// Repository for account data access
///
/// The counter mutations are contractually atomic: two concurrent
/// `record_failure` calls for the same account must both be counted. A
/// backend may use an atomic conditional update or serialize per key, but
/// must not split the read-modify-write across the wire.
#[async_trait]
pub trait AccountRepository: Send + Sync + 'static {
    /// Create a new account. An existing account with the same email is
    /// reported as [`crate::error::AuthError::DuplicateEmail`].
    async fn create(&self, account: NewAccountRecord) -> Result<Account, Error>;

    /// Find an account by ID
    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, Error>;

    /// Find an account by email. Callers pass the email already lowercased.
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, Error>;

    /// Atomically record a failed authentication attempt.
    ///
    /// Increments the counter; sets the lock timestamp to now + `lock_for`
    /// only when the post-increment count reaches `max_attempts` and the
    /// account is not already locked (an active lock window is never
    /// extended). A failure recorded after a previous lock has expired
    /// starts a fresh window.
    ///
    /// Returns the updated account.
    async fn record_failure(
        &self,
        id: &AccountId,
        max_attempts: u32,
        lock_for: Duration,
    ) -> Result<Account, Error>;

    /// Record a successful authentication: zero the counter, clear the
    /// lock, and stamp `last_login_at`.
    async fn record_success(&self, id: &AccountId) -> Result<Account, Error>;

    /// Zero the counter and clear the lock without touching
    /// `last_login_at`. Used when a password is replaced.
    async fn clear_lockout(&self, id: &AccountId) -> Result<Account, Error>;

    /// Activate or deactivate an account
    async fn set_active(&self, id: &AccountId, is_active: bool) -> Result<(), Error>;
}
