//! Credential store service: account creation, password verification, and
//! lockout bookkeeping.
//!
//! Passwords are hashed with bcrypt at cost 12. The hash runs on the
//! blocking thread pool; at this work factor a hash takes long enough to
//! stall an async worker otherwise.

use crate::{
    Error,
    account::{Account, AccountId},
    error::{AuthError, CryptoError},
    repositories::{AccountRepository, PasswordRepository},
    storage::{LockoutConfig, NewAccountRecord},
    validation::{validate_display_name, validate_email, validate_password},
};
use std::sync::{Arc, LazyLock};

const BCRYPT_COST: u32 = 12;

/// Hash verified when no stored hash exists, so a request for an unknown
/// email costs the same as a wrong password for a known one.
static DUMMY_HASH: LazyLock<String> = LazyLock::new(|| {
    bcrypt::hash("turnstile-timing-equalizer", BCRYPT_COST).expect("bcrypt cost 12 is valid")
});

/// Service for credential store operations
pub struct CredentialService<A: AccountRepository, P: PasswordRepository> {
    account_repository: Arc<A>,
    password_repository: Arc<P>,
    config: LockoutConfig,
}

impl<A: AccountRepository, P: PasswordRepository> CredentialService<A, P> {
    /// Create a new CredentialService with the given repositories
    pub fn new(
        account_repository: Arc<A>,
        password_repository: Arc<P>,
        config: LockoutConfig,
    ) -> Self {
        Self {
            account_repository,
            password_repository,
            config,
        }
    }

    /// Get the current lockout configuration
    pub fn config(&self) -> &LockoutConfig {
        &self.config
    }

    /// Create a new account with a password.
    ///
    /// The email is normalized to lowercase before storage and lookup. The
    /// plaintext password exists only long enough to hash; a duplicate
    /// email is reported, not retried.
    pub async fn create_account(
        &self,
        email: &str,
        password: &str,
        display_name: Option<String>,
    ) -> Result<Account, Error> {
        validate_email(email)?;
        validate_display_name(display_name.as_deref())?;
        validate_password(password)?;

        let email = email.to_lowercase();

        if self
            .account_repository
            .find_by_email(&email)
            .await?
            .is_some()
        {
            return Err(Error::Auth(AuthError::DuplicateEmail));
        }

        let password_hash = Self::hash_password(password.to_string()).await?;

        let record = NewAccountRecord::builder()
            .id(AccountId::new_random())
            .email(email)
            .display_name(display_name)
            .build()?;

        let account = self.account_repository.create(record).await?;

        self.password_repository
            .set_password_hash(&account.id, &password_hash)
            .await?;

        Ok(account)
    }

    /// Find an account by email (normalized to lowercase)
    pub async fn find_by_email(&self, email: &str) -> Result<Option<Account>, Error> {
        self.account_repository
            .find_by_email(&email.to_lowercase())
            .await
    }

    /// Find an account by ID
    pub async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, Error> {
        self.account_repository.find_by_id(id).await
    }

    /// Verify a candidate password against the account's stored hash.
    ///
    /// When no hash is stored, a dummy hash is verified instead so the call
    /// takes the same time either way, and the answer is `false`.
    pub async fn verify_password(
        &self,
        account_id: &AccountId,
        candidate: &str,
    ) -> Result<bool, Error> {
        match self
            .password_repository
            .get_password_hash(account_id)
            .await?
        {
            Some(hash) => Self::compare_password(candidate.to_string(), hash).await,
            None => {
                self.verify_dummy(candidate).await?;
                Ok(false)
            }
        }
    }

    /// Burn a bcrypt comparison against a fixed hash.
    ///
    /// Called by the orchestrator when no account matched the email, so
    /// missing accounts are not distinguishable from wrong passwords by
    /// response time.
    pub async fn verify_dummy(&self, candidate: &str) -> Result<(), Error> {
        let _ = Self::compare_password(candidate.to_string(), DUMMY_HASH.clone()).await?;
        Ok(())
    }

    /// Atomically record a failed authentication attempt
    pub async fn record_failed_auth(&self, account_id: &AccountId) -> Result<Account, Error> {
        self.account_repository
            .record_failure(
                account_id,
                self.config.max_failed_attempts,
                self.config.lock_duration,
            )
            .await
    }

    /// Record a successful authentication: counters cleared, last login
    /// stamped
    pub async fn record_successful_auth(&self, account_id: &AccountId) -> Result<Account, Error> {
        self.account_repository.record_success(account_id).await
    }

    /// Whether the account is currently locked
    pub async fn is_locked(&self, account_id: &AccountId) -> Result<bool, Error> {
        Ok(self
            .account_repository
            .find_by_id(account_id)
            .await?
            .is_some_and(|account| account.is_locked()))
    }

    /// Replace the account's password and clear the lockout counters.
    ///
    /// The new hash is durably stored before the counters reset, so a
    /// failure between the two leaves a usable (if still throttled)
    /// account, never a half-applied one.
    pub async fn replace_password(
        &self,
        account_id: &AccountId,
        new_password: &str,
    ) -> Result<Account, Error> {
        validate_password(new_password)?;

        let password_hash = Self::hash_password(new_password.to_string()).await?;

        self.password_repository
            .set_password_hash(account_id, &password_hash)
            .await?;

        self.account_repository.clear_lockout(account_id).await
    }

    /// Hash a password with bcrypt on the blocking pool
    async fn hash_password(password: String) -> Result<String, Error> {
        tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST))
            .await
            .map_err(|e| Error::Crypto(CryptoError::PasswordHash(e.to_string())))?
            .map_err(|e| Error::Crypto(CryptoError::PasswordHash(e.to_string())))
    }

    /// Compare a candidate against a stored hash on the blocking pool
    async fn compare_password(candidate: String, hash: String) -> Result<bool, Error> {
        tokio::task::spawn_blocking(move || bcrypt::verify(candidate, &hash))
            .await
            .map_err(|e| Error::Crypto(CryptoError::PasswordHash(e.to_string())))?
            .map_err(|e| Error::Crypto(CryptoError::PasswordHash(e.to_string())))
    }
}
