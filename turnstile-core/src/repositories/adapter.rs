//! Adapters exposing a [`RepositoryProvider`]'s repositories as individual
//! trait objects, so services stay generic over a single repository type.

use crate::{
    Error,
    account::{Account, AccountId},
    repositories::{
        AccountRepository, IpAttemptRepository, PasswordRepository, RepositoryProvider,
        ResetTokenRepository, RevokedTokenRepository,
    },
    storage::{IpAttempt, NewAccountRecord, ResetToken, RevocationReason, RevokedToken},
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Adapter that wraps a RepositoryProvider and implements [`AccountRepository`]
pub struct AccountRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> AccountRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> AccountRepository for AccountRepositoryAdapter<R> {
    async fn create(&self, account: NewAccountRecord) -> Result<Account, Error> {
        self.provider.account().create(account).await
    }

    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, Error> {
        self.provider.account().find_by_id(id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, Error> {
        self.provider.account().find_by_email(email).await
    }

    async fn record_failure(
        &self,
        id: &AccountId,
        max_attempts: u32,
        lock_for: Duration,
    ) -> Result<Account, Error> {
        self.provider
            .account()
            .record_failure(id, max_attempts, lock_for)
            .await
    }

    async fn record_success(&self, id: &AccountId) -> Result<Account, Error> {
        self.provider.account().record_success(id).await
    }

    async fn clear_lockout(&self, id: &AccountId) -> Result<Account, Error> {
        self.provider.account().clear_lockout(id).await
    }

    async fn set_active(&self, id: &AccountId, is_active: bool) -> Result<(), Error> {
        self.provider.account().set_active(id, is_active).await
    }
}

pub struct PasswordRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> PasswordRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> PasswordRepository for PasswordRepositoryAdapter<R> {
    async fn set_password_hash(&self, account_id: &AccountId, hash: &str) -> Result<(), Error> {
        self.provider
            .password()
            .set_password_hash(account_id, hash)
            .await
    }

    async fn get_password_hash(&self, account_id: &AccountId) -> Result<Option<String>, Error> {
        self.provider.password().get_password_hash(account_id).await
    }
}

pub struct IpAttemptRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> IpAttemptRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> IpAttemptRepository for IpAttemptRepositoryAdapter<R> {
    async fn find(&self, address: &str) -> Result<Option<IpAttempt>, Error> {
        self.provider.ip_attempt().find(address).await
    }

    async fn record_failure(
        &self,
        address: &str,
        max_attempts: u32,
        block_for: Duration,
        stale_after: Duration,
    ) -> Result<IpAttempt, Error> {
        self.provider
            .ip_attempt()
            .record_failure(address, max_attempts, block_for, stale_after)
            .await
    }

    async fn clear(&self, address: &str) -> Result<(), Error> {
        self.provider.ip_attempt().clear(address).await
    }

    async fn delete_stale(&self, cutoff: DateTime<Utc>) -> Result<u64, Error> {
        self.provider.ip_attempt().delete_stale(cutoff).await
    }
}

pub struct RevokedTokenRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> RevokedTokenRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> RevokedTokenRepository for RevokedTokenRepositoryAdapter<R> {
    async fn revoke(
        &self,
        fingerprint: &str,
        account_id: Option<&AccountId>,
        reason: RevocationReason,
    ) -> Result<(), Error> {
        self.provider
            .revoked_token()
            .revoke(fingerprint, account_id, reason)
            .await
    }

    async fn is_revoked(&self, fingerprint: &str) -> Result<bool, Error> {
        self.provider.revoked_token().is_revoked(fingerprint).await
    }

    async fn find(&self, fingerprint: &str) -> Result<Option<RevokedToken>, Error> {
        self.provider.revoked_token().find(fingerprint).await
    }

    async fn delete_revoked_before(&self, cutoff: DateTime<Utc>) -> Result<u64, Error> {
        self.provider
            .revoked_token()
            .delete_revoked_before(cutoff)
            .await
    }
}

pub struct ResetTokenRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> ResetTokenRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> ResetTokenRepository for ResetTokenRepositoryAdapter<R> {
    async fn create(
        &self,
        account_id: &AccountId,
        secret: &str,
        expires_at: DateTime<Utc>,
        requested_from: &str,
    ) -> Result<ResetToken, Error> {
        self.provider
            .reset_token()
            .create(account_id, secret, expires_at, requested_from)
            .await
    }

    async fn find_valid(&self, secret: &str) -> Result<Option<ResetToken>, Error> {
        self.provider.reset_token().find_valid(secret).await
    }

    async fn consume(&self, secret: &str) -> Result<bool, Error> {
        self.provider.reset_token().consume(secret).await
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, Error> {
        self.provider.reset_token().delete_expired(now).await
    }
}
