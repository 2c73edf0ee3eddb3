//! Repository implementations for in-memory storage

pub mod account;
pub mod ip_attempt;
pub mod password;
pub mod reset_token;
pub mod revoked_token;

pub use account::MemoryAccountRepository;
pub use ip_attempt::MemoryIpAttemptRepository;
pub use password::MemoryPasswordRepository;
pub use reset_token::MemoryResetTokenRepository;
pub use revoked_token::MemoryRevokedTokenRepository;

use async_trait::async_trait;
use std::sync::Arc;
use turnstile_core::{
    Error,
    repositories::{
        AccountRepositoryProvider, IpAttemptRepositoryProvider, PasswordRepositoryProvider,
        RepositoryProvider, ResetTokenRepositoryProvider, RevokedTokenRepositoryProvider,
    },
};

/// Repository provider implementation for in-memory storage
///
/// This struct implements all the individual repository provider traits
/// as well as the unified `RepositoryProvider` trait.
#[derive(Default)]
pub struct MemoryRepositoryProvider {
    account: Arc<MemoryAccountRepository>,
    password: Arc<MemoryPasswordRepository>,
    ip_attempt: Arc<MemoryIpAttemptRepository>,
    revoked_token: Arc<MemoryRevokedTokenRepository>,
    reset_token: Arc<MemoryResetTokenRepository>,
}

impl MemoryRepositoryProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

// Implement individual provider traits

impl AccountRepositoryProvider for MemoryRepositoryProvider {
    type AccountRepo = MemoryAccountRepository;

    fn account(&self) -> &Self::AccountRepo {
        &self.account
    }
}

impl PasswordRepositoryProvider for MemoryRepositoryProvider {
    type PasswordRepo = MemoryPasswordRepository;

    fn password(&self) -> &Self::PasswordRepo {
        &self.password
    }
}

impl IpAttemptRepositoryProvider for MemoryRepositoryProvider {
    type IpAttemptRepo = MemoryIpAttemptRepository;

    fn ip_attempt(&self) -> &Self::IpAttemptRepo {
        &self.ip_attempt
    }
}

impl RevokedTokenRepositoryProvider for MemoryRepositoryProvider {
    type RevokedTokenRepo = MemoryRevokedTokenRepository;

    fn revoked_token(&self) -> &Self::RevokedTokenRepo {
        &self.revoked_token
    }
}

impl ResetTokenRepositoryProvider for MemoryRepositoryProvider {
    type ResetTokenRepo = MemoryResetTokenRepository;

    fn reset_token(&self) -> &Self::ResetTokenRepo {
        &self.reset_token
    }
}

// Implement the unified RepositoryProvider trait

#[async_trait]
impl RepositoryProvider for MemoryRepositoryProvider {
    async fn migrate(&self) -> Result<(), Error> {
        // Nothing to migrate in memory
        Ok(())
    }

    async fn health_check(&self) -> Result<(), Error> {
        Ok(())
    }
}
