//! Repository implementations for SQLite storage

pub mod account;
pub mod ip_attempt;
pub mod password;
pub mod reset_token;
pub mod revoked_token;

pub use account::SqliteAccountRepository;
pub use ip_attempt::SqliteIpAttemptRepository;
pub use password::SqlitePasswordRepository;
pub use reset_token::SqliteResetTokenRepository;
pub use revoked_token::SqliteRevokedTokenRepository;

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::sync::Arc;
use turnstile_core::{
    Error,
    error::StorageError,
    repositories::{
        AccountRepositoryProvider, IpAttemptRepositoryProvider, PasswordRepositoryProvider,
        RepositoryProvider, ResetTokenRepositoryProvider, RevokedTokenRepositoryProvider,
    },
};

/// Repository provider implementation for SQLite
///
/// This struct implements all the individual repository provider traits
/// as well as the unified `RepositoryProvider` trait.
pub struct SqliteRepositoryProvider {
    pool: SqlitePool,
    account: Arc<SqliteAccountRepository>,
    password: Arc<SqlitePasswordRepository>,
    ip_attempt: Arc<SqliteIpAttemptRepository>,
    revoked_token: Arc<SqliteRevokedTokenRepository>,
    reset_token: Arc<SqliteResetTokenRepository>,
}

impl SqliteRepositoryProvider {
    pub fn new(pool: SqlitePool) -> Self {
        let account = Arc::new(SqliteAccountRepository::new(pool.clone()));
        let password = Arc::new(SqlitePasswordRepository::new(pool.clone()));
        let ip_attempt = Arc::new(SqliteIpAttemptRepository::new(pool.clone()));
        let revoked_token = Arc::new(SqliteRevokedTokenRepository::new(pool.clone()));
        let reset_token = Arc::new(SqliteResetTokenRepository::new(pool.clone()));

        Self {
            pool,
            account,
            password,
            ip_attempt,
            revoked_token,
            reset_token,
        }
    }
}

// Implement individual provider traits

impl AccountRepositoryProvider for SqliteRepositoryProvider {
    type AccountRepo = SqliteAccountRepository;

    fn account(&self) -> &Self::AccountRepo {
        &self.account
    }
}

impl PasswordRepositoryProvider for SqliteRepositoryProvider {
    type PasswordRepo = SqlitePasswordRepository;

    fn password(&self) -> &Self::PasswordRepo {
        &self.password
    }
}

impl IpAttemptRepositoryProvider for SqliteRepositoryProvider {
    type IpAttemptRepo = SqliteIpAttemptRepository;

    fn ip_attempt(&self) -> &Self::IpAttemptRepo {
        &self.ip_attempt
    }
}

impl RevokedTokenRepositoryProvider for SqliteRepositoryProvider {
    type RevokedTokenRepo = SqliteRevokedTokenRepository;

    fn revoked_token(&self) -> &Self::RevokedTokenRepo {
        &self.revoked_token
    }
}

impl ResetTokenRepositoryProvider for SqliteRepositoryProvider {
    type ResetTokenRepo = SqliteResetTokenRepository;

    fn reset_token(&self) -> &Self::ResetTokenRepo {
        &self.reset_token
    }
}

// Implement the unified RepositoryProvider trait

#[async_trait]
impl RepositoryProvider for SqliteRepositoryProvider {
    async fn migrate(&self) -> Result<(), Error> {
        crate::migrations::migrate(&self.pool).await
    }

    async fn health_check(&self) -> Result<(), Error> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;
        Ok(())
    }
}
