//! Repository traits for data access layer
//!
//! This module defines the repository interfaces that services use to
//! interact with storage. Each store gets its own narrow trait rather than
//! inheriting generic persistence behavior.
//!
//! # Trait Hierarchy
//!
//! The repository system uses a composable trait hierarchy:
//!
//! - Individual `*Repository` traits define the operations for each data domain
//! - Individual `*RepositoryProvider` traits provide access to each repository type
//! - [`RepositoryProvider`] is a supertrait combining all provider traits plus lifecycle methods
//!
//! This design allows storage backends to implement each repository
//! separately and expose them through a single provider handle that the
//! orchestrator receives at construction.

pub mod account;
pub mod adapter;
pub mod ip_attempt;
pub mod password;
pub mod reset_token;
pub mod revoked_token;

pub use account::AccountRepository;
pub use adapter::{
    AccountRepositoryAdapter, IpAttemptRepositoryAdapter, PasswordRepositoryAdapter,
    ResetTokenRepositoryAdapter, RevokedTokenRepositoryAdapter,
};
pub use ip_attempt::IpAttemptRepository;
pub use password::PasswordRepository;
pub use reset_token::ResetTokenRepository;
pub use revoked_token::RevokedTokenRepository;

use async_trait::async_trait;

use crate::Error;

// ============================================================================
// Individual Repository Provider Traits
// ============================================================================

/// Provider trait for account repository access.
pub trait AccountRepositoryProvider: Send + Sync + 'static {
    /// The account repository implementation type
    type AccountRepo: AccountRepository;

    /// Get the account repository
    fn account(&self) -> &Self::AccountRepo;
}

/// Provider trait for password repository access.
pub trait PasswordRepositoryProvider: Send + Sync + 'static {
    /// The password repository implementation type
    type PasswordRepo: PasswordRepository;

    /// Get the password repository
    fn password(&self) -> &Self::PasswordRepo;
}

/// Provider trait for IP attempt repository access.
pub trait IpAttemptRepositoryProvider: Send + Sync + 'static {
    /// The IP attempt repository implementation type
    type IpAttemptRepo: IpAttemptRepository;

    /// Get the IP attempt repository
    fn ip_attempt(&self) -> &Self::IpAttemptRepo;
}

/// Provider trait for revoked token repository access.
pub trait RevokedTokenRepositoryProvider: Send + Sync + 'static {
    /// The revoked token repository implementation type
    type RevokedTokenRepo: RevokedTokenRepository;

    /// Get the revoked token repository
    fn revoked_token(&self) -> &Self::RevokedTokenRepo;
}

/// Provider trait for reset token repository access.
pub trait ResetTokenRepositoryProvider: Send + Sync + 'static {
    /// The reset token repository implementation type
    type ResetTokenRepo: ResetTokenRepository;

    /// Get the reset token repository
    fn reset_token(&self) -> &Self::ResetTokenRepo;
}

// ============================================================================
// Unified Repository Provider Trait
// ============================================================================

/// Provider trait that storage implementations must implement to provide all
/// repositories.
///
/// This trait is a supertrait combining all individual repository provider
/// traits, plus lifecycle methods for migrations and health checks.
///
/// # Implementing a Custom Storage Backend
///
/// To implement a custom storage backend:
/// 1. Implement each individual `*Repository` trait for your backend
/// 2. Implement each individual `*RepositoryProvider` trait
/// 3. Implement the `RepositoryProvider` trait with `migrate()` and `health_check()`
#[async_trait]
pub trait RepositoryProvider:
    AccountRepositoryProvider
    + PasswordRepositoryProvider
    + IpAttemptRepositoryProvider
    + RevokedTokenRepositoryProvider
    + ResetTokenRepositoryProvider
{
    /// Run migrations for all repositories
    async fn migrate(&self) -> Result<(), Error>;

    /// Health check for all repositories
    async fn health_check(&self) -> Result<(), Error>;
}
