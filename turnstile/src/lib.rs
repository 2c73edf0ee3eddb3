//! # Turnstile
//!
//! Turnstile is the authentication-security core of a task-management
//! backend: credential verification with progressive account lockout,
//! per-address login rate limiting, access token issuance with revocation,
//! and a time-boxed, single-use password-reset flow.
//!
//! The [`Turnstile`] struct is the login orchestrator. It composes the
//! services from `turnstile-core` over a storage backend of your choice and
//! exposes the request-level contracts the routing layer consumes:
//! register, login, logout, password reset, and the authentication guard
//! for protected operations.
//!
//! Storage is injected, not global: hand `Turnstile::new` a repository
//! provider and own its lifecycle at your process entry point. Swap in the
//! in-memory provider for tests.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use turnstile::{Turnstile, TurnstileConfig};
//! use turnstile_core::TokenConfig;
//! use turnstile_storage_memory::MemoryRepositoryProvider;
//!
//! #[tokio::main]
//! async fn main() {
//!     let repositories = Arc::new(MemoryRepositoryProvider::new());
//!     let config = TurnstileConfig::new(TokenConfig::new_hs256(b"server-held-secret".to_vec()));
//!
//!     let turnstile = Turnstile::new(repositories, config);
//!
//!     let account = turnstile
//!         .register("user@example.com", "Sup3r-secret!", None)
//!         .await
//!         .unwrap();
//!     println!("Registered: {}", account.email);
//! }
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use turnstile_core::{
    Error,
    account::{Account, AccountId},
    error::AuthError,
    repositories::{
        AccountRepositoryAdapter, IpAttemptRepositoryAdapter, PasswordRepositoryAdapter,
        RepositoryProvider, ResetTokenRepositoryAdapter, RevokedTokenRepositoryAdapter,
    },
    services::{
        CredentialService, Mailer, PasswordResetService, RateLimitService, TokenAuthority,
    },
    storage::RevocationReason,
};

/// Re-export core types from turnstile_core
///
/// These types are commonly used when working with the Turnstile API.
pub use turnstile_core::{
    AccessToken, Claims, LockoutConfig, RateLimitConfig, TokenConfig,
    error::{self, TokenError},
};

/// Re-export storage backends
///
/// These storage implementations are available when the corresponding
/// feature is enabled.
#[cfg(feature = "memory")]
pub use turnstile_storage_memory::MemoryRepositoryProvider;

#[cfg(feature = "sqlite")]
pub use turnstile_storage_sqlite::SqliteRepositoryProvider;

/// Configuration for the login orchestrator.
pub struct TurnstileConfig {
    /// Account lockout policy
    pub lockout: LockoutConfig,
    /// Per-address rate limit policy
    pub rate_limit: RateLimitConfig,
    /// Access token signing and lifetime
    pub token: TokenConfig,
}

impl TurnstileConfig {
    /// Create a configuration with the default lockout and rate-limit
    /// policies around the given token configuration
    pub fn new(token: TokenConfig) -> Self {
        Self {
            lockout: LockoutConfig::default(),
            rate_limit: RateLimitConfig::default(),
            token,
        }
    }

    /// Override the account lockout policy
    pub fn with_lockout(mut self, lockout: LockoutConfig) -> Self {
        self.lockout = lockout;
        self
    }

    /// Override the per-address rate limit policy
    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }
}

/// The subset of an account returned from registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredAccount {
    pub id: AccountId,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// The account summary returned alongside a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSummary {
    pub id: AccountId,
    pub email: String,
    pub display_name: Option<String>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<Account> for AccountSummary {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            email: account.email,
            display_name: account.display_name,
            last_login_at: account.last_login_at,
        }
    }
}

/// A successful login: the session token and who it belongs to.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: AccessToken,
    pub account: AccountSummary,
}

/// The login orchestrator.
///
/// Composes the credential store, address rate limiter, token authority,
/// and password-reset broker into the login/logout/reset control flow.
pub struct Turnstile<R: RepositoryProvider> {
    repositories: Arc<R>,
    credentials: Arc<CredentialService<AccountRepositoryAdapter<R>, PasswordRepositoryAdapter<R>>>,
    rate_limiter: Arc<RateLimitService<IpAttemptRepositoryAdapter<R>>>,
    tokens: Arc<TokenAuthority<RevokedTokenRepositoryAdapter<R>>>,
    password_reset: Arc<
        PasswordResetService<
            AccountRepositoryAdapter<R>,
            PasswordRepositoryAdapter<R>,
            ResetTokenRepositoryAdapter<R>,
        >,
    >,
    mailer: Option<Arc<dyn Mailer>>,
}

impl<R: RepositoryProvider> Turnstile<R> {
    /// Create a new Turnstile instance over a repository provider.
    ///
    /// All services are wired here; the provider handle is the only piece
    /// of shared state, and the caller owns its lifecycle.
    pub fn new(repositories: Arc<R>, config: TurnstileConfig) -> Self {
        let account_repo = Arc::new(AccountRepositoryAdapter::new(repositories.clone()));
        let password_repo = Arc::new(PasswordRepositoryAdapter::new(repositories.clone()));

        let credentials = Arc::new(CredentialService::new(
            account_repo,
            password_repo,
            config.lockout,
        ));

        let rate_limiter = Arc::new(RateLimitService::new(
            Arc::new(IpAttemptRepositoryAdapter::new(repositories.clone())),
            config.rate_limit,
        ));

        let tokens = Arc::new(TokenAuthority::new(
            Arc::new(RevokedTokenRepositoryAdapter::new(repositories.clone())),
            config.token,
        ));

        let password_reset = Arc::new(PasswordResetService::new(
            credentials.clone(),
            Arc::new(ResetTokenRepositoryAdapter::new(repositories.clone())),
        ));

        Self {
            repositories,
            credentials,
            rate_limiter,
            tokens,
            password_reset,
            mailer: None,
        }
    }

    /// Attach the email collaborator used for reset delivery
    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    /// Run migrations for all repositories
    pub async fn migrate(&self) -> Result<(), Error> {
        self.repositories.migrate().await
    }

    /// Health check for all repositories
    pub async fn health_check(&self) -> Result<(), Error> {
        self.repositories.health_check().await
    }

    /// Register a new account.
    ///
    /// Duplicate emails are reported as
    /// [`AuthError::DuplicateEmail`](turnstile_core::error::AuthError);
    /// malformed input as a validation error.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: Option<String>,
    ) -> Result<RegisteredAccount, Error> {
        let account = self
            .credentials
            .create_account(email, password, display_name)
            .await?;

        tracing::info!(account_id = %account.id, "Account registered");

        Ok(RegisteredAccount {
            id: account.id,
            email: account.email,
            created_at: account.created_at,
        })
    }

    /// Authenticate and issue a session token.
    ///
    /// The address check runs first and never depends on whether the email
    /// matches an account, so the two limiters cannot be used to probe for
    /// registered emails. Missing and inactive accounts burn the same
    /// bcrypt comparison as a wrong password before answering
    /// `InvalidCredentials`.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        source_address: &str,
    ) -> Result<LoginOutcome, Error> {
        self.rate_limiter.check_allowed(source_address).await?;

        let account = match self.credentials.find_by_email(email).await? {
            Some(account) if account.is_active => account,
            _ => {
                self.credentials.verify_dummy(password).await?;
                self.rate_limiter.record_failure(source_address).await?;
                return Err(Error::Auth(AuthError::InvalidCredentials));
            }
        };

        if account.is_locked() {
            return Err(Error::Auth(AuthError::AccountLocked));
        }

        if !self
            .credentials
            .verify_password(&account.id, password)
            .await?
        {
            self.rate_limiter.record_failure(source_address).await?;
            let updated = self.credentials.record_failed_auth(&account.id).await?;

            // The failure that crosses the threshold already answers as a
            // lockout.
            if updated.is_locked() {
                return Err(Error::Auth(AuthError::AccountLocked));
            }
            return Err(Error::Auth(AuthError::InvalidCredentials));
        }

        let account = self.credentials.record_successful_auth(&account.id).await?;
        self.rate_limiter.clear(source_address).await?;

        let token = self.tokens.issue(&account)?;

        tracing::info!(account_id = %account.id, "Login succeeded");

        Ok(LoginOutcome {
            token,
            account: account.into(),
        })
    }

    /// Revoke a session token. Idempotent: logging out twice, or logging
    /// out a token that never verified, still succeeds.
    pub async fn logout(&self, token: &AccessToken) -> Result<(), Error> {
        let owner = self.tokens.owner_of(token);

        self.tokens
            .revoke(token, owner.as_ref(), RevocationReason::ExplicitLogout)
            .await?;

        tracing::info!(account_id = ?owner, "Session token revoked");

        Ok(())
    }

    /// Request a password reset for an email address.
    ///
    /// The response is identical whether the email matched an active
    /// account, matched an inactive one, matched nothing, or the email send
    /// failed. Delivery failures are logged for operators.
    pub async fn request_password_reset(
        &self,
        email: &str,
        source_address: &str,
    ) -> Result<(), Error> {
        let account = match self.credentials.find_by_email(email).await? {
            Some(account) if account.is_active => account,
            _ => {
                tracing::debug!("Password reset requested for unknown or inactive email");
                return Ok(());
            }
        };

        let reset_token = self
            .password_reset
            .issue_reset_token(&account.id, source_address)
            .await?;

        match &self.mailer {
            Some(mailer) => {
                if let Err(e) = mailer
                    .send_password_reset_email(
                        &account.email,
                        &reset_token.secret,
                        account.display_name.as_deref(),
                    )
                    .await
                {
                    tracing::error!(account_id = %account.id, error = %e, "Failed to send password reset email");
                }
            }
            None => {
                tracing::warn!(account_id = %account.id, "No mailer configured; reset token not delivered");
            }
        }

        Ok(())
    }

    /// Complete a password reset with the emailed secret.
    ///
    /// Consumes the token: a second confirmation with the same secret, even
    /// a concurrent one, fails with the undifferentiated
    /// invalid-or-expired error.
    pub async fn confirm_password_reset(
        &self,
        secret: &str,
        new_password: &str,
    ) -> Result<(), Error> {
        self.password_reset
            .reset_password(secret, new_password)
            .await?;
        Ok(())
    }

    /// Validate a session token before trusting its claims.
    ///
    /// Used as the guard in front of every protected operation. Checks the
    /// revocation list first, then signature and expiry; the three failure
    /// kinds stay distinguishable.
    pub async fn authenticate_request(&self, token: &AccessToken) -> Result<Claims, Error> {
        self.tokens.validate(token).await
    }

    /// Spawn the advisory cleanup tasks: stale address entries, aged
    /// revocation entries, expired reset tokens.
    ///
    /// Purely storage reclamation; every validity check re-evaluates
    /// timestamps at read time whether or not these have run.
    pub fn start_maintenance_tasks(
        &self,
        shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> Vec<tokio::task::JoinHandle<()>> {
        vec![
            self.rate_limiter.start_cleanup_task(shutdown.clone()),
            self.tokens.start_cleanup_task(shutdown.clone()),
            self.password_reset.start_cleanup_task(shutdown),
        ]
    }
}
