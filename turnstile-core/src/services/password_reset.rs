//! Password-reset broker: issues, validates, and consumes single-use
//! recovery tokens.

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::{
    Error,
    account::{Account, AccountId},
    error::TokenError,
    id::generate_secret,
    repositories::{AccountRepository, PasswordRepository, ResetTokenRepository},
    services::CredentialService,
    storage::ResetToken,
};

/// Default reset-token validity window.
const RESET_TOKEN_TTL: i64 = 15;

/// Service for password reset operations.
///
/// Issuing a token invalidates all prior unused tokens for the account, and
/// a token is consumed exactly once: of two concurrent confirmations with
/// the same secret, one wins and one gets the undifferentiated
/// invalid-or-expired error.
pub struct PasswordResetService<A, P, T>
where
    A: AccountRepository,
    P: PasswordRepository,
    T: ResetTokenRepository,
{
    credentials: Arc<CredentialService<A, P>>,
    reset_tokens: Arc<T>,
}

impl<A, P, T> PasswordResetService<A, P, T>
where
    A: AccountRepository,
    P: PasswordRepository,
    T: ResetTokenRepository,
{
    /// Create a new PasswordResetService sharing the credential service's
    /// repositories
    pub fn new(credentials: Arc<CredentialService<A, P>>, reset_tokens: Arc<T>) -> Self {
        Self {
            credentials,
            reset_tokens,
        }
    }

    /// Issue a fresh reset token for an account.
    ///
    /// The repository drops any prior unused tokens for the account, so the
    /// newest token is the only one that can ever be consumed. Delivery is
    /// the caller's concern; this method sends nothing.
    pub async fn issue_reset_token(
        &self,
        account_id: &AccountId,
        requester_address: &str,
    ) -> Result<ResetToken, Error> {
        self.issue_reset_token_with_expiry(
            account_id,
            requester_address,
            Duration::minutes(RESET_TOKEN_TTL),
        )
        .await
    }

    /// Issue a reset token with a custom validity window
    pub async fn issue_reset_token_with_expiry(
        &self,
        account_id: &AccountId,
        requester_address: &str,
        expires_in: Duration,
    ) -> Result<ResetToken, Error> {
        let secret = generate_secret();
        let expires_at = Utc::now() + expires_in;

        self.reset_tokens
            .create(account_id, &secret, expires_at, requester_address)
            .await
    }

    /// Look up a reset token without consuming it.
    ///
    /// Wrong secret, expired, and already-used all return the same error so
    /// the response never reveals which case occurred.
    pub async fn validate_reset_token(&self, secret: &str) -> Result<ResetToken, Error> {
        self.reset_tokens
            .find_valid(secret)
            .await?
            .ok_or(Error::Token(TokenError::ResetInvalidOrExpired))
    }

    /// Complete a password reset.
    ///
    /// The new password is durably stored (and the lockout counters
    /// cleared) before the token is consumed; a crash in between leaves the
    /// token valid and the reset repeatable, never half-applied. The atomic
    /// consume then picks a single winner among concurrent callers.
    pub async fn reset_password(&self, secret: &str, new_password: &str) -> Result<Account, Error> {
        let reset_token = self.validate_reset_token(secret).await?;

        let account = self
            .credentials
            .replace_password(&reset_token.account_id, new_password)
            .await?;

        if !self.reset_tokens.consume(secret).await? {
            // A concurrent confirmation won the used-flag transition.
            return Err(Error::Token(TokenError::ResetInvalidOrExpired));
        }

        tracing::info!(account_id = %account.id, "Password reset completed");

        Ok(account)
    }

    /// Start the background cleanup task for expired tokens.
    pub fn start_cleanup_task(
        &self,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        let repository = Arc::clone(&self.reset_tokens);

        // Cleanup runs hourly
        const CLEANUP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(3600);

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(CLEANUP_INTERVAL);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        match repository.delete_expired(Utc::now()).await {
                            Ok(count) if count > 0 => {
                                tracing::info!(count, "Deleted expired reset tokens");
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "Failed to delete expired reset tokens");
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("Shutting down reset token cleanup task");
                        break;
                    }
                }
            }
        })
    }
}
