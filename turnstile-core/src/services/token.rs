//! Token authority: issues signed access tokens and validates them against
//! the revocation store.

use std::sync::Arc;

use chrono::Utc;

use crate::{
    Error,
    account::{Account, AccountId},
    error::TokenError,
    repositories::RevokedTokenRepository,
    storage::RevocationReason,
    token::{AccessToken, Claims, TokenConfig},
};

/// Service issuing and validating access tokens.
///
/// Validation consults the revocation store before doing any cryptographic
/// work: a token already known bad is rejected without a signature check.
pub struct TokenAuthority<R: RevokedTokenRepository> {
    repository: Arc<R>,
    config: TokenConfig,
}

impl<R: RevokedTokenRepository> TokenAuthority<R> {
    /// Create a new TokenAuthority.
    pub fn new(repository: Arc<R>, config: TokenConfig) -> Self {
        Self { repository, config }
    }

    /// Get the token configuration.
    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Issue a signed access token for an account.
    ///
    /// Each token carries a random `jti`, so two tokens issued in the same
    /// request are never bit-identical, and the configured fixed lifetime.
    pub fn issue(&self, account: &Account) -> Result<AccessToken, Error> {
        let claims = Claims::for_account(account, &self.config);
        AccessToken::new_signed(&claims, &self.config)
    }

    /// Validate a token: revocation first, then signature and expiry.
    ///
    /// The three failures are disjoint — [`TokenError::Revoked`],
    /// [`TokenError::Expired`], [`TokenError::Malformed`] — because they
    /// map to different user-facing remedies.
    pub async fn validate(&self, token: &AccessToken) -> Result<Claims, Error> {
        if self.repository.is_revoked(token.fingerprint()).await? {
            return Err(Error::Token(TokenError::Revoked));
        }

        token.verify(&self.config)
    }

    /// Record a token as revoked. Idempotent; revoking twice is a no-op.
    pub async fn revoke(
        &self,
        token: &AccessToken,
        account_id: Option<&AccountId>,
        reason: RevocationReason,
    ) -> Result<(), Error> {
        self.repository
            .revoke(token.fingerprint(), account_id, reason)
            .await
    }

    /// Best-effort owner extraction for revocation bookkeeping.
    ///
    /// Accepts an expired token (the owner is still known) but not a bad
    /// signature.
    pub fn owner_of(&self, token: &AccessToken) -> Option<AccountId> {
        token
            .verify_allow_expired(&self.config)
            .ok()
            .map(|claims| AccountId::new(&claims.sub))
    }

    /// Start the background cleanup task.
    ///
    /// Purges revocation entries older than the token lifetime. Any entry
    /// that old guards a token that has already expired on its own, so the
    /// purge opens no safety gap.
    pub fn start_cleanup_task(
        &self,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        let repository = Arc::clone(&self.repository);
        let retention = self.config.lifetime;

        // Cleanup runs hourly
        const CLEANUP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(3600);

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(CLEANUP_INTERVAL);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        let cutoff = Utc::now() - retention;
                        match repository.delete_revoked_before(cutoff).await {
                            Ok(count) if count > 0 => {
                                tracing::info!(count, "Purged aged revocation entries");
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "Failed to purge revocation entries");
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("Shutting down revocation cleanup task");
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::RevokedToken;
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockRevokedTokenRepository {
        revoked: Mutex<HashMap<String, RevokedToken>>,
    }

    #[async_trait]
    impl RevokedTokenRepository for MockRevokedTokenRepository {
        async fn revoke(
            &self,
            fingerprint: &str,
            account_id: Option<&AccountId>,
            reason: RevocationReason,
        ) -> Result<(), Error> {
            let mut revoked = self.revoked.lock().unwrap();
            revoked
                .entry(fingerprint.to_string())
                .or_insert(RevokedToken {
                    fingerprint: fingerprint.to_string(),
                    account_id: account_id.cloned(),
                    reason,
                    revoked_at: Utc::now(),
                });
            Ok(())
        }

        async fn is_revoked(&self, fingerprint: &str) -> Result<bool, Error> {
            Ok(self.revoked.lock().unwrap().contains_key(fingerprint))
        }

        async fn find(&self, fingerprint: &str) -> Result<Option<RevokedToken>, Error> {
            Ok(self.revoked.lock().unwrap().get(fingerprint).cloned())
        }

        async fn delete_revoked_before(&self, cutoff: DateTime<Utc>) -> Result<u64, Error> {
            let mut revoked = self.revoked.lock().unwrap();
            let before = revoked.len();
            revoked.retain(|_, t| t.revoked_at >= cutoff);
            Ok((before - revoked.len()) as u64)
        }
    }

    fn authority() -> TokenAuthority<MockRevokedTokenRepository> {
        TokenAuthority::new(
            Arc::new(MockRevokedTokenRepository::default()),
            TokenConfig::new_random_hs256().with_issuer("turnstile-test"),
        )
    }

    fn test_account() -> Account {
        Account::builder()
            .id(AccountId::new_random())
            .email("user@example.com".to_string())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_issue_then_validate_round_trip() {
        let authority = authority();
        let account = test_account();

        let token = authority.issue(&account).unwrap();
        let claims = authority.validate(&token).await.unwrap();

        assert_eq!(claims.sub, account.id.to_string());
        assert_eq!(claims.email, account.email);
    }

    #[tokio::test]
    async fn test_revoked_token_fails_validation() {
        let authority = authority();
        let account = test_account();

        let token = authority.issue(&account).unwrap();
        authority
            .revoke(&token, Some(&account.id), RevocationReason::ExplicitLogout)
            .await
            .unwrap();

        let result = authority.validate(&token).await;
        assert!(matches!(result, Err(Error::Token(TokenError::Revoked))));
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let authority = authority();
        let account = test_account();

        let token = authority.issue(&account).unwrap();
        authority
            .revoke(&token, Some(&account.id), RevocationReason::ExplicitLogout)
            .await
            .unwrap();

        // Second revocation succeeds and keeps the original entry
        authority
            .revoke(&token, None, RevocationReason::SecurityAction)
            .await
            .unwrap();

        let entry = authority
            .repository
            .find(token.fingerprint())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.reason, RevocationReason::ExplicitLogout);
        assert_eq!(entry.account_id, Some(account.id));
    }

    #[tokio::test]
    async fn test_revocation_checked_before_signature() {
        let authority = authority();

        // A garbage token is Malformed...
        let garbage = AccessToken::new("garbage-token");
        let result = authority.validate(&garbage).await;
        assert!(matches!(result, Err(Error::Token(TokenError::Malformed))));

        // ...unless it has been revoked, which wins
        authority
            .revoke(&garbage, None, RevocationReason::SecurityAction)
            .await
            .unwrap();
        let result = authority.validate(&garbage).await;
        assert!(matches!(result, Err(Error::Token(TokenError::Revoked))));
    }

    #[tokio::test]
    async fn test_owner_of() {
        let authority = authority();
        let account = test_account();

        let token = authority.issue(&account).unwrap();
        assert_eq!(authority.owner_of(&token), Some(account.id));

        assert_eq!(authority.owner_of(&AccessToken::new("junk")), None);
    }
}
