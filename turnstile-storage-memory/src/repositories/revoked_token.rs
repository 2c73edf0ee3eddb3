use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use turnstile_core::{
    Error,
    account::AccountId,
    repositories::RevokedTokenRepository,
    storage::{RevocationReason, RevokedToken},
};

/// In-memory revocation list.
#[derive(Default)]
pub struct MemoryRevokedTokenRepository {
    revoked: DashMap<String, RevokedToken>,
}

impl MemoryRevokedTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RevokedTokenRepository for MemoryRevokedTokenRepository {
    async fn revoke(
        &self,
        fingerprint: &str,
        account_id: Option<&AccountId>,
        reason: RevocationReason,
    ) -> Result<(), Error> {
        // or_insert keeps the original entry, making re-revocation a no-op.
        self.revoked
            .entry(fingerprint.to_string())
            .or_insert_with(|| RevokedToken {
                fingerprint: fingerprint.to_string(),
                account_id: account_id.cloned(),
                reason,
                revoked_at: Utc::now(),
            });
        Ok(())
    }

    async fn is_revoked(&self, fingerprint: &str) -> Result<bool, Error> {
        Ok(self.revoked.contains_key(fingerprint))
    }

    async fn find(&self, fingerprint: &str) -> Result<Option<RevokedToken>, Error> {
        Ok(self.revoked.get(fingerprint).map(|entry| entry.value().clone()))
    }

    async fn delete_revoked_before(&self, cutoff: DateTime<Utc>) -> Result<u64, Error> {
        let before = self.revoked.len();
        self.revoked.retain(|_, t| t.revoked_at >= cutoff);
        Ok((before - self.revoked.len()) as u64)
    }
}
