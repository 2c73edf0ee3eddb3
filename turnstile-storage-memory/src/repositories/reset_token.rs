use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use turnstile_core::{
    Error, account::AccountId, repositories::ResetTokenRepository, storage::ResetToken,
};

/// In-memory reset token storage.
///
/// The used-flag transition happens under the entry lock, so only one of
/// two concurrent consumers wins.
#[derive(Default)]
pub struct MemoryResetTokenRepository {
    tokens: DashMap<String, ResetToken>,
}

impl MemoryResetTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResetTokenRepository for MemoryResetTokenRepository {
    async fn create(
        &self,
        account_id: &AccountId,
        secret: &str,
        expires_at: DateTime<Utc>,
        requested_from: &str,
    ) -> Result<ResetToken, Error> {
        // At most one unused token per account: prior unused ones go away.
        self.tokens
            .retain(|_, t| !(t.account_id == *account_id && !t.used));

        let token = ResetToken {
            account_id: account_id.clone(),
            secret: secret.to_string(),
            expires_at,
            used: false,
            requested_from: requested_from.to_string(),
            created_at: Utc::now(),
        };
        self.tokens.insert(secret.to_string(), token.clone());
        Ok(token)
    }

    async fn find_valid(&self, secret: &str) -> Result<Option<ResetToken>, Error> {
        Ok(self
            .tokens
            .get(secret)
            .filter(|entry| entry.value().is_valid())
            .map(|entry| entry.value().clone()))
    }

    async fn consume(&self, secret: &str) -> Result<bool, Error> {
        let Some(mut entry) = self.tokens.get_mut(secret) else {
            return Ok(false);
        };
        let token = entry.value_mut();
        if !token.is_valid() {
            return Ok(false);
        }
        token.used = true;
        Ok(true)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, Error> {
        let before = self.tokens.len();
        self.tokens.retain(|_, t| t.expires_at > now);
        Ok((before - self.tokens.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_create_and_find_valid() {
        let repo = MemoryResetTokenRepository::new();
        let account_id = AccountId::new_random();

        let token = repo
            .create(
                &account_id,
                "secret-1",
                Utc::now() + Duration::minutes(15),
                "203.0.113.7",
            )
            .await
            .unwrap();
        assert!(!token.used);

        assert!(repo.find_valid("secret-1").await.unwrap().is_some());
        assert!(repo.find_valid("wrong").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_invalidates_prior_unused() {
        let repo = MemoryResetTokenRepository::new();
        let account_id = AccountId::new_random();
        let expires = Utc::now() + Duration::minutes(15);

        repo.create(&account_id, "first", expires, "203.0.113.7")
            .await
            .unwrap();
        repo.create(&account_id, "second", expires, "203.0.113.7")
            .await
            .unwrap();

        assert!(repo.find_valid("first").await.unwrap().is_none());
        assert!(repo.find_valid("second").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_create_keeps_other_accounts_tokens() {
        let repo = MemoryResetTokenRepository::new();
        let expires = Utc::now() + Duration::minutes(15);

        let account_a = AccountId::new_random();
        let account_b = AccountId::new_random();

        repo.create(&account_a, "token-a", expires, "203.0.113.7")
            .await
            .unwrap();
        repo.create(&account_b, "token-b", expires, "203.0.113.8")
            .await
            .unwrap();

        assert!(repo.find_valid("token-a").await.unwrap().is_some());
        assert!(repo.find_valid("token-b").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_expired_token_not_found_and_not_consumable() {
        let repo = MemoryResetTokenRepository::new();
        let account_id = AccountId::new_random();

        repo.create(
            &account_id,
            "expired",
            Utc::now() - Duration::seconds(1),
            "203.0.113.7",
        )
        .await
        .unwrap();

        assert!(repo.find_valid("expired").await.unwrap().is_none());
        assert!(!repo.consume("expired").await.unwrap());
    }

    #[tokio::test]
    async fn test_consume_exactly_once() {
        let repo = MemoryResetTokenRepository::new();
        let account_id = AccountId::new_random();

        repo.create(
            &account_id,
            "secret-1",
            Utc::now() + Duration::minutes(15),
            "203.0.113.7",
        )
        .await
        .unwrap();

        assert!(repo.consume("secret-1").await.unwrap());
        assert!(!repo.consume("secret-1").await.unwrap());
        assert!(repo.find_valid("secret-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_consume_single_winner() {
        let repo = Arc::new(MemoryResetTokenRepository::new());
        let account_id = AccountId::new_random();

        repo.create(
            &account_id,
            "secret-1",
            Utc::now() + Duration::minutes(15),
            "203.0.113.7",
        )
        .await
        .unwrap();

        let r1 = Arc::clone(&repo);
        let r2 = Arc::clone(&repo);

        let (a, b) = tokio::join!(
            tokio::spawn(async move { r1.consume("secret-1").await }),
            tokio::spawn(async move { r2.consume("secret-1").await }),
        );
        let a = a.unwrap().unwrap();
        let b = b.unwrap().unwrap();

        assert!(a ^ b, "exactly one consumer must win");
    }

    #[tokio::test]
    async fn test_delete_expired() {
        let repo = MemoryResetTokenRepository::new();
        let account_id = AccountId::new_random();

        repo.create(
            &account_id,
            "gone",
            Utc::now() - Duration::minutes(1),
            "203.0.113.7",
        )
        .await
        .unwrap();
        repo.create(
            &AccountId::new_random(),
            "kept",
            Utc::now() + Duration::minutes(15),
            "203.0.113.7",
        )
        .await
        .unwrap();

        let deleted = repo.delete_expired(Utc::now()).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(repo.find_valid("kept").await.unwrap().is_some());
    }
}
