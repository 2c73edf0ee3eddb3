use async_trait::async_trait;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use turnstile_core::{
    Error,
    account::{Account, AccountId},
    error::{AuthError, StorageError},
    repositories::AccountRepository,
    storage::NewAccountRecord,
};

/// In-memory account repository.
///
/// Counter mutations run under the DashMap entry lock, so two concurrent
/// failure recordings for the same account both count.
#[derive(Default)]
pub struct MemoryAccountRepository {
    accounts: DashMap<AccountId, Account>,
    ids_by_email: DashMap<String, AccountId>,
}

impl MemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountRepository for MemoryAccountRepository {
    async fn create(&self, record: NewAccountRecord) -> Result<Account, Error> {
        // Reserve the email first; the vacant-entry insert is the atomic
        // uniqueness check.
        match self.ids_by_email.entry(record.email.clone()) {
            Entry::Occupied(_) => return Err(Error::Auth(AuthError::DuplicateEmail)),
            Entry::Vacant(vacant) => {
                vacant.insert(record.id.clone());
            }
        }

        let account = Account::builder()
            .id(record.id.clone())
            .email(record.email)
            .display_name(record.display_name)
            .build()?;

        self.accounts.insert(record.id, account.clone());
        Ok(account)
    }

    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, Error> {
        Ok(self.accounts.get(id).map(|entry| entry.value().clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, Error> {
        let Some(id) = self.ids_by_email.get(email).map(|entry| entry.value().clone()) else {
            return Ok(None);
        };
        self.find_by_id(&id).await
    }

    async fn record_failure(
        &self,
        id: &AccountId,
        max_attempts: u32,
        lock_for: Duration,
    ) -> Result<Account, Error> {
        let mut entry = self
            .accounts
            .get_mut(id)
            .ok_or(Error::Storage(StorageError::NotFound))?;
        let account = entry.value_mut();
        let now = Utc::now();

        // An expired lock starts a fresh window; an active one is never
        // extended.
        if account.locked_until.is_some_and(|until| until <= now) {
            account.failed_attempts = 0;
            account.locked_until = None;
        }

        account.failed_attempts += 1;
        if account.failed_attempts >= max_attempts && !account.is_locked() {
            account.locked_until = Some(now + lock_for);
        }
        account.updated_at = now;

        Ok(account.clone())
    }

    async fn record_success(&self, id: &AccountId) -> Result<Account, Error> {
        let mut entry = self
            .accounts
            .get_mut(id)
            .ok_or(Error::Storage(StorageError::NotFound))?;
        let account = entry.value_mut();
        let now = Utc::now();

        account.failed_attempts = 0;
        account.locked_until = None;
        account.last_login_at = Some(now);
        account.updated_at = now;

        Ok(account.clone())
    }

    async fn clear_lockout(&self, id: &AccountId) -> Result<Account, Error> {
        let mut entry = self
            .accounts
            .get_mut(id)
            .ok_or(Error::Storage(StorageError::NotFound))?;
        let account = entry.value_mut();

        account.failed_attempts = 0;
        account.locked_until = None;
        account.updated_at = Utc::now();

        Ok(account.clone())
    }

    async fn set_active(&self, id: &AccountId, is_active: bool) -> Result<(), Error> {
        let mut entry = self
            .accounts
            .get_mut(id)
            .ok_or(Error::Storage(StorageError::NotFound))?;
        let account = entry.value_mut();
        account.is_active = is_active;
        account.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    async fn create_account(repo: &MemoryAccountRepository, email: &str) -> Account {
        repo.create(
            NewAccountRecord::builder()
                .email(email.to_string())
                .build()
                .unwrap(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let repo = MemoryAccountRepository::new();
        let account = create_account(&repo, "user@example.com").await;

        let by_id = repo.find_by_id(&account.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "user@example.com");

        let by_email = repo.find_by_email("user@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, account.id);

        assert!(repo.find_by_email("other@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let repo = MemoryAccountRepository::new();
        create_account(&repo, "user@example.com").await;

        let result = repo
            .create(
                NewAccountRecord::builder()
                    .email("user@example.com".to_string())
                    .build()
                    .unwrap(),
            )
            .await;
        assert!(matches!(result, Err(Error::Auth(AuthError::DuplicateEmail))));
    }

    #[tokio::test]
    async fn test_locks_exactly_at_threshold() {
        let repo = MemoryAccountRepository::new();
        let account = create_account(&repo, "user@example.com").await;

        for i in 1..5 {
            let updated = repo
                .record_failure(&account.id, 5, Duration::minutes(10))
                .await
                .unwrap();
            assert_eq!(updated.failed_attempts, i);
            assert!(!updated.is_locked());
        }

        let locked = repo
            .record_failure(&account.id, 5, Duration::minutes(10))
            .await
            .unwrap();
        assert_eq!(locked.failed_attempts, 5);
        assert!(locked.is_locked());
    }

    #[tokio::test]
    async fn test_active_lock_window_not_extended() {
        let repo = MemoryAccountRepository::new();
        let account = create_account(&repo, "user@example.com").await;

        for _ in 0..5 {
            repo.record_failure(&account.id, 5, Duration::minutes(10))
                .await
                .unwrap();
        }
        let locked_until = repo
            .find_by_id(&account.id)
            .await
            .unwrap()
            .unwrap()
            .locked_until
            .unwrap();

        // Another failure while locked must not move the lock
        let updated = repo
            .record_failure(&account.id, 5, Duration::minutes(10))
            .await
            .unwrap();
        assert_eq!(updated.locked_until, Some(locked_until));
    }

    #[tokio::test]
    async fn test_failure_after_expired_lock_starts_fresh_window() {
        let repo = MemoryAccountRepository::new();
        let account = create_account(&repo, "user@example.com").await;

        // Lock with a window that expires immediately
        for _ in 0..5 {
            repo.record_failure(&account.id, 5, Duration::seconds(0))
                .await
                .unwrap();
        }

        let updated = repo
            .record_failure(&account.id, 5, Duration::minutes(10))
            .await
            .unwrap();
        assert_eq!(updated.failed_attempts, 1);
        assert!(!updated.is_locked());
    }

    #[tokio::test]
    async fn test_record_success_resets_and_stamps() {
        let repo = MemoryAccountRepository::new();
        let account = create_account(&repo, "user@example.com").await;

        for _ in 0..5 {
            repo.record_failure(&account.id, 5, Duration::minutes(10))
                .await
                .unwrap();
        }

        let updated = repo.record_success(&account.id).await.unwrap();
        assert_eq!(updated.failed_attempts, 0);
        assert!(updated.locked_until.is_none());
        assert!(updated.last_login_at.is_some());
    }

    #[tokio::test]
    async fn test_clear_lockout_leaves_last_login() {
        let repo = MemoryAccountRepository::new();
        let account = create_account(&repo, "user@example.com").await;

        repo.record_failure(&account.id, 5, Duration::minutes(10))
            .await
            .unwrap();

        let updated = repo.clear_lockout(&account.id).await.unwrap();
        assert_eq!(updated.failed_attempts, 0);
        assert!(updated.last_login_at.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_failures_both_counted() {
        let repo = Arc::new(MemoryAccountRepository::new());
        let account = create_account(&repo, "user@example.com").await;

        let r1 = Arc::clone(&repo);
        let r2 = Arc::clone(&repo);
        let id1 = account.id.clone();
        let id2 = account.id.clone();

        let (a, b) = tokio::join!(
            tokio::spawn(async move { r1.record_failure(&id1, 5, Duration::minutes(10)).await }),
            tokio::spawn(async move { r2.record_failure(&id2, 5, Duration::minutes(10)).await }),
        );
        a.unwrap().unwrap();
        b.unwrap().unwrap();

        let stored = repo.find_by_id(&account.id).await.unwrap().unwrap();
        assert_eq!(stored.failed_attempts, 2);
    }
}
