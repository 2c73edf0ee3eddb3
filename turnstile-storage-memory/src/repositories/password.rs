use async_trait::async_trait;
use dashmap::DashMap;
use turnstile_core::{Error, account::AccountId, repositories::PasswordRepository};

/// In-memory password hash storage.
#[derive(Default)]
pub struct MemoryPasswordRepository {
    hashes: DashMap<AccountId, String>,
}

impl MemoryPasswordRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PasswordRepository for MemoryPasswordRepository {
    async fn set_password_hash(&self, account_id: &AccountId, hash: &str) -> Result<(), Error> {
        self.hashes.insert(account_id.clone(), hash.to_string());
        Ok(())
    }

    async fn get_password_hash(&self, account_id: &AccountId) -> Result<Option<String>, Error> {
        Ok(self.hashes.get(account_id).map(|entry| entry.value().clone()))
    }
}
