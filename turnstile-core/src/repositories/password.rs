use crate::{Error, account::AccountId};
use async_trait::async_trait;

/// Repository for password hash storage
///
/// Hashes never leave the store except through `get_password_hash`, which
/// only the credential service calls for verification.
#[async_trait]
pub trait PasswordRepository: Send + Sync + 'static {
    /// Store a password hash for an account, replacing any previous hash
    async fn set_password_hash(&self, account_id: &AccountId, hash: &str) -> Result<(), Error>;

    /// Retrieve an account's password hash
    async fn get_password_hash(&self, account_id: &AccountId) -> Result<Option<String>, Error>;
}
