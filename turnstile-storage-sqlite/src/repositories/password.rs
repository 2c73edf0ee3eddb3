//! SQLite implementation of the password hash repository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use turnstile_core::{
    Error, account::AccountId, error::StorageError, repositories::PasswordRepository,
};

/// SQLite repository for password hashes.
pub struct SqlitePasswordRepository {
    pool: SqlitePool,
}

impl SqlitePasswordRepository {
    /// Create a new SQLite password repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PasswordRepository for SqlitePasswordRepository {
    async fn set_password_hash(&self, account_id: &AccountId, hash: &str) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO account_passwords (account_id, password_hash, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(account_id) DO UPDATE SET
                password_hash = excluded.password_hash,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(account_id.as_str())
        .bind(hash)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to store password hash");
            StorageError::Database("Failed to store password hash".to_string())
        })?;

        Ok(())
    }

    async fn get_password_hash(&self, account_id: &AccountId) -> Result<Option<String>, Error> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT password_hash FROM account_passwords WHERE account_id = ?")
                .bind(account_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "Failed to get password hash");
                    StorageError::Database("Failed to get password hash".to_string())
                })?;

        Ok(row.map(|(hash,)| hash))
    }
}
