//! SQLite implementation of the reset token repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use turnstile_core::{
    Error, account::AccountId, error::StorageError, repositories::ResetTokenRepository,
    storage::ResetToken,
};

/// SQLite repository for password-reset tokens.
pub struct SqliteResetTokenRepository {
    pool: SqlitePool,
}

impl SqliteResetTokenRepository {
    /// Create a new SQLite reset token repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Internal struct for query results
#[derive(Debug, sqlx::FromRow)]
struct SqliteResetTokenRow {
    secret: String,
    account_id: String,
    expires_at: i64,
    used: bool,
    requested_from: String,
    created_at: i64,
}

impl From<SqliteResetTokenRow> for ResetToken {
    fn from(row: SqliteResetTokenRow) -> Self {
        ResetToken {
            account_id: AccountId::new(&row.account_id),
            secret: row.secret,
            expires_at: DateTime::from_timestamp(row.expires_at, 0).expect("Invalid timestamp"),
            used: row.used,
            requested_from: row.requested_from,
            created_at: DateTime::from_timestamp(row.created_at, 0).expect("Invalid timestamp"),
        }
    }
}

#[async_trait]
impl ResetTokenRepository for SqliteResetTokenRepository {
    async fn create(
        &self,
        account_id: &AccountId,
        secret: &str,
        expires_at: DateTime<Utc>,
        requested_from: &str,
    ) -> Result<ResetToken, Error> {
        // Dropping the prior unused tokens and inserting the new one commit
        // together, so there is never a moment with two live tokens.
        let mut tx = self.pool.begin().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to begin transaction");
            StorageError::Database("Failed to begin transaction".to_string())
        })?;

        sqlx::query("DELETE FROM reset_tokens WHERE account_id = ? AND used = 0")
            .bind(account_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to delete prior reset tokens");
                StorageError::Database("Failed to delete prior reset tokens".to_string())
            })?;

        let row = sqlx::query_as::<_, SqliteResetTokenRow>(
            r#"
            INSERT INTO reset_tokens (secret, account_id, expires_at, used, requested_from, created_at)
            VALUES (?, ?, ?, 0, ?, ?)
            RETURNING secret, account_id, expires_at, used, requested_from, created_at
            "#,
        )
        .bind(secret)
        .bind(account_id.as_str())
        .bind(expires_at.timestamp())
        .bind(requested_from)
        .bind(Utc::now().timestamp())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create reset token");
            StorageError::Database("Failed to create reset token".to_string())
        })?;

        tx.commit().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to commit reset token");
            StorageError::Database("Failed to commit reset token".to_string())
        })?;

        Ok(row.into())
    }

    async fn find_valid(&self, secret: &str) -> Result<Option<ResetToken>, Error> {
        let row = sqlx::query_as::<_, SqliteResetTokenRow>(
            r#"
            SELECT secret, account_id, expires_at, used, requested_from, created_at
            FROM reset_tokens
            WHERE secret = ? AND used = 0 AND expires_at > ?
            "#,
        )
        .bind(secret)
        .bind(Utc::now().timestamp())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to look up reset token");
            StorageError::Database("Failed to look up reset token".to_string())
        })?;

        Ok(row.map(Into::into))
    }

    async fn consume(&self, secret: &str) -> Result<bool, Error> {
        // The guarded update is the atomic used-flag transition: only one
        // concurrent caller sees rows_affected == 1.
        let result = sqlx::query(
            "UPDATE reset_tokens SET used = 1 WHERE secret = ? AND used = 0 AND expires_at > ?",
        )
        .bind(secret)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to consume reset token");
            StorageError::Database("Failed to consume reset token".to_string())
        })?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM reset_tokens WHERE expires_at <= ?")
            .bind(now.timestamp())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to delete expired reset tokens");
                StorageError::Database("Failed to delete expired reset tokens".to_string())
            })?;

        Ok(result.rows_affected())
    }
}
