//! SQLite implementation of the revocation list repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::str::FromStr;
use turnstile_core::{
    Error,
    account::AccountId,
    error::StorageError,
    repositories::RevokedTokenRepository,
    storage::{RevocationReason, RevokedToken},
};

/// SQLite repository for revoked tokens.
pub struct SqliteRevokedTokenRepository {
    pool: SqlitePool,
}

impl SqliteRevokedTokenRepository {
    /// Create a new SQLite revoked token repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Internal struct for query results
#[derive(Debug, sqlx::FromRow)]
struct SqliteRevokedTokenRow {
    fingerprint: String,
    account_id: Option<String>,
    reason: String,
    revoked_at: i64,
}

impl TryFrom<SqliteRevokedTokenRow> for RevokedToken {
    type Error = Error;

    fn try_from(row: SqliteRevokedTokenRow) -> Result<Self, Error> {
        Ok(RevokedToken {
            fingerprint: row.fingerprint,
            account_id: row.account_id.map(|id| AccountId::new(&id)),
            reason: RevocationReason::from_str(&row.reason)?,
            revoked_at: DateTime::from_timestamp(row.revoked_at, 0).expect("Invalid timestamp"),
        })
    }
}

#[async_trait]
impl RevokedTokenRepository for SqliteRevokedTokenRepository {
    async fn revoke(
        &self,
        fingerprint: &str,
        account_id: Option<&AccountId>,
        reason: RevocationReason,
    ) -> Result<(), Error> {
        // OR IGNORE keeps the original entry, making re-revocation a no-op.
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO revoked_tokens (fingerprint, account_id, reason, revoked_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(fingerprint)
        .bind(account_id.map(|id| id.as_str().to_string()))
        .bind(reason.as_str())
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to record revoked token");
            StorageError::Database("Failed to record revoked token".to_string())
        })?;

        Ok(())
    }

    async fn is_revoked(&self, fingerprint: &str) -> Result<bool, Error> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM revoked_tokens WHERE fingerprint = ?")
                .bind(fingerprint)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "Failed to check revocation list");
                    StorageError::Database("Failed to check revocation list".to_string())
                })?;

        Ok(row.is_some())
    }

    async fn find(&self, fingerprint: &str) -> Result<Option<RevokedToken>, Error> {
        let row = sqlx::query_as::<_, SqliteRevokedTokenRow>(
            "SELECT fingerprint, account_id, reason, revoked_at FROM revoked_tokens WHERE fingerprint = ?",
        )
        .bind(fingerprint)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to look up revoked token");
            StorageError::Database("Failed to look up revoked token".to_string())
        })?;

        row.map(TryInto::try_into).transpose()
    }

    async fn delete_revoked_before(&self, cutoff: DateTime<Utc>) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE revoked_at < ?")
            .bind(cutoff.timestamp())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to purge revoked tokens");
                StorageError::Database("Failed to purge revoked tokens".to_string())
            })?;

        Ok(result.rows_affected())
    }
}
