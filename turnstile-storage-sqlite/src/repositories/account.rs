//! SQLite implementation of the account repository.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use turnstile_core::{
    Error,
    account::{Account, AccountId},
    error::{AuthError, StorageError},
    repositories::AccountRepository,
    storage::NewAccountRecord,
};

/// SQLite repository for account data.
pub struct SqliteAccountRepository {
    pool: SqlitePool,
}

impl SqliteAccountRepository {
    /// Create a new SQLite account repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const ACCOUNT_COLUMNS: &str =
    "id, email, display_name, failed_attempts, locked_until, is_active, last_login_at, created_at, updated_at";

/// Internal struct for query results
#[derive(Debug, sqlx::FromRow)]
struct SqliteAccountRow {
    id: String,
    email: String,
    display_name: Option<String>,
    failed_attempts: i64,
    locked_until: Option<i64>,
    is_active: bool,
    last_login_at: Option<i64>,
    created_at: i64,
    updated_at: i64,
}

impl From<SqliteAccountRow> for Account {
    fn from(row: SqliteAccountRow) -> Self {
        Account {
            id: AccountId::new(&row.id),
            email: row.email,
            display_name: row.display_name,
            failed_attempts: row.failed_attempts as u32,
            locked_until: row
                .locked_until
                .and_then(|ts| DateTime::from_timestamp(ts, 0)),
            is_active: row.is_active,
            last_login_at: row
                .last_login_at
                .and_then(|ts| DateTime::from_timestamp(ts, 0)),
            created_at: DateTime::from_timestamp(row.created_at, 0).expect("Invalid timestamp"),
            updated_at: DateTime::from_timestamp(row.updated_at, 0).expect("Invalid timestamp"),
        }
    }
}

#[async_trait]
impl AccountRepository for SqliteAccountRepository {
    async fn create(&self, record: NewAccountRecord) -> Result<Account, Error> {
        let now = Utc::now().timestamp();

        let row = sqlx::query_as::<_, SqliteAccountRow>(&format!(
            r#"
            INSERT INTO accounts (id, email, display_name, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING {ACCOUNT_COLUMNS}
            "#,
        ))
        .bind(record.id.as_str())
        .bind(&record.email)
        .bind(&record.display_name)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return Error::Auth(AuthError::DuplicateEmail);
                }
            }
            tracing::error!(error = %e, "Failed to create account");
            Error::Storage(StorageError::Database("Failed to create account".to_string()))
        })?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, Error> {
        let row = sqlx::query_as::<_, SqliteAccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?"
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to find account by id");
            StorageError::Database("Failed to find account by id".to_string())
        })?;

        Ok(row.map(Into::into))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, Error> {
        let row = sqlx::query_as::<_, SqliteAccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = ?"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to find account by email");
            StorageError::Database("Failed to find account by email".to_string())
        })?;

        Ok(row.map(Into::into))
    }

    async fn record_failure(
        &self,
        id: &AccountId,
        max_attempts: u32,
        lock_for: Duration,
    ) -> Result<Account, Error> {
        let now = Utc::now();
        let lock_until = (now + lock_for).timestamp();
        let now = now.timestamp();

        // Single conditional update: an expired lock restarts the window,
        // an active lock is never moved, and the lock timestamp is written
        // only when the post-increment count reaches the threshold.
        let row = sqlx::query_as::<_, SqliteAccountRow>(&format!(
            r#"
            UPDATE accounts SET
                failed_attempts = CASE
                    WHEN locked_until IS NOT NULL AND locked_until <= ?1 THEN 1
                    ELSE failed_attempts + 1
                END,
                locked_until = CASE
                    WHEN locked_until IS NOT NULL AND locked_until > ?1 THEN locked_until
                    WHEN (CASE
                        WHEN locked_until IS NOT NULL AND locked_until <= ?1 THEN 1
                        ELSE failed_attempts + 1
                    END) >= ?2 THEN ?3
                    ELSE NULL
                END,
                updated_at = ?1
            WHERE id = ?4
            RETURNING {ACCOUNT_COLUMNS}
            "#,
        ))
        .bind(now)
        .bind(max_attempts as i64)
        .bind(lock_until)
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to record failed attempt");
            StorageError::Database("Failed to record failed attempt".to_string())
        })?;

        row.map(Into::into)
            .ok_or(Error::Storage(StorageError::NotFound))
    }

    async fn record_success(&self, id: &AccountId) -> Result<Account, Error> {
        let now = Utc::now().timestamp();

        let row = sqlx::query_as::<_, SqliteAccountRow>(&format!(
            r#"
            UPDATE accounts SET
                failed_attempts = 0,
                locked_until = NULL,
                last_login_at = ?1,
                updated_at = ?1
            WHERE id = ?2
            RETURNING {ACCOUNT_COLUMNS}
            "#,
        ))
        .bind(now)
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to record successful attempt");
            StorageError::Database("Failed to record successful attempt".to_string())
        })?;

        row.map(Into::into)
            .ok_or(Error::Storage(StorageError::NotFound))
    }

    async fn clear_lockout(&self, id: &AccountId) -> Result<Account, Error> {
        let now = Utc::now().timestamp();

        let row = sqlx::query_as::<_, SqliteAccountRow>(&format!(
            r#"
            UPDATE accounts SET
                failed_attempts = 0,
                locked_until = NULL,
                updated_at = ?1
            WHERE id = ?2
            RETURNING {ACCOUNT_COLUMNS}
            "#,
        ))
        .bind(now)
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to clear lockout");
            StorageError::Database("Failed to clear lockout".to_string())
        })?;

        row.map(Into::into)
            .ok_or(Error::Storage(StorageError::NotFound))
    }

    async fn set_active(&self, id: &AccountId, is_active: bool) -> Result<(), Error> {
        sqlx::query("UPDATE accounts SET is_active = ?, updated_at = ? WHERE id = ?")
            .bind(is_active)
            .bind(Utc::now().timestamp())
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to set account active flag");
                StorageError::Database("Failed to set account active flag".to_string())
            })?;

        Ok(())
    }
}
