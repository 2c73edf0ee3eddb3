//! SQLite implementation of the per-address attempt repository.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use turnstile_core::{
    Error, error::StorageError, repositories::IpAttemptRepository, storage::IpAttempt,
};

/// SQLite repository for per-address attempt tracking.
pub struct SqliteIpAttemptRepository {
    pool: SqlitePool,
}

impl SqliteIpAttemptRepository {
    /// Create a new SQLite IP attempt repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Internal struct for query results
#[derive(Debug, sqlx::FromRow)]
struct SqliteIpAttemptRow {
    address: String,
    failed_attempts: i64,
    last_attempt_at: i64,
    blocked_until: Option<i64>,
}

impl From<SqliteIpAttemptRow> for IpAttempt {
    fn from(row: SqliteIpAttemptRow) -> Self {
        IpAttempt {
            address: row.address,
            failed_attempts: row.failed_attempts as u32,
            last_attempt_at: DateTime::from_timestamp(row.last_attempt_at, 0)
                .expect("Invalid timestamp"),
            blocked_until: row
                .blocked_until
                .and_then(|ts| DateTime::from_timestamp(ts, 0)),
        }
    }
}

#[async_trait]
impl IpAttemptRepository for SqliteIpAttemptRepository {
    async fn find(&self, address: &str) -> Result<Option<IpAttempt>, Error> {
        let row = sqlx::query_as::<_, SqliteIpAttemptRow>(
            "SELECT address, failed_attempts, last_attempt_at, blocked_until FROM ip_attempts WHERE address = ?",
        )
        .bind(address)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to find address attempts");
            StorageError::Database("Failed to find address attempts".to_string())
        })?;

        Ok(row.map(Into::into))
    }

    async fn record_failure(
        &self,
        address: &str,
        max_attempts: u32,
        block_for: Duration,
        stale_after: Duration,
    ) -> Result<IpAttempt, Error> {
        let now = Utc::now();
        let block_until = (now + block_for).timestamp();
        let stale_cutoff = (now - stale_after).timestamp();
        let now = now.timestamp();

        // Single upsert: a stale counter restarts at one, an active block is
        // never moved, and the block timestamp is written only when the
        // post-increment count reaches the threshold.
        let row = sqlx::query_as::<_, SqliteIpAttemptRow>(
            r#"
            INSERT INTO ip_attempts (address, failed_attempts, last_attempt_at, blocked_until)
            VALUES (?1, 1, ?2, CASE WHEN 1 >= ?3 THEN ?4 ELSE NULL END)
            ON CONFLICT(address) DO UPDATE SET
                failed_attempts = CASE
                    WHEN ip_attempts.last_attempt_at < ?5 THEN 1
                    ELSE ip_attempts.failed_attempts + 1
                END,
                blocked_until = CASE
                    WHEN ip_attempts.blocked_until IS NOT NULL AND ip_attempts.blocked_until > ?2
                        THEN ip_attempts.blocked_until
                    WHEN (CASE
                        WHEN ip_attempts.last_attempt_at < ?5 THEN 1
                        ELSE ip_attempts.failed_attempts + 1
                    END) >= ?3 THEN ?4
                    ELSE NULL
                END,
                last_attempt_at = ?2
            RETURNING address, failed_attempts, last_attempt_at, blocked_until
            "#,
        )
        .bind(address)
        .bind(now)
        .bind(max_attempts as i64)
        .bind(block_until)
        .bind(stale_cutoff)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to record address failure");
            StorageError::Database("Failed to record address failure".to_string())
        })?;

        Ok(row.into())
    }

    async fn clear(&self, address: &str) -> Result<(), Error> {
        sqlx::query("DELETE FROM ip_attempts WHERE address = ?")
            .bind(address)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to clear address attempts");
                StorageError::Database("Failed to clear address attempts".to_string())
            })?;

        Ok(())
    }

    async fn delete_stale(&self, cutoff: DateTime<Utc>) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM ip_attempts WHERE last_attempt_at < ?")
            .bind(cutoff.timestamp())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to delete stale address attempts");
                StorageError::Database("Failed to delete stale address attempts".to_string())
            })?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to create pool");
        migrations::migrate(&pool)
            .await
            .expect("Failed to run migrations");
        pool
    }

    #[tokio::test]
    async fn test_record_failure_creates_lazily() {
        let pool = setup_test_db().await;
        let repo = SqliteIpAttemptRepository::new(pool);

        assert!(repo.find("203.0.113.7").await.unwrap().is_none());

        let attempt = repo
            .record_failure("203.0.113.7", 5, Duration::minutes(10), Duration::minutes(10))
            .await
            .unwrap();
        assert_eq!(attempt.failed_attempts, 1);
        assert!(!attempt.is_blocked());
    }

    #[tokio::test]
    async fn test_blocks_at_threshold() {
        let pool = setup_test_db().await;
        let repo = SqliteIpAttemptRepository::new(pool);

        for _ in 0..4 {
            let attempt = repo
                .record_failure("203.0.113.7", 5, Duration::minutes(10), Duration::minutes(10))
                .await
                .unwrap();
            assert!(!attempt.is_blocked());
        }

        let attempt = repo
            .record_failure("203.0.113.7", 5, Duration::minutes(10), Duration::minutes(10))
            .await
            .unwrap();
        assert_eq!(attempt.failed_attempts, 5);
        assert!(attempt.is_blocked());
    }

    #[tokio::test]
    async fn test_active_block_not_extended() {
        let pool = setup_test_db().await;
        let repo = SqliteIpAttemptRepository::new(pool);

        for _ in 0..5 {
            repo.record_failure("203.0.113.7", 5, Duration::minutes(10), Duration::minutes(10))
                .await
                .unwrap();
        }
        let blocked_until = repo
            .find("203.0.113.7")
            .await
            .unwrap()
            .unwrap()
            .blocked_until;

        let attempt = repo
            .record_failure("203.0.113.7", 5, Duration::minutes(10), Duration::minutes(10))
            .await
            .unwrap();
        assert_eq!(attempt.blocked_until, blocked_until);
    }

    #[tokio::test]
    async fn test_stale_counter_restarts() {
        let pool = setup_test_db().await;
        let repo = SqliteIpAttemptRepository::new(pool.clone());

        sqlx::query(
            "INSERT INTO ip_attempts (address, failed_attempts, last_attempt_at) VALUES (?, 4, ?)",
        )
        .bind("203.0.113.7")
        .bind((Utc::now() - Duration::minutes(11)).timestamp())
        .execute(&pool)
        .await
        .unwrap();

        let attempt = repo
            .record_failure("203.0.113.7", 5, Duration::minutes(10), Duration::minutes(10))
            .await
            .unwrap();
        assert_eq!(attempt.failed_attempts, 1);
        assert!(!attempt.is_blocked());
    }

    #[tokio::test]
    async fn test_clear_and_delete_stale() {
        let pool = setup_test_db().await;
        let repo = SqliteIpAttemptRepository::new(pool.clone());

        repo.record_failure("203.0.113.7", 5, Duration::minutes(10), Duration::minutes(10))
            .await
            .unwrap();
        repo.clear("203.0.113.7").await.unwrap();
        assert!(repo.find("203.0.113.7").await.unwrap().is_none());

        sqlx::query(
            "INSERT INTO ip_attempts (address, failed_attempts, last_attempt_at) VALUES (?, 1, ?)",
        )
        .bind("203.0.113.8")
        .bind((Utc::now() - Duration::hours(2)).timestamp())
        .execute(&pool)
        .await
        .unwrap();

        let deleted = repo
            .delete_stale(Utc::now() - Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(deleted, 1);
    }
}
