//! Schema migrations for the SQLite backend.
//!
//! Statements are idempotent and run in order on every `migrate()` call.

use sqlx::SqlitePool;
use turnstile_core::{Error, error::StorageError};

const MIGRATIONS: &[(&str, &str)] = &[
    (
        "create_accounts_table",
        r#"
        CREATE TABLE IF NOT EXISTS accounts (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            display_name TEXT,
            failed_attempts INTEGER NOT NULL DEFAULT 0,
            locked_until INTEGER,
            is_active INTEGER NOT NULL DEFAULT 1,
            last_login_at INTEGER,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    ),
    (
        "create_account_passwords_table",
        r#"
        CREATE TABLE IF NOT EXISTS account_passwords (
            account_id TEXT PRIMARY KEY REFERENCES accounts(id) ON DELETE CASCADE,
            password_hash TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    ),
    (
        "create_ip_attempts_table",
        r#"
        CREATE TABLE IF NOT EXISTS ip_attempts (
            address TEXT PRIMARY KEY,
            failed_attempts INTEGER NOT NULL DEFAULT 0,
            last_attempt_at INTEGER NOT NULL,
            blocked_until INTEGER
        )
        "#,
    ),
    (
        "create_revoked_tokens_table",
        r#"
        CREATE TABLE IF NOT EXISTS revoked_tokens (
            fingerprint TEXT PRIMARY KEY,
            account_id TEXT,
            reason TEXT NOT NULL,
            revoked_at INTEGER NOT NULL
        )
        "#,
    ),
    (
        "create_reset_tokens_table",
        r#"
        CREATE TABLE IF NOT EXISTS reset_tokens (
            secret TEXT PRIMARY KEY,
            account_id TEXT NOT NULL,
            expires_at INTEGER NOT NULL,
            used INTEGER NOT NULL DEFAULT 0,
            requested_from TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    ),
    (
        "create_indexes",
        r#"
        CREATE INDEX IF NOT EXISTS idx_reset_tokens_account ON reset_tokens (account_id, used);
        CREATE INDEX IF NOT EXISTS idx_ip_attempts_last_attempt ON ip_attempts (last_attempt_at);
        CREATE INDEX IF NOT EXISTS idx_revoked_tokens_revoked_at ON revoked_tokens (revoked_at)
        "#,
    ),
];

/// Apply all migrations to the given pool
pub async fn migrate(pool: &SqlitePool) -> Result<(), Error> {
    for (name, statement) in MIGRATIONS {
        sqlx::raw_sql(statement).execute(pool).await.map_err(|e| {
            tracing::error!(migration = name, error = %e, "Migration failed");
            Error::Storage(StorageError::Migration(format!(
                "Migration {name} failed"
            )))
        })?;
    }

    Ok(())
}
