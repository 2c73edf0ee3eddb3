//! SQLite storage backend for turnstile
//!
//! Repositories over a `sqlx::SqlitePool`. Timestamps are stored as integer
//! seconds. The conditional counter updates and the reset-token consume are
//! single SQL statements, so the read-modify-write never spans a round
//! trip.

pub mod migrations;
pub mod repositories;

pub use repositories::{
    SqliteAccountRepository, SqliteIpAttemptRepository, SqlitePasswordRepository,
    SqliteRepositoryProvider, SqliteResetTokenRepository, SqliteRevokedTokenRepository,
};
