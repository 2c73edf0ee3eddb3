//! In-memory storage backend for turnstile
//!
//! Repositories backed by `dashmap` sharded maps. Useful for tests and
//! embedded deployments; nothing survives a restart.
//!
//! Atomicity comes from DashMap's per-entry exclusive references: the
//! increment-and-maybe-lock and mark-used transitions run under the entry
//! lock, so concurrent callers against the same key serialize and no update
//! is lost.

pub mod repositories;

pub use repositories::{
    MemoryAccountRepository, MemoryIpAttemptRepository, MemoryPasswordRepository,
    MemoryRepositoryProvider, MemoryResetTokenRepository, MemoryRevokedTokenRepository,
};
