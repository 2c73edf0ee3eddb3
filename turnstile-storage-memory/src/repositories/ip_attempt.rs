use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use turnstile_core::{Error, repositories::IpAttemptRepository, storage::IpAttempt};

/// In-memory per-address attempt tracking.
#[derive(Default)]
pub struct MemoryIpAttemptRepository {
    attempts: DashMap<String, IpAttempt>,
}

impl MemoryIpAttemptRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IpAttemptRepository for MemoryIpAttemptRepository {
    async fn find(&self, address: &str) -> Result<Option<IpAttempt>, Error> {
        Ok(self.attempts.get(address).map(|entry| entry.value().clone()))
    }

    async fn record_failure(
        &self,
        address: &str,
        max_attempts: u32,
        block_for: Duration,
        stale_after: Duration,
    ) -> Result<IpAttempt, Error> {
        let now = Utc::now();
        let mut entry = self
            .attempts
            .entry(address.to_string())
            .or_insert_with(|| IpAttempt {
                address: address.to_string(),
                failed_attempts: 0,
                last_attempt_at: now,
                blocked_until: None,
            });
        let attempt = entry.value_mut();

        // A counter idle past the stale window restarts.
        if now - attempt.last_attempt_at > stale_after {
            attempt.failed_attempts = 0;
            attempt.blocked_until = None;
        }

        attempt.failed_attempts += 1;
        attempt.last_attempt_at = now;
        if attempt.failed_attempts >= max_attempts && !attempt.is_blocked() {
            attempt.blocked_until = Some(now + block_for);
        }

        Ok(attempt.clone())
    }

    async fn clear(&self, address: &str) -> Result<(), Error> {
        self.attempts.remove(address);
        Ok(())
    }

    async fn delete_stale(&self, cutoff: DateTime<Utc>) -> Result<u64, Error> {
        let before = self.attempts.len();
        self.attempts.retain(|_, a| a.last_attempt_at >= cutoff);
        Ok((before - self.attempts.len()) as u64)
    }
}
