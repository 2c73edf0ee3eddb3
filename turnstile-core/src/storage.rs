//! Storage-facing record types and policy configuration
//!
//! The structs here are the records the repository traits exchange with the
//! storage backends: new-account input, per-address attempt tracking rows,
//! revocation-list entries, and password-reset tokens, plus the lockout and
//! rate-limit policy knobs.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, account::AccountId, error::ValidationError};

/// Input record for creating an account.
///
/// The password never travels through this struct; the credential service
/// hashes it separately and hands the hash to the password repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccountRecord {
    pub id: AccountId,
    pub email: String,
    pub display_name: Option<String>,
}

impl NewAccountRecord {
    pub fn builder() -> NewAccountRecordBuilder {
        NewAccountRecordBuilder::default()
    }
}

#[derive(Default)]
pub struct NewAccountRecordBuilder {
    id: Option<AccountId>,
    email: Option<String>,
    display_name: Option<String>,
}

impl NewAccountRecordBuilder {
    pub fn id(mut self, id: AccountId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn email(mut self, email: String) -> Self {
        self.email = Some(email);
        self
    }

    pub fn display_name(mut self, display_name: Option<String>) -> Self {
        self.display_name = display_name;
        self
    }

    pub fn build(self) -> Result<NewAccountRecord, Error> {
        Ok(NewAccountRecord {
            id: self.id.unwrap_or_default(),
            email: self.email.ok_or(ValidationError::MissingField(
                "Email is required".to_string(),
            ))?,
            display_name: self.display_name,
        })
    }
}

/// Per-source-address failed attempt tracking, independent of any account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpAttempt {
    /// The source address being tracked.
    pub address: String,

    /// Failed attempts in the current window.
    pub failed_attempts: u32,

    /// Timestamp of the most recent attempt.
    pub last_attempt_at: DateTime<Utc>,

    /// When set and in the future, the address is blocked.
    pub blocked_until: Option<DateTime<Utc>>,
}

impl IpAttempt {
    /// True iff a block timestamp is present and strictly in the future.
    pub fn is_blocked(&self) -> bool {
        self.blocked_until.is_some_and(|until| until > Utc::now())
    }

    /// Seconds until the block lifts, if currently blocked.
    pub fn retry_after_seconds(&self) -> Option<i64> {
        self.blocked_until
            .filter(|until| *until > Utc::now())
            .map(|until| (until - Utc::now()).num_seconds().max(1))
    }
}

/// Why a token entered the revocation store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RevocationReason {
    /// The owner logged out.
    ExplicitLogout,
    /// An operator or security flow invalidated the token.
    SecurityAction,
    /// The token was administratively forced to expire.
    ForcedExpiry,
}

impl RevocationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RevocationReason::ExplicitLogout => "explicit-logout",
            RevocationReason::SecurityAction => "security-action",
            RevocationReason::ForcedExpiry => "forced-expiry",
        }
    }
}

impl std::str::FromStr for RevocationReason {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "explicit-logout" => Ok(RevocationReason::ExplicitLogout),
            "security-action" => Ok(RevocationReason::SecurityAction),
            "forced-expiry" => Ok(RevocationReason::ForcedExpiry),
            other => Err(ValidationError::InvalidField(format!(
                "Unknown revocation reason: {other}"
            ))
            .into()),
        }
    }
}

impl std::fmt::Display for RevocationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An entry in the revocation store.
///
/// Presence alone makes the token permanently invalid for the retention
/// window, even while its signature and expiry claim would still check out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevokedToken {
    /// The exact token string, used as the lookup key.
    pub fingerprint: String,

    /// Owner, when the token could still be attributed.
    pub account_id: Option<AccountId>,

    pub reason: RevocationReason,

    pub revoked_at: DateTime<Utc>,
}

/// A single-use password-recovery token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetToken {
    pub account_id: AccountId,

    /// Cryptographically random, fixed-length secret. Unique.
    pub secret: String,

    /// Issuance + 15 minutes.
    pub expires_at: DateTime<Utc>,

    /// False until consumed; flips exactly once.
    pub used: bool,

    /// Network address of the requester. Audit only.
    pub requested_from: String,

    pub created_at: DateTime<Utc>,
}

impl ResetToken {
    /// Valid for consumption iff unused and unexpired.
    pub fn is_valid(&self) -> bool {
        !self.used && self.expires_at > Utc::now()
    }
}

/// Account lockout policy.
#[derive(Debug, Clone)]
pub struct LockoutConfig {
    /// Failed attempts at which the account locks.
    pub max_failed_attempts: u32,

    /// How long a lock lasts once set.
    pub lock_duration: Duration,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            max_failed_attempts: 5,
            lock_duration: Duration::minutes(10),
        }
    }
}

/// Per-address rate limit policy. Same strikes/window as the account
/// lockout, evaluated independently and keyed by address.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Failed attempts at which the address blocks.
    pub max_failed_attempts: u32,

    /// How long a block lasts once set.
    pub block_duration: Duration,

    /// A counter whose last attempt is older than this is treated as reset.
    pub stale_after: Duration,

    /// Entries idle longer than this are eligible for background removal.
    pub retention: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_failed_attempts: 5,
            block_duration: Duration::minutes(10),
            stale_after: Duration::minutes(10),
            retention: Duration::hours(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_ip_attempt_blocking() {
        let blocked = IpAttempt {
            address: "10.0.0.1".to_string(),
            failed_attempts: 5,
            last_attempt_at: Utc::now(),
            blocked_until: Some(Utc::now() + Duration::minutes(10)),
        };
        assert!(blocked.is_blocked());
        let retry_after = blocked.retry_after_seconds().unwrap();
        assert!(retry_after > 590 && retry_after <= 600);

        let unblocked = IpAttempt {
            address: "10.0.0.2".to_string(),
            failed_attempts: 2,
            last_attempt_at: Utc::now(),
            blocked_until: None,
        };
        assert!(!unblocked.is_blocked());
        assert!(unblocked.retry_after_seconds().is_none());
    }

    #[test]
    fn test_revocation_reason_round_trip() {
        for reason in [
            RevocationReason::ExplicitLogout,
            RevocationReason::SecurityAction,
            RevocationReason::ForcedExpiry,
        ] {
            let parsed = RevocationReason::from_str(reason.as_str()).unwrap();
            assert_eq!(parsed, reason);
        }

        assert!(RevocationReason::from_str("logout").is_err());
    }

    #[test]
    fn test_reset_token_validity() {
        let token = ResetToken {
            account_id: AccountId::new_random(),
            secret: "secret".to_string(),
            expires_at: Utc::now() + Duration::minutes(15),
            used: false,
            requested_from: "10.0.0.1".to_string(),
            created_at: Utc::now(),
        };
        assert!(token.is_valid());

        let used = ResetToken { used: true, ..token.clone() };
        assert!(!used.is_valid());

        let expired = ResetToken {
            expires_at: Utc::now() - Duration::seconds(1),
            ..token
        };
        assert!(!expired.is_valid());
    }

    #[test]
    fn test_policy_defaults() {
        let lockout = LockoutConfig::default();
        assert_eq!(lockout.max_failed_attempts, 5);
        assert_eq!(lockout.lock_duration, Duration::minutes(10));

        let rate_limit = RateLimitConfig::default();
        assert_eq!(rate_limit.max_failed_attempts, 5);
        assert_eq!(rate_limit.block_duration, Duration::minutes(10));
        assert_eq!(rate_limit.stale_after, Duration::minutes(10));
        assert_eq!(rate_limit.retention, Duration::hours(1));
    }
}
