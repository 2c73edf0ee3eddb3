//! Account management
//!
//! This module contains the core account struct and related functionality.
//!
//! Accounts are the credential-store entity behind authentication. The core
//! account struct is defined as follows:
//!
//! | Field             | Type               | Description                                             |
//! | ----------------- | ------------------ | ------------------------------------------------------- |
//! | `id`              | `AccountId`        | The unique identifier for the account.                  |
//! | `email`           | `String`           | The login key, unique and stored lowercase.             |
//! | `display_name`    | `Option<String>`   | Name used when addressing the account holder.           |
//! | `failed_attempts` | `u32`              | Consecutive failed authentication attempts.             |
//! | `locked_until`    | `Option<DateTime>` | If set and in the future, the account is locked.        |
//! | `is_active`       | `bool`             | Inactive accounts never authenticate.                   |
//! | `last_login_at`   | `Option<DateTime>` | Timestamp of the last successful login.                 |
//! | `created_at`      | `DateTime`         | The timestamp when the account was created.             |
//! | `updated_at`      | `DateTime`         | The timestamp when the account was last updated.        |
//!
//! The password hash is not part of this struct; it is held by the password
//! repository and never leaves the store.

use crate::{
    Error,
    error::ValidationError,
    id::{generate_prefixed_id, validate_prefixed_id},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A unique, stable identifier for a specific account
/// This value should be treated as opaque
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: &str) -> Self {
        AccountId(id.to_string())
    }

    pub fn new_random() -> Self {
        AccountId(generate_prefixed_id("acct"))
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate that this ID has the correct format for an account ID
    pub fn is_valid(&self) -> bool {
        validate_prefixed_id(&self.0, "acct")
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new_random()
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Representation of an account in the credential store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// The unique identifier for the account.
    pub id: AccountId,

    /// The email of the account holder. Unique, lowercase.
    pub email: String,

    /// Optional display name, used when addressing the account holder.
    pub display_name: Option<String>,

    /// Consecutive failed authentication attempts. Reset on success or
    /// password change.
    pub failed_attempts: u32,

    /// When set and in the future, authentication is refused.
    pub locked_until: Option<DateTime<Utc>>,

    /// Inactive accounts never authenticate.
    pub is_active: bool,

    /// Timestamp of the last successful login.
    pub last_login_at: Option<DateTime<Utc>>,

    /// The created at timestamp.
    pub created_at: DateTime<Utc>,

    /// The updated at timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn builder() -> AccountBuilder {
        AccountBuilder::default()
    }

    /// True iff a lock timestamp is present and strictly in the future.
    pub fn is_locked(&self) -> bool {
        self.locked_until.is_some_and(|until| until > Utc::now())
    }
}

#[derive(Default)]
pub struct AccountBuilder {
    id: Option<AccountId>,
    email: Option<String>,
    display_name: Option<String>,
    failed_attempts: u32,
    locked_until: Option<DateTime<Utc>>,
    is_active: Option<bool>,
    last_login_at: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl AccountBuilder {
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

    pub fn failed_attempts(mut self, failed_attempts: u32) -> Self {
        self.failed_attempts = failed_attempts;
        self
    }

    pub fn locked_until(mut self, locked_until: Option<DateTime<Utc>>) -> Self {
        self.locked_until = locked_until;
        self
    }

    pub fn is_active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    pub fn last_login_at(mut self, last_login_at: Option<DateTime<Utc>>) -> Self {
        self.last_login_at = last_login_at;
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    pub fn build(self) -> Result<Account, Error> {
        let now = Utc::now();
        Ok(Account {
            id: self.id.unwrap_or_default(),
            email: self.email.ok_or(ValidationError::MissingField(
                "Email is required".to_string(),
            ))?,
            display_name: self.display_name,
            failed_attempts: self.failed_attempts,
            locked_until: self.locked_until,
            is_active: self.is_active.unwrap_or(true),
            last_login_at: self.last_login_at,
            created_at: self.created_at.unwrap_or(now),
            updated_at: self.updated_at.unwrap_or(now),
        })
    }
}
