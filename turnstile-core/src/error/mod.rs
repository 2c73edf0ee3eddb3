pub mod utilities;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Cryptographic error: {0}")]
    Crypto(#[from] CryptoError),
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong password or no matching account. Deliberately a single variant
    /// so callers cannot distinguish the two cases.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is locked")]
    AccountLocked,

    #[error("Too many failed attempts from this address")]
    AddressBlocked { retry_after_seconds: i64 },

    #[error("Email is already registered")]
    DuplicateEmail,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token is malformed or has an invalid signature")]
    Malformed,

    #[error("Token has expired")]
    Expired,

    #[error("Token has been revoked")]
    Revoked,

    /// Wrong secret, expired, or already used. A single undifferentiated
    /// variant so the response never reveals which case occurred.
    #[error("Reset token is invalid or has expired")]
    ResetInvalidOrExpired,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Record not found")]
    NotFound,
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid email format: {0}")]
    InvalidEmail(String),

    #[error("Invalid password: {0}")]
    InvalidPassword(String),

    #[error("Invalid display name: {0}")]
    InvalidDisplayName(String),

    #[error("Invalid field: {0}")]
    InvalidField(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("JWT signing failed: {0}")]
    JwtSigning(String),
}

impl Error {
    /// True for errors that map to an authentication decision rather than a
    /// fault in the system itself.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            Error::Auth(AuthError::InvalidCredentials)
                | Error::Auth(AuthError::AccountLocked)
                | Error::Auth(AuthError::AddressBlocked { .. })
                | Error::Auth(AuthError::DuplicateEmail)
        )
    }

    pub fn is_token_error(&self) -> bool {
        matches!(self, Error::Token(_))
    }

    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// True for faults that should surface to end users as a generic
    /// internal failure while keeping full detail for operators.
    pub fn is_internal(&self) -> bool {
        matches!(self, Error::Storage(_) | Error::Crypto(_))
    }
}
