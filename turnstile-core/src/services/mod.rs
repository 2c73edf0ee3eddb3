//! Service layer for business logic
//!
//! This module contains concrete service implementations that encapsulate
//! the credential store, address rate limiting, token issuance/revocation,
//! and the password-reset flow.

pub mod credential;
pub mod mailer;
pub mod password_reset;
pub mod rate_limit;
pub mod token;

pub use credential::CredentialService;
pub use mailer::Mailer;
pub use password_reset::PasswordResetService;
pub use rate_limit::RateLimitService;
pub use token::TokenAuthority;
