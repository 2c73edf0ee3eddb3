//! Email delivery collaborator.
//!
//! Transport (SMTP, queue, whatever operations runs) lives outside this
//! crate; the orchestrator only needs something that can deliver a reset
//! secret to an address. Implementations must report failure — the caller
//! decides what the end user sees, but operators need the signal.

use crate::Error;
use async_trait::async_trait;

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver a password-reset secret to `to`, addressing the recipient by
    /// `display_name` when one is on file.
    async fn send_password_reset_email(
        &self,
        to: &str,
        reset_secret: &str,
        display_name: Option<&str>,
    ) -> Result<(), Error>;
}
