use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use turnstile::{TokenConfig, Turnstile, TurnstileConfig};
use turnstile_core::{
    Error,
    error::{AuthError, StorageError, TokenError},
    services::Mailer,
};
use turnstile_storage_memory::MemoryRepositoryProvider;

// Test secret for HS256
const TEST_HS256_SECRET: &[u8] = b"this_is_a_test_secret_key_for_hs256_jwt_tokens_not_for_prod";

/// Mailer that captures outgoing reset emails instead of sending them
#[derive(Default)]
struct CapturingMailer {
    sent: Mutex<Vec<(String, String, Option<String>)>>,
}

impl CapturingMailer {
    fn sent(&self) -> Vec<(String, String, Option<String>)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for CapturingMailer {
    async fn send_password_reset_email(
        &self,
        to: &str,
        reset_secret: &str,
        display_name: Option<&str>,
    ) -> Result<(), Error> {
        self.sent.lock().unwrap().push((
            to.to_string(),
            reset_secret.to_string(),
            display_name.map(|s| s.to_string()),
        ));
        Ok(())
    }
}

/// Mailer whose transport is down
struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send_password_reset_email(
        &self,
        _to: &str,
        _reset_secret: &str,
        _display_name: Option<&str>,
    ) -> Result<(), Error> {
        Err(Error::Storage(StorageError::Connection(
            "smtp transport refused".to_string(),
        )))
    }
}

fn turnstile_with_mailer(
    mailer: Arc<dyn Mailer>,
) -> Turnstile<MemoryRepositoryProvider> {
    let repositories = Arc::new(MemoryRepositoryProvider::new());
    let config = TurnstileConfig::new(TokenConfig::new_hs256(TEST_HS256_SECRET.to_vec()));
    Turnstile::new(repositories, config).with_mailer(mailer)
}

#[tokio::test]
async fn test_full_reset_flow() {
    let mailer = Arc::new(CapturingMailer::default());
    let turnstile = turnstile_with_mailer(mailer.clone());

    turnstile
        .register("a@x.com", "Or1ginal-pass!", Some("Ada".to_string()))
        .await
        .unwrap();

    turnstile
        .request_password_reset("a@x.com", "203.0.113.7")
        .await
        .unwrap();

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    let (to, secret, display_name) = &sent[0];
    assert_eq!(to, "a@x.com");
    assert_eq!(display_name.as_deref(), Some("Ada"));

    turnstile
        .confirm_password_reset(secret, "N3w-password!")
        .await
        .unwrap();

    // Old password is gone, new one works
    let old = turnstile.login("a@x.com", "Or1ginal-pass!", "203.0.113.7").await;
    assert!(matches!(old, Err(Error::Auth(AuthError::InvalidCredentials))));
    turnstile
        .login("a@x.com", "N3w-password!", "203.0.113.7")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_unknown_email_same_success_and_no_email() {
    let mailer = Arc::new(CapturingMailer::default());
    let turnstile = turnstile_with_mailer(mailer.clone());

    turnstile
        .register("a@x.com", "Or1ginal-pass!", None)
        .await
        .unwrap();

    // Both calls return the identical success shape
    turnstile
        .request_password_reset("a@x.com", "203.0.113.7")
        .await
        .unwrap();
    turnstile
        .request_password_reset("nobody@x.com", "203.0.113.7")
        .await
        .unwrap();

    // But only the real account got an email
    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "a@x.com");
}

#[tokio::test]
async fn test_inactive_account_gets_generic_success() {
    let mailer = Arc::new(CapturingMailer::default());
    let repositories = Arc::new(MemoryRepositoryProvider::new());
    let config = TurnstileConfig::new(TokenConfig::new_hs256(TEST_HS256_SECRET.to_vec()));
    let turnstile = Turnstile::new(repositories.clone(), config).with_mailer(mailer.clone());

    let registered = turnstile
        .register("a@x.com", "Or1ginal-pass!", None)
        .await
        .unwrap();

    use turnstile_core::repositories::{AccountRepository, AccountRepositoryProvider};
    repositories
        .account()
        .set_active(&registered.id, false)
        .await
        .unwrap();

    turnstile
        .request_password_reset("a@x.com", "203.0.113.7")
        .await
        .unwrap();
    assert!(mailer.sent().is_empty());
}

#[tokio::test]
async fn test_mail_failure_still_generic_success() {
    let turnstile = turnstile_with_mailer(Arc::new(FailingMailer));

    turnstile
        .register("a@x.com", "Or1ginal-pass!", None)
        .await
        .unwrap();

    // The transport failure is logged, not surfaced
    turnstile
        .request_password_reset("a@x.com", "203.0.113.7")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_second_request_invalidates_first_token() {
    let mailer = Arc::new(CapturingMailer::default());
    let turnstile = turnstile_with_mailer(mailer.clone());

    turnstile
        .register("a@x.com", "Or1ginal-pass!", None)
        .await
        .unwrap();

    turnstile
        .request_password_reset("a@x.com", "203.0.113.7")
        .await
        .unwrap();
    turnstile
        .request_password_reset("a@x.com", "203.0.113.7")
        .await
        .unwrap();

    let sent = mailer.sent();
    assert_eq!(sent.len(), 2);
    let first_secret = &sent[0].1;
    let second_secret = &sent[1].1;
    assert_ne!(first_secret, second_secret);

    // The first token died the moment the second was issued
    let result = turnstile
        .confirm_password_reset(first_secret, "N3w-password!")
        .await;
    assert!(matches!(
        result,
        Err(Error::Token(TokenError::ResetInvalidOrExpired))
    ));

    turnstile
        .confirm_password_reset(second_secret, "N3w-password!")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_token_single_use() {
    let mailer = Arc::new(CapturingMailer::default());
    let turnstile = turnstile_with_mailer(mailer.clone());

    turnstile
        .register("a@x.com", "Or1ginal-pass!", None)
        .await
        .unwrap();
    turnstile
        .request_password_reset("a@x.com", "203.0.113.7")
        .await
        .unwrap();

    let secret = mailer.sent()[0].1.clone();

    turnstile
        .confirm_password_reset(&secret, "N3w-password!")
        .await
        .unwrap();

    let result = turnstile
        .confirm_password_reset(&secret, "An0ther-pass!")
        .await;
    assert!(matches!(
        result,
        Err(Error::Token(TokenError::ResetInvalidOrExpired))
    ));
}

#[tokio::test]
async fn test_concurrent_confirmations_exactly_one_winner() {
    let mailer = Arc::new(CapturingMailer::default());
    let turnstile = Arc::new(turnstile_with_mailer(mailer.clone()));

    turnstile
        .register("a@x.com", "Or1ginal-pass!", None)
        .await
        .unwrap();
    turnstile
        .request_password_reset("a@x.com", "203.0.113.7")
        .await
        .unwrap();

    let secret = mailer.sent()[0].1.clone();

    let t1 = Arc::clone(&turnstile);
    let t2 = Arc::clone(&turnstile);
    let s1 = secret.clone();
    let s2 = secret.clone();

    let (r1, r2) = tokio::join!(
        tokio::spawn(async move { t1.confirm_password_reset(&s1, "N3w-password!").await }),
        tokio::spawn(async move { t2.confirm_password_reset(&s2, "N3w-password!").await }),
    );

    let outcomes = [r1.unwrap(), r2.unwrap()];
    let successes = outcomes.iter().filter(|r| r.is_ok()).count();
    let failures = outcomes
        .iter()
        .filter(|r| matches!(r, Err(Error::Token(TokenError::ResetInvalidOrExpired))))
        .count();

    assert_eq!(successes, 1);
    assert_eq!(failures, 1);

    // The post-state is a fully applied reset either way
    turnstile
        .login("a@x.com", "N3w-password!", "203.0.113.7")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_reset_unlocks_a_locked_account() {
    let mailer = Arc::new(CapturingMailer::default());
    let turnstile = turnstile_with_mailer(mailer.clone());

    turnstile
        .register("a@x.com", "Or1ginal-pass!", None)
        .await
        .unwrap();

    // Lock the account with five wrong passwords from rotating addresses
    for i in 0..5 {
        let _ = turnstile
            .login("a@x.com", "Wr0ng-password!", &format!("203.0.113.{i}"))
            .await;
    }
    assert!(matches!(
        turnstile.login("a@x.com", "Or1ginal-pass!", "203.0.113.9").await,
        Err(Error::Auth(AuthError::AccountLocked))
    ));

    // Reset clears the lockout along with the password
    turnstile
        .request_password_reset("a@x.com", "203.0.113.9")
        .await
        .unwrap();
    let secret = mailer.sent()[0].1.clone();
    turnstile
        .confirm_password_reset(&secret, "N3w-password!")
        .await
        .unwrap();

    turnstile
        .login("a@x.com", "N3w-password!", "203.0.113.9")
        .await
        .unwrap();
}
