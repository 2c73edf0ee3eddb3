//! Access token primitives
//!
//! Session tokens are self-contained JWTs signed with a server-held HS256
//! secret. Every token carries a random `jti` claim, so two tokens issued
//! for the same account in the same instant are never bit-identical, and a
//! fixed maximum lifetime after which it is cryptographically unusable
//! regardless of revocation state.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};

use crate::{Error, account::Account, error::TokenError, id::generate_prefixed_id};

/// A signed access token as handed to clients.
///
/// The inner string doubles as the token's fingerprint in the revocation
/// store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        AccessToken(token.into())
    }

    /// Sign the given claims into a new access token
    pub fn new_signed(claims: &Claims, config: &TokenConfig) -> Result<Self, Error> {
        let header = Header::new(Algorithm::HS256);

        let token = encode(&header, claims, &config.encoding_key())
            .map_err(|e| crate::error::CryptoError::JwtSigning(e.to_string()))?;

        Ok(AccessToken(token))
    }

    /// Verify signature and expiry and return the claims.
    ///
    /// Failures are disjoint: [`TokenError::Expired`] for a token past its
    /// `exp` claim, [`TokenError::Malformed`] for anything tampered,
    /// truncated, or signed with the wrong key.
    pub fn verify(&self, config: &TokenConfig) -> Result<Claims, Error> {
        self.decode(config, config.validation())
    }

    /// Verify the signature but accept an expired `exp` claim.
    ///
    /// Used only to attribute a logout to its owner; never for
    /// authentication.
    pub fn verify_allow_expired(&self, config: &TokenConfig) -> Result<Claims, Error> {
        let mut validation = config.validation();
        validation.validate_exp = false;
        self.decode(config, validation)
    }

    fn decode(&self, config: &TokenConfig, validation: Validation) -> Result<Claims, Error> {
        let token_data = decode::<Claims>(&self.0, &config.decoding_key(), &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })?;

        Ok(token_data.claims)
    }

    /// The fingerprint under which this token is recorded when revoked.
    pub fn fingerprint(&self) -> &str {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<String> for AccessToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AccessToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Claims embedded in an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - account ID
    pub sub: String,
    /// Email the account authenticated with
    pub email: String,
    /// Random token ID, unique per issued token
    pub jti: String,
    /// Issued at in seconds (as UTC timestamp)
    pub iat: i64,
    /// Expiration time in seconds (as UTC timestamp)
    pub exp: i64,
    /// Issuer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

impl Claims {
    /// Build fresh claims for an account under the given configuration
    pub fn for_account(account: &Account, config: &TokenConfig) -> Self {
        let now = Utc::now();
        Claims {
            sub: account.id.to_string(),
            email: account.email.clone(),
            jti: generate_prefixed_id("tok"),
            iat: now.timestamp(),
            exp: (now + config.lifetime).timestamp(),
            iss: config.issuer.clone(),
        }
    }
}

/// Configuration for access tokens
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Secret key for both signing and verifying (HS256)
    pub secret_key: Vec<u8>,
    /// Issuer claim
    pub issuer: Option<String>,
    /// Maximum token lifetime
    pub lifetime: Duration,
}

impl TokenConfig {
    /// Create a new token configuration with the given HS256 secret and the
    /// default two-hour lifetime
    pub fn new_hs256(secret_key: Vec<u8>) -> Self {
        Self {
            secret_key,
            issuer: None,
            lifetime: Duration::hours(2),
        }
    }

    /// Set the issuer claim
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Set the token lifetime
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Create a token configuration with a random HS256 secret (for testing)
    #[cfg(test)]
    pub fn new_random_hs256() -> Self {
        use rand::TryRngCore;

        let mut secret_key = vec![0u8; 32];
        rand::rng().try_fill_bytes(&mut secret_key).unwrap();
        Self::new_hs256(secret_key)
    }

    fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(&self.secret_key)
    }

    fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(&self.secret_key)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        validation
    }
}
