//! Password hashing and session token service.
//!
//! # Responsibility
//! - Hash and verify passwords with Argon2id (PHC string output).
//! - Issue and verify HS256 JWT session tokens.
//!
//! # Invariants
//! - The signing secret is injected configuration, never a constant.
//! - Plaintext passwords, hashes and tokens are never logged.
//! - Verification mismatch is `Ok(false)`; only unusable inputs are errors.

use super::ErrorKind;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Default session lifetime: two hours.
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 2 * 60 * 60;

const DUMMY_PASSWORD: &str = "todoapp-timing-equalizer";

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCost {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashCost {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// Construction input for `CredentialService`.
#[derive(Clone)]
pub struct CredentialConfig {
    pub signing_secret: Vec<u8>,
    pub token_ttl_secs: u64,
    pub hash_cost: HashCost,
}

impl CredentialConfig {
    pub fn new(signing_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            signing_secret: signing_secret.into(),
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            hash_cost: HashCost::default(),
        }
    }
}

impl Debug for CredentialConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialConfig")
            .field("signing_secret", &"<redacted>")
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("hash_cost", &self.hash_cost)
            .finish()
    }
}

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user_id: Uuid,
    pub username: String,
    /// Issued-at, epoch seconds.
    pub iat: u64,
    /// Expiry, epoch seconds.
    pub exp: u64,
}

/// A freshly signed token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    /// Expiry in epoch milliseconds.
    pub expires_at: i64,
}

/// Credential failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// Hashing library or RNG failure.
    Crypto(String),
    /// Stored hash is not a parseable PHC string.
    MalformedHash,
    /// Signing key is empty or token encoding failed.
    Signing(String),
    /// Token signature, structure or expiry check failed.
    InvalidToken(String),
}

impl CredentialError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Crypto(_) | Self::MalformedHash => ErrorKind::CryptoFailure,
            Self::Signing(_) => ErrorKind::SigningFailure,
            Self::InvalidToken(_) => ErrorKind::Unauthorized,
        }
    }
}

impl Display for CredentialError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Crypto(details) => write!(f, "password hashing failed: {details}"),
            Self::MalformedHash => write!(f, "stored password hash is malformed"),
            Self::Signing(details) => write!(f, "token signing failed: {details}"),
            Self::InvalidToken(details) => write!(f, "invalid token: {details}"),
        }
    }
}

impl Error for CredentialError {}

/// Argon2id hasher plus HS256 token signer.
pub struct CredentialService {
    hasher: Argon2<'static>,
    encoding_key: Option<EncodingKey>,
    decoding_key: Option<DecodingKey>,
    token_ttl_secs: u64,
    dummy_hash: String,
}

impl CredentialService {
    /// Builds the service and pre-computes the dummy hash used by
    /// `verify_dummy`.
    ///
    /// An empty signing secret is accepted here; token operations then fail
    /// with `CredentialError::Signing`.
    ///
    /// # Errors
    /// - `Crypto` when the cost parameters are rejected by argon2.
    pub fn new(config: &CredentialConfig) -> Result<Self, CredentialError> {
        let cost = config.hash_cost;
        let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
            .map_err(|err| CredentialError::Crypto(err.to_string()))?;
        let hasher = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let (encoding_key, decoding_key) = if config.signing_secret.is_empty() {
            (None, None)
        } else {
            (
                Some(EncodingKey::from_secret(&config.signing_secret)),
                Some(DecodingKey::from_secret(&config.signing_secret)),
            )
        };

        let dummy_hash = hash_with(&hasher, DUMMY_PASSWORD)?;

        Ok(Self {
            hasher,
            encoding_key,
            decoding_key,
            token_ttl_secs: config.token_ttl_secs,
            dummy_hash,
        })
    }

    pub fn token_ttl_secs(&self) -> u64 {
        self.token_ttl_secs
    }

    /// Hashes `plaintext` with a fresh random salt.
    pub fn hash_password(&self, plaintext: &str) -> Result<String, CredentialError> {
        hash_with(&self.hasher, plaintext)
    }

    /// Verifies `plaintext` against a stored PHC hash.
    ///
    /// Cost parameters are read from the hash itself, so hashes produced
    /// under an older cost configuration still verify.
    ///
    /// # Errors
    /// - `MalformedHash` when `hash` cannot be parsed.
    /// - `Crypto` for any library failure other than a mismatch.
    pub fn verify_password(&self, hash: &str, plaintext: &str) -> Result<bool, CredentialError> {
        let parsed = PasswordHash::new(hash).map_err(|_| CredentialError::MalformedHash)?;
        match self.hasher.verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(err) => Err(CredentialError::Crypto(err.to_string())),
        }
    }

    /// Burns one verification against the dummy hash. Result is discarded.
    pub fn verify_dummy(&self, plaintext: &str) {
        let _ = self.verify_password(&self.dummy_hash, plaintext);
    }

    /// Signs a token for `user_id` valid for the configured TTL.
    pub fn issue_token(
        &self,
        user_id: Uuid,
        username: &str,
    ) -> Result<IssuedToken, CredentialError> {
        let key = self
            .encoding_key
            .as_ref()
            .ok_or_else(|| CredentialError::Signing("signing secret is empty".to_string()))?;

        let iat = epoch_secs();
        let exp = iat.saturating_add(self.token_ttl_secs);
        let claims = TokenClaims {
            user_id,
            username: username.to_string(),
            iat,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::new(jsonwebtoken::Algorithm::HS256), &claims, key)
            .map_err(|err| CredentialError::Signing(err.to_string()))?;

        Ok(IssuedToken {
            token,
            expires_at: i64::try_from(exp.saturating_mul(1000)).unwrap_or(i64::MAX),
        })
    }

    /// Validates signature and expiry, returning the embedded claims.
    pub fn verify_token(&self, token: &str) -> Result<TokenClaims, CredentialError> {
        let key = self
            .decoding_key
            .as_ref()
            .ok_or_else(|| CredentialError::Signing("signing secret is empty".to_string()))?;

        let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
        validation.leeway = 0;

        jsonwebtoken::decode::<TokenClaims>(token, key, &validation)
            .map(|data| data.claims)
            .map_err(|err| CredentialError::InvalidToken(err.to_string()))
    }
}

fn hash_with(hasher: &Argon2<'_>, plaintext: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    hasher
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| CredentialError::Crypto(err.to_string()))
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or(0)
}
