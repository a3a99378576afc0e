//! Owner credentials: password verification and session-token issue/verify.
//!
//! The user set is loaded once at startup from the configuration and is
//! immutable at runtime; revoking a user means removing the entry and
//! restarting. Tokens are HS256 JWTs treated as a black box beyond the claims
//! this module reads back.

use std::collections::HashMap;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, SaltString},
    Argon2, PasswordHasher, PasswordVerifier,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum CredentialsError {
    /// Unknown user or wrong password. The message is identical for both so
    /// a caller cannot probe which usernames exist.
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("invalid token")]
    InvalidToken,
    #[error("token signing failed")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("invalid stored password hash: {0}")]
    BadHash(String),
}

/// Stores and validates user credentials.
pub trait CredentialsStorage: Send + Sync {
    /// Returns a session token if the password matches the stored hash for
    /// the given user.
    fn authenticate(&self, username: &str, password: &str) -> Result<String, CredentialsError>;
    /// Validates a session token and returns the username it was issued for.
    ///
    /// Fails on a bad signature, a foreign algorithm, an expired token, or a
    /// username that is no longer known.
    fn validate(&self, token: &str) -> Result<String, CredentialsError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// Credentials held in memory, loaded from the `[auth]` config section.
pub struct MemoryCredentialsStorage {
    hashes: HashMap<String, String>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_ttl: Duration,
}

impl MemoryCredentialsStorage {
    pub fn new(hashes: HashMap<String, String>, secret: &[u8], token_ttl: Duration) -> Self {
        Self {
            hashes,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
            token_ttl,
        }
    }
}

impl CredentialsStorage for MemoryCredentialsStorage {
    fn authenticate(&self, username: &str, password: &str) -> Result<String, CredentialsError> {
        let hash = self.hashes.get(username).ok_or(CredentialsError::InvalidCredentials)?;
        let parsed = PasswordHash::new(hash).map_err(|_| CredentialsError::InvalidCredentials)?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| CredentialsError::InvalidCredentials)?;

        let now = Utc::now();
        let claims = Claims {
            sub: username.to_string(),
            iat: now.timestamp(),
            exp: (now + self.token_ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(CredentialsError::Signing)
    }

    fn validate(&self, token: &str) -> Result<String, CredentialsError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| CredentialsError::InvalidToken)?;

        // Revocation by deletion: a structurally valid token for a removed
        // user is still rejected.
        if !self.hashes.contains_key(&data.claims.sub) {
            return Err(CredentialsError::InvalidToken);
        }

        Ok(data.claims.sub)
    }
}

/// Hashes a password with Argon2id, for provisioning `[auth].users` entries.
pub fn hash_password(password: &str) -> Result<String, CredentialsError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CredentialsError::BadHash(e.to_string()))
}
