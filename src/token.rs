use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

use crate::models::{Role, User};

/// Claims
///
/// Payload of a session token. The server keeps no copy: everything the
/// Access Guard needs to know about the caller travels inside the signed
/// token until `exp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user's store identifier.
    pub sub: String,
    pub username: String,
    pub role: Role,
    /// Issued At (iat), unix seconds.
    pub iat: i64,
    /// Expiration Time (exp), unix seconds. Valid up to and including this second.
    pub exp: i64,
}

#[derive(Debug, ThisError, PartialEq)]
pub enum TokenError {
    #[error("token signing failed: {0}")]
    Signing(String),

    #[error("token is malformed or has a bad signature")]
    Invalid,

    #[error("token has expired")]
    Expired,
}

/// TokenService
///
/// Issues and verifies HS256 session tokens with a single shared secret.
///
/// There is no revocation list. A token stays valid until its natural expiry
/// even if the account is deleted or its role changes in the meantime.
#[derive(Clone)]
pub struct TokenService {
    secret_present: bool,
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    ttl_secs: i64,
}

impl TokenService {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            secret_present: !secret.is_empty(),
            encoding_key: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding_key: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
            ttl_secs: ttl_hours * 3600,
        }
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Signs a fresh token for `user`, valid for the configured TTL from now.
    pub fn issue(&self, user: &User) -> Result<String, TokenError> {
        self.issue_at(user, Utc::now().timestamp())
    }

    pub fn issue_at(&self, user: &User, now: i64) -> Result<String, TokenError> {
        let claims = Claims {
            sub: user.id.clone(),
            username: user.username.clone(),
            role: user.role,
            iat: now,
            exp: now + self.ttl_secs,
        };
        self.sign(&claims)
    }

    /// Signs an arbitrary claim set.
    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        if !self.secret_present {
            return Err(TokenError::Signing("signing secret is not configured".to_string()));
        }
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Checks signature and expiry against the current clock.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Checks signature and expiry against `now` with zero leeway.
    pub fn verify_at(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        // Expiry is compared below against the caller's clock, not the library's.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        let claims = match decode::<Claims>(token, &self.decoding_key, &validation) {
            Ok(data) => data.claims,
            Err(e) => {
                return Err(match e.kind() {
                    ErrorKind::ExpiredSignature => TokenError::Expired,
                    _ => TokenError::Invalid,
                });
            }
        };

        if claims.exp < now {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}
