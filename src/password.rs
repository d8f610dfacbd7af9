use std::sync::Arc;

use thiserror::Error as ThisError;
use tokio::task;

/// Plaintext behind the dummy hash used for unknown-user logins.
const DUMMY_PASSWORD: &str = "transit-scheduler-no-such-user";

#[derive(Debug, ThisError)]
pub enum HashError {
    #[error("bcrypt failure: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),

    #[error("hashing task aborted: {0}")]
    Join(#[from] task::JoinError),
}

/// PasswordHasher
///
/// One-way credential hashing with bcrypt. The work factor is deliberately
/// slow (cost 14 in production), so every call is moved onto tokio's
/// blocking pool instead of stalling the request executor.
#[derive(Clone)]
pub struct PasswordHasher {
    cost: u32,
    // Hash of `DUMMY_PASSWORD` at the same cost, compared against when the
    // username does not exist so both failure paths do the same work.
    dummy_hash: Arc<str>,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Result<Self, HashError> {
        let dummy_hash = bcrypt::hash(DUMMY_PASSWORD, cost)?;
        Ok(Self {
            cost,
            dummy_hash: dummy_hash.into(),
        })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Salted bcrypt hash of `password`.
    pub async fn hash(&self, password: &str) -> Result<String, HashError> {
        let password = password.to_owned();
        let cost = self.cost;
        let hashed = task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
        Ok(hashed)
    }

    /// Checks `password` against a stored hash. A stored value that is not a
    /// valid bcrypt hash is treated as a mismatch.
    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool, HashError> {
        let password = password.to_owned();
        let hash = hash.to_owned();
        let matches =
            task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false)).await?;
        Ok(matches)
    }

    /// Burns one verification against the dummy hash and always reports a
    /// mismatch. Used when the account lookup misses.
    pub async fn verify_missing(&self, password: &str) -> Result<bool, HashError> {
        let dummy = self.dummy_hash.clone();
        self.verify(password, &dummy).await?;
        Ok(false)
    }
}
