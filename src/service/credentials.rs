use crate::config::SecurityConfig;
use crate::error::MazeError;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Argon2id hashing for account passwords (PHC strings).
#[derive(Debug, Clone)]
pub struct AccountHasher {
    params: Params,
    /// Hash with the configured cost, verified against when the account
    /// does not exist.
    dummy_hash: Arc<str>,
}

impl AccountHasher {
    pub fn new(cfg: &SecurityConfig) -> Result<Self, MazeError> {
        let params = Params::new(cfg.argon2_memory_kib, cfg.argon2_iterations, 1, None)
            .map_err(|e| MazeError::PasswordHash(e.to_string()))?;
        let mut hasher = Self {
            params,
            dummy_hash: Arc::from(""),
        };
        hasher.dummy_hash = hasher.hash(&new_session_token())?.into();
        Ok(hasher)
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash(&self, password: &str) -> Result<String, MazeError> {
        let mut salt = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt);
        let salt = SaltString::encode_b64(&salt)?;
        let hash = self.argon2().hash_password(password.as_bytes(), &salt)?;
        Ok(hash.to_string())
    }

    /// Verification uses the parameters embedded in the stored hash.
    pub fn verify(&self, password: &str, stored: &str) -> Result<bool, MazeError> {
        let parsed = PasswordHash::new(stored)?;
        Ok(self
            .argon2()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    /// Hashing is CPU bound; keep it off the async workers.
    pub async fn hash_blocking(&self, password: String) -> Result<String, MazeError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| MazeError::PasswordHash(format!("hashing task failed: {e}")))?
    }

    pub async fn verify_blocking(
        &self,
        password: String,
        stored: String,
    ) -> Result<bool, MazeError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &stored))
            .await
            .map_err(|e| MazeError::PasswordHash(format!("verify task failed: {e}")))?
    }

    /// Spend one verification on the dummy hash so an unknown email costs
    /// the same as a wrong password.
    pub async fn verify_dummy_blocking(&self, password: String) -> Result<(), MazeError> {
        self.verify_blocking(password, self.dummy_hash.to_string())
            .await
            .map(|_| ())
    }
}

/// New opaque session token (32 random bytes, url-safe base64).
pub fn new_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Only the SHA-256 of a session token is stored.
pub fn hash_session_token(token: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(token.as_bytes()))
}
