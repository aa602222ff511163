//! Password hashing using Argon2id.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, Version};
use argon2::{PasswordHasher as _, PasswordVerifier as _};
use tracing::{error, warn};

use crate::config::PasswordConfig;

/// Salted one-way hashing of user passwords.
///
/// New hashes use the configured cost. Verification reads the algorithm,
/// version and cost back out of the stored PHC string, so hashes produced
/// under an older cost keep verifying after the config is raised.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    pub fn new(config: &PasswordConfig) -> Result<Self, String> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )
        .map_err(|e| format!("Invalid argon2 parameters: {}", e))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash `password` with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String, String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| format!("Failed to hash password: {}", e))
    }

    /// Returns false on mismatch and on a malformed stored hash.
    pub fn verify(&self, password: &str, stored_hash: &str) -> bool {
        let parsed = match PasswordHash::new(stored_hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Stored password hash is malformed: {}", e);
                return false;
            }
        };
        self.argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    /// [`hash`](Self::hash) on the blocking pool, for use from request handlers.
    pub async fn spawn_hash(&self, password: &str) -> Result<String, String> {
        let hasher = self.clone();
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| format!("Password hashing task failed: {}", e))?
    }

    /// [`verify`](Self::verify) on the blocking pool. A failed task is a mismatch.
    pub async fn spawn_verify(&self, password: &str, stored_hash: &str) -> bool {
        let hasher = self.clone();
        let password = password.to_owned();
        let stored_hash = stored_hash.to_owned();
        match tokio::task::spawn_blocking(move || hasher.verify(&password, &stored_hash)).await {
            Ok(matches) => matches,
            Err(e) => {
                error!("Password verification task failed: {}", e);
                false
            }
        }
    }
}
