use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use tracing::{error, warn};

#[cfg(test)]
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use crate::config::HashingConfig;
use crate::error::AppError;

/// Argon2id password hashing with costs fixed at startup.
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
    /// Hashed once with the configured costs; verified against when an
    /// account has no stored hash so both paths pay the same Argon2 work.
    decoy_hash: String,
    #[cfg(test)]
    verify_calls: Arc<AtomicUsize>,
}

impl CredentialHasher {
    pub fn new(cfg: &HashingConfig) -> anyhow::Result<Self> {
        let params = Params::new(cfg.memory_kib, cfg.iterations, cfg.parallelism, None)
            .map_err(|e| anyhow::anyhow!("invalid argon2 parameters: {e}"))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let salt = SaltString::generate(&mut OsRng);
        let decoy_hash = argon2
            .hash_password(b"decoy-password-never-issued", &salt)
            .map_err(|e| anyhow::anyhow!("argon2 decoy hash: {e}"))?
            .to_string();

        Ok(Self {
            argon2,
            decoy_hash,
            #[cfg(test)]
            verify_calls: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Returns a PHC string with a fresh random salt embedded.
    pub fn hash(&self, plain: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                AppError::Internal(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    /// Checks `plain` against the salt and parameters stored in `hash`.
    /// A malformed hash verifies as `false`.
    pub fn verify(&self, plain: &str, hash: &str) -> bool {
        #[cfg(test)]
        self.verify_calls.fetch_add(1, Ordering::SeqCst);

        let parsed = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "stored password hash is malformed");
                return false;
            }
        };
        self.argon2
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok()
    }

    /// Like [`verify`](Self::verify), but an absent hash still runs a full
    /// verification against the decoy and then reports `false`.
    pub fn verify_stored(&self, plain: &str, stored: Option<&str>) -> bool {
        match stored {
            Some(hash) => self.verify(plain, hash),
            None => {
                let _ = self.verify(plain, &self.decoy_hash);
                false
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
pub(crate) fn cheap_hasher() -> CredentialHasher {
    CredentialHasher::new(&HashingConfig {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    })
    .expect("valid test params")
}
