use argon2::{Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version};
use password_hash::{PasswordHash, SaltString};
#[cfg(test)]
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use super::CredentialError;
use crate::config::SecurityConfig;

/// Argon2id hasher with a work factor fixed at construction.
#[derive(Clone)]
pub struct PasswordHashing {
    params: Params,
    #[cfg(test)]
    verifications: Arc<AtomicUsize>,
}

impl PasswordHashing {
    pub fn new(security: &SecurityConfig) -> Result<Self, CredentialError> {
        let params = Params::new(
            security.argon2_memory_kib,
            security.argon2_iterations,
            security.argon2_parallelism,
            None,
        )
        .map_err(|e| CredentialError::Hashing(e.to_string()))?;

        Ok(Self {
            params,
            #[cfg(test)]
            verifications: Arc::default(),
        })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Salted hash in PHC string format.
    pub fn hash(&self, plaintext: &str) -> Result<String, CredentialError> {
        let mut salt_bytes = [0u8; 16];
        getrandom::getrandom(&mut salt_bytes).map_err(|e| CredentialError::Hashing(e.to_string()))?;
        let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| CredentialError::Hashing(e.to_string()))?;

        let phc = self
            .argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| CredentialError::Hashing(e.to_string()))?
            .to_string();
        Ok(phc)
    }

    /// Parameters are read back from the PHC string, so hashes made under an
    /// older work factor keep verifying.
    pub fn verify(&self, plaintext: &str, hashed: &str) -> bool {
        #[cfg(test)]
        self.verifications.fetch_add(1, Ordering::SeqCst);

        match PasswordHash::new(hashed) {
            Ok(parsed) => self.argon2().verify_password(plaintext.as_bytes(), &parsed).is_ok(),
            Err(_) => false,
        }
    }

    /// Calls to `verify`, shared across clones.
    #[cfg(test)]
    pub fn verifications(&self) -> usize {
        self.verifications.load(Ordering::SeqCst)
    }
}
