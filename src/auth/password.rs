//! Password hashing and verification (Argon2id)
//!
//! Hashes are stored as PHC strings (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`),
//! so a hash keeps verifying after the configured cost changes.
//! Both operations are CPU-bound and run on the blocking pool.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString, rand_core::OsRng,
    },
};

use crate::config::PasswordHashConfig;
use crate::error::AppError;

/// Salted, slow one-way password hashing
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    /// Build a hasher from the configured cost parameters
    ///
    /// # Errors
    /// Returns `AppError::Config` when the parameters are outside argon2's limits.
    pub fn new(config: &PasswordHashConfig) -> Result<Self, AppError> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )
        .map_err(|e| AppError::Config(format!("auth.password_hash is invalid: {e}")))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password with a fresh random salt
    pub async fn hash(&self, password: &str) -> Result<String, AppError> {
        let argon2 = self.argon2();
        let password = password.to_owned();

        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            argon2
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| AppError::Encryption(format!("failed to hash password: {e}")))
        })
        .await
        .map_err(|e| AppError::Internal(e.into()))?
    }

    /// Check a password against a stored PHC string
    ///
    /// Returns `Ok(false)` on mismatch and an error only when the stored
    /// hash cannot be parsed.
    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        let argon2 = self.argon2();
        let password = password.to_owned();
        let hash = hash.to_owned();

        tokio::task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&hash)
                .map_err(|e| AppError::Encryption(format!("invalid password hash: {e}")))?;
            Ok(argon2.verify_password(password.as_bytes(), &parsed).is_ok())
        })
        .await
        .map_err(|e| AppError::Internal(e.into()))?
    }

    /// Spend roughly the time of one verification without a stored hash
    ///
    /// Used when no user matches, so response timing matches a wrong password.
    pub async fn equalize_timing(&self, password: &str) {
        if let Err(error) = self.hash(password).await {
            tracing::debug!(%error, "Timing equalization hash failed");
        }
    }
}
