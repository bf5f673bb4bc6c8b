// ============================
// crates/backend-lib/src/auth/password.rs
// ============================
//! Password hashing and verification.
use crate::error::AppError;
use scrypt::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Params, Scrypt,
};
use zeroize::Zeroize;

/// scrypt hasher with a work factor fixed at process start.
///
/// Each `hash` call draws a fresh random salt, so two hashes of the
/// same input never match. Verification is constant-time, delegated to
/// the `password_hash` comparison.
#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    /// Build a hasher from configured cost parameters. Invalid
    /// parameters are a configuration error, fatal at startup.
    pub fn new(log_n: u8, r: u32, p: u32) -> Result<Self, AppError> {
        let params = Params::new(log_n, r, p, Params::RECOMMENDED_LEN)
            .map_err(|e| AppError::Config(format!("invalid scrypt parameters: {e}")))?;
        Ok(Self { params })
    }

    /// Hash a password with a fresh random salt
    pub fn hash(&self, plain: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Scrypt
            .hash_password_customized(plain.as_bytes(), None, None, self.params, &salt)
            .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))?
            .to_string();
        Ok(hash)
    }

    /// Hash a password and zeroize the plaintext
    pub fn hash_secure(&self, plain: &mut String) -> Result<String, AppError> {
        let hash = self.hash(plain)?;
        plain.zeroize();
        Ok(hash)
    }

    /// Verify a password against a stored hash.
    ///
    /// A well-formed hash that does not match yields `Ok(false)`; a
    /// stored hash that fails to parse is a distinct `CorruptHash`
    /// error, not a silent mismatch.
    pub fn verify(&self, plain: &str, hash: &str) -> Result<bool, AppError> {
        let parsed_hash = PasswordHash::new(hash).map_err(|_| AppError::CorruptHash)?;
        Ok(Scrypt
            .verify_password(plain.as_bytes(), &parsed_hash)
            .is_ok())
    }
}
