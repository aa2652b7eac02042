// Password hashing and verification

use crate::error::ApiError;

/// Work factor used when none is configured
pub const DEFAULT_SALT_ROUNDS: u32 = 10;

/// Hashing primitive injected into the authentication service
pub trait PasswordHasher: Send + Sync {
    /// Hash `plaintext` with a fresh salt at the given work factor
    fn hash(&self, plaintext: &str, rounds: u32) -> Result<String, ApiError>;

    /// Check `plaintext` against a stored hash
    fn verify(&self, plaintext: &str, hash: &str) -> Result<bool, ApiError>;
}

/// bcrypt-backed hasher; verification compares digests in constant time
#[derive(Debug, Clone, Copy, Default)]
pub struct BcryptHasher;

impl PasswordHasher for BcryptHasher {
    fn hash(&self, plaintext: &str, rounds: u32) -> Result<String, ApiError> {
        bcrypt::hash(plaintext, rounds)
            .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))
    }

    fn verify(&self, plaintext: &str, hash: &str) -> Result<bool, ApiError> {
        match bcrypt::verify(plaintext, hash) {
            Ok(matches) => Ok(matches),
            // a stored value that is not a bcrypt hash can never match
            Err(bcrypt::BcryptError::InvalidHash(_))
            | Err(bcrypt::BcryptError::InvalidPrefix(_))
            | Err(bcrypt::BcryptError::InvalidCost(_)) => Ok(false),
            Err(e) => Err(ApiError::Internal(format!(
                "Password verification failed: {}",
                e
            ))),
        }
    }
}
