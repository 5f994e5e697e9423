//! Password hashing.

use argon2::password_hash::{self, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng};
use argon2::{Algorithm, Argon2, Params, Version};

use palette_core::PasswordHash;

use super::AuthError;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 1;

/// Work factor for new password hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashCost {
    /// Argon2id with the library's recommended parameters.
    #[default]
    Standard,
    /// Smallest legal Argon2id parameters. For tests and throwaway data only.
    Low,
}

impl HashCost {
    fn params(self) -> Result<Params, AuthError> {
        match self {
            Self::Standard => Ok(Params::default()),
            Self::Low => {
                Params::new(Params::MIN_M_COST, 1, 1, None).map_err(|_| AuthError::PasswordHash)
            }
        }
    }
}

impl std::str::FromStr for HashCost {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(Self::Standard),
            "low" => Ok(Self::Low),
            _ => Err(format!("invalid hash cost: {s} (expected standard or low)")),
        }
    }
}

/// Creates and checks Argon2id password hashes.
#[derive(Debug, Clone, Copy, Default)]
pub struct CredentialHasher {
    cost: HashCost,
}

impl CredentialHasher {
    /// Create a hasher producing hashes at `cost`.
    #[must_use]
    pub const fn new(cost: HashCost) -> Self {
        Self { cost }
    }

    /// Hash a password with a fresh random salt.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` for an empty password and
    /// `AuthError::PasswordHash` if hashing fails.
    pub fn hash(&self, password: &str) -> Result<PasswordHash, AuthError> {
        validate_password(password)?;

        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.cost.params()?);

        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| PasswordHash::new(hash.to_string()))
            .map_err(|_| AuthError::PasswordHash)
    }

    /// Check `password` against a stored hash.
    ///
    /// The hash carries its own parameters, so hashes made at any cost
    /// verify.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` on mismatch or if the stored
    /// hash is unreadable.
    pub fn verify(&self, password: &str, hash: &PasswordHash) -> Result<(), AuthError> {
        let parsed = password_hash::PasswordHash::new(hash.as_str())
            .map_err(|_| AuthError::InvalidCredentials)?;

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| AuthError::InvalidCredentials)
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(
            "password cannot be empty".to_owned(),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hasher = CredentialHasher::new(HashCost::Low);
        let hash = hasher.hash("sketch-42").unwrap();
        assert!(hash.as_str().starts_with("$argon2id$"));
        assert!(hasher.verify("sketch-42", &hash).is_ok());
        assert!(matches!(
            hasher.verify("sketch-43", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_same_password_gets_distinct_salts() {
        let hasher = CredentialHasher::new(HashCost::Low);
        assert_ne!(hasher.hash("pw").unwrap(), hasher.hash("pw").unwrap());
    }

    #[test]
    fn test_empty_password_rejected() {
        let hasher = CredentialHasher::new(HashCost::Low);
        assert!(matches!(hasher.hash(""), Err(AuthError::WeakPassword(_))));
    }

    #[test]
    fn test_garbage_hash_is_invalid_credentials() {
        let hasher = CredentialHasher::default();
        let stored = PasswordHash::new("plaintext".to_owned());
        assert!(matches!(
            hasher.verify("plaintext", &stored),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_hash_cost_from_str() {
        assert_eq!("low".parse::<HashCost>().unwrap(), HashCost::Low);
        assert!("fast".parse::<HashCost>().is_err());
    }
}
