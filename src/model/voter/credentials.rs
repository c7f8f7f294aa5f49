use std::fmt::{Debug, Formatter};

use argon2::Config;
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Length of the passwords issued on recovery.
pub const RECOVERED_PASSWORD_LENGTH: usize = 10;

const ACTIVATION_TOKEN_LENGTH: usize = 32;

const PASSWORD_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*";

/// An encoded argon2 password hash.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialHash(String);

impl CredentialHash {
    /// Hash a plaintext password with a fresh random salt.
    pub fn new(password: &str) -> Result<Self> {
        // 16 bytes is the recommended salt length for argon2.
        let mut salt = [0_u8; 16];
        rand::thread_rng().fill(&mut salt);
        let encoded = argon2::hash_encoded(password.as_bytes(), &salt, &Config::default())?;
        Ok(Self(encoded))
    }

    /// Check whether the given password is correct.
    /// A malformed stored hash never verifies.
    pub fn verify(&self, password: &str) -> bool {
        argon2::verify_encoded(&self.0, password.as_bytes()).unwrap_or(false)
    }
}

impl Debug for CredentialHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "CredentialHash(..)")
    }
}

/// A single-use token that activates a newly registered account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivationToken(String);

impl ActivationToken {
    pub fn generate() -> Self {
        let token = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(ACTIVATION_TOKEN_LENGTH)
            .map(char::from)
            .collect();
        Self(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ActivationToken {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

/// Generate a random password of exactly `length` characters.
pub fn generate_password(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(PASSWORD_CHARSET[rng.gen_range(0..PASSWORD_CHARSET.len())]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_verifies_only_its_password() {
        let hash = CredentialHash::new("P@ssw0rd").unwrap();
        assert!(hash.verify("P@ssw0rd"));
        assert!(!hash.verify("PASSW0RD"));
        assert!(!hash.verify(""));
        // Salted, so hashing twice differs.
        assert_ne!(hash, CredentialHash::new("P@ssw0rd").unwrap());
    }

    #[test]
    fn malformed_hash_never_verifies() {
        let hash = CredentialHash("not an argon2 hash".to_string());
        assert!(!hash.verify("not an argon2 hash"));
    }

    #[test]
    fn generated_passwords_have_requested_length() {
        for length in [0, 1, RECOVERED_PASSWORD_LENGTH, 64] {
            let password = generate_password(length);
            assert_eq!(password.chars().count(), length);
            assert!(password.bytes().all(|b| PASSWORD_CHARSET.contains(&b)));
        }
        assert_ne!(generate_password(32), generate_password(32));
    }

    #[test]
    fn activation_tokens_are_random() {
        let token = ActivationToken::generate();
        assert_eq!(token.as_str().len(), ACTIVATION_TOKEN_LENGTH);
        assert!(token.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, ActivationToken::generate());
    }
}
