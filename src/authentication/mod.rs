pub mod authentication_actor;

use crate::error::Result;
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn generate() -> Self {
        Self(generate_uuid())
    }
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ResetToken(pub String);

impl ResetToken {
    pub fn generate() -> Self {
        Self(generate_uuid())
    }
}

pub fn generate_uuid() -> String {
    uuid::Uuid::new_v4().into()
}

/// Hashes `password` into an argon2 PHC string with a fresh salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(parsed_hash) => parsed_hash,
        Err(e) => {
            tracing::error!("Error parsing password hash: {:?}", e);
            return false;
        }
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("hunter2").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "hunter2"));
        assert!(!verify_password(&hash, "hunter3"));
    }

    #[test]
    fn test_hash_is_salted() {
        let first = hash_password("hunter2").unwrap();
        let second = hash_password("hunter2").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_verify_garbage_hash() {
        assert!(!verify_password("not a phc string", "hunter2"));
    }

    #[test]
    fn test_generated_ids_are_uuids() {
        let session_id = SessionId::generate();
        let reset_token = ResetToken::generate();
        assert!(uuid::Uuid::parse_str(&session_id.0).is_ok());
        assert!(uuid::Uuid::parse_str(&reset_token.0).is_ok());
        assert_ne!(session_id.0, reset_token.0);
    }
}
