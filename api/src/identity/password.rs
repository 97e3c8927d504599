use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};

use crate::error::AppError;

pub fn hash(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("argon2 hash failed: {e}")))?
        .to_string();
    Ok(hash)
}

pub fn verify(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hash_then_verify_roundtrip() {
        let hash = hash("hunter2").unwrap();
        assert!(verify("hunter2", &hash));
        assert!(!verify("hunter3", &hash));
    }

    #[test]
    fn verify_rejects_malformed_hashes() {
        assert!(!verify("hunter2", "not-a-phc-string"));
    }
}
