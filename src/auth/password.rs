//! Password hashing (argon2id, PHC strings) and the signup password policy.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tracing::error;

use crate::error::AppError;
use crate::models::UserRecord;

pub const MIN_PASSWORD_LEN: usize = 8;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("failed to hash password: {}", e);
            AppError::InternalServerError
        })
}

/// `false` for a mismatch and for a hash that cannot be parsed.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            error!("invalid stored password hash: {}", e);
            false
        }
    }
}

/// Check `password` against whatever credential the record carries.
/// Comparison is case-sensitive either way.
pub fn verify_user(user: &UserRecord, password: &str) -> bool {
    match (&user.password_hash, &user.password) {
        (Some(hash), _) => verify_password(password, hash),
        (None, Some(plain)) => plain == password,
        (None, None) => false,
    }
}

/// Length and confirmation rules shared by signup and password change.
pub fn check_new_password(password: &str, confirm: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if password != confirm {
        return Err(AppError::Validation("Passwords do not match".to_string()));
    }
    Ok(())
}
