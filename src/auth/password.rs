use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use rand::RngCore;

use crate::error::{CoreError, CoreResult};

pub fn hash_password(password: &str) -> CoreResult<String> {
    let mut salt_bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|err| CoreError::Internal(err.to_string()))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| CoreError::Internal(err.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> CoreResult<bool> {
    let parsed = PasswordHash::new(hash).map_err(|err| CoreError::Internal(err.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Hashing is deliberately slow, so it runs off the async workers.
pub(crate) async fn hash_password_blocking(password: String) -> CoreResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password)).await?
}

pub(crate) async fn verify_password_blocking(password: String, hash: String) -> CoreResult<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash)).await?
}
