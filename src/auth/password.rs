//! Password hashing and reset tokens.

use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::AppError;

pub const MIN_PASSWORD_LEN: usize = 8;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash_with_cost(password, bcrypt::DEFAULT_COST)
}

pub(crate) fn hash_with_cost(password: &str, cost: u32) -> Result<String, AppError> {
    bcrypt::hash(password, cost).map_err(|e| AppError::Internal {
        operation: format!("hash password: {e}"),
    })
}

/// A hash bcrypt cannot parse never matches.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match bcrypt::verify(password, hash) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!("Stored password hash is unreadable: {e}");
            false
        }
    }
}

pub fn ensure_strong_enough(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// 256 bits from the OS-seeded CSPRNG, hex encoded.
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Reset tokens are stored as digests so a leaked settings row cannot be replayed.
pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
