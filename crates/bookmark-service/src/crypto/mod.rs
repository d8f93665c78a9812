//! Password hashing for member credentials.

use crate::config::{MAX_BCRYPT_COST, MIN_BCRYPT_COST};
use crate::errors::BookmarkError;
use crate::observability::metrics::record_bcrypt_duration;
use common::secret::{ExposeSecret, SecretString};
use std::time::Instant;
use tracing::instrument;

/// Hash a member password with bcrypt.
///
/// # Errors
///
/// Returns `BookmarkError::Internal` if the cost is outside 4..=31 or hashing
/// fails.
#[instrument(skip_all)]
pub fn hash_password(password: &SecretString, cost: u32) -> Result<String, BookmarkError> {
    if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
        tracing::error!(target: "bookmark.crypto", cost = cost, "Invalid bcrypt cost");
        return Err(BookmarkError::Internal);
    }

    let start = Instant::now();
    let result = bcrypt::hash(password.expose_secret(), cost);
    record_bcrypt_duration("hash", start.elapsed());

    result.map_err(|e| {
        tracing::error!(target: "bookmark.crypto", error = %e, "Password hashing failed");
        BookmarkError::Internal
    })
}

/// Verify a member password against a stored bcrypt hash.
///
/// # Errors
///
/// Returns `BookmarkError::Internal` if the stored hash cannot be parsed.
#[instrument(skip_all)]
pub fn verify_password(password: &SecretString, hash: &str) -> Result<bool, BookmarkError> {
    let start = Instant::now();
    let result = bcrypt::verify(password.expose_secret(), hash);
    record_bcrypt_duration("verify", start.elapsed());

    result.map_err(|e| {
        tracing::error!(target: "bookmark.crypto", error = %e, "Password verification failed");
        BookmarkError::Internal
    })
}
