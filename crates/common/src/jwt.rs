//! JWT codec and claim validation shared by the bookmark service and its clients.
//!
//! This module provides:
//! - The claim set carried by both access and refresh tokens
//! - The token codec (`encode_token` / `decode_token`) over HMAC algorithms
//! - The claim validator (`verify_claims`) for issuer and temporal checks
//! - An unverified subject peek for clients that only need to display it
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing
//! - Only HMAC (`HS256`, `HS384`, `HS512`) algorithms are accepted, and the
//!   token header must name exactly the configured algorithm
//! - Decoding fails closed: any structural or signature problem yields an
//!   error, never a partially trusted claim set
//! - The `sub` field in [`TokenClaims`] is redacted in Debug output
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{decode_token, verify_claims};
//!
//! let claims = decode_token(token, secret, Algorithm::HS256)?;
//! verify_claims(&claims, "https://bookmarks.example", now_unix_seconds)?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use jsonwebtoken::Algorithm;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Tokens larger than this are rejected before base64 decoding or signature
/// verification. Typical tokens issued by this service are under 300 bytes.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// HMAC algorithms accepted for signing.
pub const SUPPORTED_ALGORITHMS: [Algorithm; 3] =
    [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

// =============================================================================
// Error Types
// =============================================================================

/// Errors produced by the token codec and the claim validator.
///
/// Each variant maps to a distinct caller-visible outcome. Messages are
/// deliberately short and never include token contents.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtError {
    /// Token is not a structurally valid JWT (size, segments, base64, JSON, claims).
    #[error("Token is malformed")]
    Malformed,

    /// Signature does not verify with the configured secret and algorithm.
    #[error("Token signature is invalid")]
    SignatureInvalid,

    /// `iss` does not equal the configured issuer.
    #[error("Token issuer is invalid")]
    IssuerMismatch,

    /// `iat` lies in the future.
    #[error("Token is not valid yet")]
    NotYetValid,

    /// `exp` lies in the past.
    #[error("Token has expired")]
    Expired,

    /// Anything outside the known failure kinds (e.g. encoder failure).
    #[error("Unexpected token failure: {0}")]
    Unexpected(String),
}

impl JwtError {
    /// Bounded label for metrics and structured logs.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            JwtError::Malformed => "malformed",
            JwtError::SignatureInvalid => "signature_invalid",
            JwtError::IssuerMismatch => "issuer_mismatch",
            JwtError::NotYetValid => "not_yet_valid",
            JwtError::Expired => "expired",
            JwtError::Unexpected(_) => "unexpected",
        }
    }
}

// =============================================================================
// Claims Types
// =============================================================================

/// Claim set carried by access and refresh tokens.
///
/// The two token kinds share this shape; they are told apart only by the
/// secret they are signed with.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Issuer (service base URL).
    pub iss: String,

    /// Subject (member identifier) - redacted in Debug output.
    pub sub: String,

    /// Issued-at timestamp (Unix epoch seconds).
    pub iat: i64,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,
}

impl fmt::Debug for TokenClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenClaims")
            .field("iss", &self.iss)
            .field("sub", &"[REDACTED]")
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .finish()
    }
}

impl TokenClaims {
    /// Build a claim set issued at `now` that expires after `lifetime_seconds`.
    #[must_use]
    pub fn new(issuer: &str, subject: &str, now: i64, lifetime_seconds: i64) -> Self {
        Self {
            iss: issuer.to_string(),
            sub: subject.to_string(),
            iat: now,
            exp: now.saturating_add(lifetime_seconds),
        }
    }
}

// =============================================================================
// Token Codec
// =============================================================================

/// Returns `true` if `algorithm` is one of the supported HMAC schemes.
#[must_use]
pub fn is_supported_algorithm(algorithm: Algorithm) -> bool {
    SUPPORTED_ALGORITHMS.contains(&algorithm)
}

/// Sign `claims` with `secret` using `algorithm`.
///
/// # Errors
///
/// Returns `JwtError::Unexpected` if the algorithm is not an HMAC scheme or
/// the encoder fails.
pub fn encode_token(
    claims: &TokenClaims,
    secret: &[u8],
    algorithm: Algorithm,
) -> Result<String, JwtError> {
    if !is_supported_algorithm(algorithm) {
        return Err(JwtError::Unexpected(format!(
            "Unsupported signing algorithm: {algorithm:?}"
        )));
    }

    encode(
        &Header::new(algorithm),
        claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| JwtError::Unexpected(format!("Token encoding failed: {e}")))
}

/// Verify the signature of `token` and return its claims.
///
/// Temporal and issuer checks are NOT performed here; run [`verify_claims`]
/// on the result.
///
/// # Errors
///
/// - `JwtError::Malformed` - oversized token, bad structure, or missing claims
/// - `JwtError::SignatureInvalid` - wrong secret or algorithm mismatch
pub fn decode_token(
    token: &str,
    secret: &[u8],
    algorithm: Algorithm,
) -> Result<TokenClaims, JwtError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum"
        );
        return Err(JwtError::Malformed);
    }

    if !is_supported_algorithm(algorithm) {
        return Err(JwtError::Unexpected(format!(
            "Unsupported signing algorithm: {algorithm:?}"
        )));
    }

    let mut validation = Validation::new(algorithm);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<TokenClaims>(token, &DecodingKey::from_secret(secret), &validation)
        .map_err(|e| {
            let mapped = match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    JwtError::SignatureInvalid
                }
                _ => JwtError::Malformed,
            };
            tracing::debug!(target: "common.jwt", error = %e, "Token decode failed");
            mapped
        })?;

    Ok(data.claims)
}

// =============================================================================
// Claim Validator
// =============================================================================

/// Check issuer, issued-at and expiry against `now` (Unix seconds).
///
/// Checks run in this order and the first failure is reported:
/// 1. `iss` equals `expected_issuer` exactly
/// 2. `iat <= now`
/// 3. `exp >= now` (a token expiring this very second is still valid)
///
/// # Errors
///
/// `JwtError::IssuerMismatch`, `JwtError::NotYetValid` or `JwtError::Expired`.
pub fn verify_claims(
    claims: &TokenClaims,
    expected_issuer: &str,
    now: i64,
) -> Result<(), JwtError> {
    if claims.iss != expected_issuer {
        return Err(JwtError::IssuerMismatch);
    }

    if claims.iat > now {
        tracing::debug!(
            target: "common.jwt",
            iat = claims.iat,
            now = now,
            "Token rejected: iat is in the future"
        );
        return Err(JwtError::NotYetValid);
    }

    if claims.exp < now {
        return Err(JwtError::Expired);
    }

    Ok(())
}

// =============================================================================
// Unverified access
// =============================================================================

#[derive(Deserialize)]
struct SubjectOnly {
    sub: String,
}

/// Read the `sub` claim WITHOUT verifying the signature.
///
/// Clients use this to learn which member they are logged in as. Never use
/// the result for an authorization decision.
#[must_use]
pub fn peek_subject(token: &str) -> Option<String> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        return None;
    }

    let mut parts = token.split('.');
    let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => return None,
    };

    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: SubjectOnly = serde_json::from_slice(&bytes).ok()?;
    Some(claims.sub)
}
