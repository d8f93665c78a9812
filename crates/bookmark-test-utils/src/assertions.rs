//! Custom test assertions for expressive tests
//!
//! Inspect a token's header and claims without verifying its signature.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;

/// JWT header structure
#[derive(Debug, Deserialize)]
struct JwtHeader {
    pub alg: String,
    #[serde(default)]
    pub typ: Option<String>,
}

/// JWT claims structure
#[derive(Debug, Deserialize)]
struct JwtClaims {
    pub iss: String,
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

fn segment<T: for<'de> Deserialize<'de>>(token: &str, index: usize) -> T {
    let part = token
        .split('.')
        .nth(index)
        .unwrap_or_else(|| panic!("JWT has no segment {}", index));
    let bytes = URL_SAFE_NO_PAD
        .decode(part)
        .unwrap_or_else(|e| panic!("Failed to base64 decode JWT segment {}: {:?}", index, e));
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|e| panic!("Failed to parse JWT segment {} JSON: {:?}", index, e))
}

fn claims(token: &str) -> JwtClaims {
    segment(token, 1)
}

/// Custom assertions for tokens
///
/// # Example
/// ```rust,ignore
/// token
///     .assert_valid_jwt()
///     .assert_for_subject("42")
///     .assert_expires_in(3600);
/// ```
pub trait TokenAssertions {
    /// Assert three segments, an HS256 header and a decodable claim set
    fn assert_valid_jwt(&self) -> &Self;

    /// Assert the `iss` claim
    fn assert_issued_by(&self, issuer: &str) -> &Self;

    /// Assert that the token expires within the specified seconds (5s tolerance)
    fn assert_expires_in(&self, seconds: i64) -> &Self;

    /// Assert that the token is for the specified subject
    fn assert_for_subject(&self, subject: &str) -> &Self;
}

impl TokenAssertions for String {
    fn assert_valid_jwt(&self) -> &Self {
        let parts = self.split('.').count();
        assert_eq!(
            parts, 3,
            "JWT must have 3 parts (header.payload.signature), got {}",
            parts
        );

        let header: JwtHeader = segment(self, 0);
        assert_eq!(header.alg, "HS256", "Expected HS256 algorithm");
        if let Some(typ) = header.typ {
            assert_eq!(typ, "JWT", "Expected JWT type");
        }

        let claims = claims(self);
        assert!(
            claims.exp >= claims.iat,
            "Token expires ({}) before it was issued ({})",
            claims.exp,
            claims.iat
        );

        self
    }

    fn assert_issued_by(&self, issuer: &str) -> &Self {
        let claims = claims(self);
        assert_eq!(
            claims.iss, issuer,
            "Expected issuer '{}', got '{}'",
            issuer, claims.iss
        );
        self
    }

    fn assert_expires_in(&self, seconds: i64) -> &Self {
        let expires_in = claims(self).exp - chrono::Utc::now().timestamp();

        assert!(
            (expires_in - seconds).abs() <= 5,
            "Expected token to expire in {} seconds, but expires in {} seconds",
            seconds,
            expires_in
        );

        self
    }

    fn assert_for_subject(&self, subject: &str) -> &Self {
        let claims = claims(self);
        assert_eq!(
            claims.sub, subject,
            "Expected subject '{}', got '{}'",
            subject, claims.sub
        );
        self
    }
}
