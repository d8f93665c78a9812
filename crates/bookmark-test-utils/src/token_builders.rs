//! Builder patterns for test data construction
//!
//! Provides fluent APIs for creating test tokens signed with the fixture
//! secrets, including tokens the service must reject.

use crate::crypto_fixtures::{TEST_ACCESS_TOKEN_SECRET, TEST_ISSUER, TEST_REFRESH_TOKEN_SECRET};
use chrono::Utc;
use common::jwt::{encode_token, Algorithm, TokenClaims};

/// Builder for creating test JWT claims
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .for_member(42)
///     .issued_by("https://someone-else.test")
///     .sign_access();
/// ```
pub struct TestTokenBuilder {
    iss: String,
    sub: String,
    iat: i64,
    exp: i64,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults: test issuer, valid for one hour
    pub fn new() -> Self {
        let now = Utc::now().timestamp();
        Self {
            iss: TEST_ISSUER.to_string(),
            sub: "1".to_string(),
            iat: now,
            exp: now + 3600,
        }
    }

    /// Set the subject to a member id
    pub fn for_member(self, member_id: i64) -> Self {
        self.for_subject(&member_id.to_string())
    }

    /// Set the subject verbatim
    pub fn for_subject(mut self, subject: &str) -> Self {
        self.sub = subject.to_string();
        self
    }

    /// Set the issuer
    pub fn issued_by(mut self, issuer: &str) -> Self {
        self.iss = issuer.to_string();
        self
    }

    /// Set issued-at timestamp
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.iat = timestamp;
        self
    }

    /// Set expiration in seconds from now
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = Utc::now().timestamp() + seconds;
        self
    }

    /// Expire the token in the past, issued one hour before expiry
    pub fn expired_seconds_ago(mut self, seconds: i64) -> Self {
        self.exp = Utc::now().timestamp() - seconds;
        self.iat = self.exp - 3600;
        self
    }

    /// Build the claims
    pub fn build(self) -> TokenClaims {
        TokenClaims {
            iss: self.iss,
            sub: self.sub,
            iat: self.iat,
            exp: self.exp,
        }
    }

    /// Sign with the test access token secret
    pub fn sign_access(self) -> String {
        self.sign_with(TEST_ACCESS_TOKEN_SECRET, Algorithm::HS256)
    }

    /// Sign with the test refresh token secret
    pub fn sign_refresh(self) -> String {
        self.sign_with(TEST_REFRESH_TOKEN_SECRET, Algorithm::HS256)
    }

    /// Sign with an arbitrary secret and HMAC algorithm
    pub fn sign_with(self, secret: &str, algorithm: Algorithm) -> String {
        encode_token(&self.build(), secret.as_bytes(), algorithm)
            .expect("test token should encode")
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
