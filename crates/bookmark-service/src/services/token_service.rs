//! Access and refresh token issuing, validation and rotation.
//!
//! Both token kinds share one claim shape and are distinguished only by the
//! secret that signs them, so an access token never validates as a refresh
//! token and vice versa.
//!
//! Every operation has an `_at(now)` variant taking the current Unix time;
//! the plain variants read the wall clock once and delegate.

use crate::config::TokenConfig;
use crate::observability::metrics::{record_token_issued, record_token_validation};
use chrono::{DateTime, Utc};
use common::jwt::{decode_token, encode_token, verify_claims, JwtError, TokenClaims};
use common::secret::ExposeSecret;
use std::fmt;
use tracing::instrument;

/// Authenticated identity resolved from a validated token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub subject_id: String,
}

impl Principal {
    /// The subject as a member id.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::Malformed` if the subject is not numeric.
    pub fn member_id(&self) -> Result<i64, JwtError> {
        self.subject_id.parse().map_err(|_| JwtError::Malformed)
    }
}

/// A freshly signed refresh token and its expiry.
#[derive(Clone)]
pub struct IssuedRefreshToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for IssuedRefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedRefreshToken")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Result of a successful refresh: a new token pair for the same subject.
#[derive(Clone)]
pub struct RotatedTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Expiry of `refresh_token`.
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for RotatedTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RotatedTokens")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    fn as_str(self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

/// Issues and validates member tokens under an immutable configuration.
#[derive(Debug, Clone)]
pub struct TokenService {
    config: TokenConfig,
}

impl TokenService {
    pub fn new(config: TokenConfig) -> Self {
        Self { config }
    }

    /// Access token lifetime in seconds (`expires_in`).
    pub fn access_token_lifetime(&self) -> i64 {
        self.config.access_token_lifetime_seconds
    }

    /// Refresh token lifetime in seconds (cookie `Max-Age`).
    pub fn refresh_token_lifetime(&self) -> i64 {
        self.config.refresh_token_lifetime_seconds
    }

    pub fn issue_access_token(&self, subject_id: &str) -> Result<String, JwtError> {
        self.issue_access_token_at(subject_id, Utc::now().timestamp())
    }

    pub fn issue_access_token_at(&self, subject_id: &str, now: i64) -> Result<String, JwtError> {
        self.issue(TokenKind::Access, subject_id, now)
            .map(|(token, _)| token)
    }

    pub fn validate_access_token(&self, token: &str) -> Result<Principal, JwtError> {
        self.validate_access_token_at(token, Utc::now().timestamp())
    }

    #[instrument(skip_all, name = "bookmark.token.validate_access")]
    pub fn validate_access_token_at(&self, token: &str, now: i64) -> Result<Principal, JwtError> {
        self.validate(TokenKind::Access, token, now)
    }

    pub fn issue_refresh_token(&self, subject_id: &str) -> Result<IssuedRefreshToken, JwtError> {
        self.issue_refresh_token_at(subject_id, Utc::now().timestamp())
    }

    pub fn issue_refresh_token_at(
        &self,
        subject_id: &str,
        now: i64,
    ) -> Result<IssuedRefreshToken, JwtError> {
        let (token, exp) = self.issue(TokenKind::Refresh, subject_id, now)?;

        Ok(IssuedRefreshToken {
            token,
            expires_at: expiry(exp)?,
        })
    }

    pub fn validate_refresh_token(&self, token: &str) -> Result<Principal, JwtError> {
        self.validate_refresh_token_at(token, Utc::now().timestamp())
    }

    #[instrument(skip_all, name = "bookmark.token.validate_refresh")]
    pub fn validate_refresh_token_at(&self, token: &str, now: i64) -> Result<Principal, JwtError> {
        self.validate(TokenKind::Refresh, token, now)
    }

    pub fn rotate(&self, refresh_token: &str) -> Result<RotatedTokens, JwtError> {
        self.rotate_at(refresh_token, Utc::now().timestamp())
    }

    /// Validate `refresh_token` and issue a new pair for its subject.
    ///
    /// The same `now` is used for validation and for both new tokens. The new
    /// refresh token always expires strictly after the one it replaces, so a
    /// refresh in the same second as the previous issue still yields a
    /// different cookie.
    #[instrument(skip_all, name = "bookmark.token.rotate")]
    pub fn rotate_at(&self, refresh_token: &str, now: i64) -> Result<RotatedTokens, JwtError> {
        let previous = self.verified_claims(TokenKind::Refresh, refresh_token, now)?;
        let access_token = self.issue_access_token_at(&previous.sub, now)?;

        let mut claims = TokenClaims::new(
            &self.config.issuer,
            &previous.sub,
            now,
            self.lifetime(TokenKind::Refresh),
        );
        claims.exp = claims.exp.max(previous.exp.saturating_add(1));
        let refresh_token = self.sign(TokenKind::Refresh, &claims)?;

        Ok(RotatedTokens {
            access_token,
            refresh_token,
            expires_at: expiry(claims.exp)?,
        })
    }

    fn secret(&self, kind: TokenKind) -> &[u8] {
        match kind {
            TokenKind::Access => self.config.access_token_secret.expose_secret().as_bytes(),
            TokenKind::Refresh => self.config.refresh_token_secret.expose_secret().as_bytes(),
        }
    }

    fn lifetime(&self, kind: TokenKind) -> i64 {
        match kind {
            TokenKind::Access => self.config.access_token_lifetime_seconds,
            TokenKind::Refresh => self.config.refresh_token_lifetime_seconds,
        }
    }

    fn issue(&self, kind: TokenKind, subject_id: &str, now: i64) -> Result<(String, i64), JwtError> {
        let claims = TokenClaims::new(&self.config.issuer, subject_id, now, self.lifetime(kind));
        let token = self.sign(kind, &claims)?;
        Ok((token, claims.exp))
    }

    fn sign(&self, kind: TokenKind, claims: &TokenClaims) -> Result<String, JwtError> {
        let token = encode_token(claims, self.secret(kind), self.config.algorithm).map_err(|e| {
            tracing::error!(
                target: "bookmark.token",
                token_kind = kind.as_str(),
                error = %e,
                "Token signing failed"
            );
            e
        })?;

        record_token_issued(kind.as_str());
        Ok(token)
    }

    fn validate(&self, kind: TokenKind, token: &str, now: i64) -> Result<Principal, JwtError> {
        self.verified_claims(kind, token, now).map(|claims| Principal {
            subject_id: claims.sub,
        })
    }

    fn verified_claims(
        &self,
        kind: TokenKind,
        token: &str,
        now: i64,
    ) -> Result<TokenClaims, JwtError> {
        let result = decode_token(token, self.secret(kind), self.config.algorithm)
            .and_then(|claims| verify_claims(&claims, &self.config.issuer, now).map(|()| claims));

        match result {
            Ok(claims) => {
                record_token_validation(kind.as_str(), "success", None);
                Ok(claims)
            }
            Err(e) => {
                record_token_validation(kind.as_str(), "error", Some(e.category()));
                tracing::debug!(
                    target: "bookmark.token",
                    token_kind = kind.as_str(),
                    error_category = e.category(),
                    "Token rejected"
                );
                Err(e)
            }
        }
    }
}

fn expiry(exp: i64) -> Result<DateTime<Utc>, JwtError> {
    DateTime::from_timestamp(exp, 0)
        .ok_or_else(|| JwtError::Unexpected(format!("Refresh expiry out of range: {exp}")))
}
