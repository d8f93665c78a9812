//! Member session client with single-flight token refresh.
//!
//! A [`Session`] carries a member's access token and refresh cookie and
//! attaches the token to every API request it sends. When the service answers
//! `401 Unauthorized`, the session refreshes the token and resends the
//! request, up to a bounded number of retries.
//!
//! # Features
//!
//! - Explicitly constructed, cloneable session object (no global state)
//! - Single-flight refresh: concurrent 401s for the same token trigger exactly
//!   one call to the refresh endpoint; the other requests wait for it and
//!   retry with the fresh token
//! - Refresh cookie rotation is tracked from `Set-Cookie` on every response
//! - Refresh failure or exhausted retries force a logout
//! - Observable state machine: `Idle -> Refreshing -> Retrying -> Idle`
//!
//! # Example
//!
//! ```rust,ignore
//! use common::session::{Session, SessionConfig};
//! use common::secret::SecretString;
//!
//! let session = Session::new(SessionConfig::new("https://bookmarks.example".to_string()))?;
//! let member_id = session.login("alice@example.com", &SecretString::from("Passw0rd#")).await?;
//!
//! let url = session.url("/api/v1/bookmarks");
//! let response = session.send(|http| http.get(&url)).await?;
//! ```
//!
//! # Security
//!
//! - Access token and refresh cookie are held as `SecretString`
//! - Neither value is ever logged
//! - The refresh cookie is only sent to the refresh endpoint

use crate::jwt::peek_subject;
use crate::secret::{ExposeSecret, SecretString};
use parking_lot::RwLock;
use reqwest::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, instrument, warn};

// =============================================================================
// Constants
// =============================================================================

/// Name of the cookie carrying the refresh token.
pub const REFRESH_COOKIE_NAME: &str = "jrt";

/// Default number of refresh-and-resend attempts per request.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default HTTP request timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connection timeout for HTTP client.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

const LOGIN_PATH: &str = "/api/v1/auth/login";
const REFRESH_PATH: &str = "/api/v1/auth/refresh";
const LOGOUT_PATH: &str = "/api/v1/auth/logout";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while using a session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Login rejected: wrong password (401).
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Login rejected: no member with that email (404).
    #[error("Member not found")]
    MemberNotFound,

    /// Login rejected: email or password missing (422).
    #[error("Email and password are required")]
    MissingCredentials,

    /// Transport failure.
    #[error("HTTP client error: {0}")]
    Http(String),

    /// Response body could not be understood.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Any other non-success status.
    #[error("Unexpected status: {0}")]
    UnexpectedStatus(u16),

    /// The refresh token was rejected or absent; local state was cleared.
    #[error("Session ended, log in again")]
    LoggedOut,

    /// The request stayed unauthorized after the maximum number of refreshes.
    #[error("Request still unauthorized after {0} token refreshes")]
    RetriesExhausted(u32),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

// =============================================================================
// State machine
// =============================================================================

/// Refresh coordination state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No refresh in flight.
    Idle,
    /// A refresh call is in flight; other 401s wait for it.
    Refreshing,
    /// A fresh token was obtained and requests are being resent.
    Retrying,
}

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for a member session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Service base URL (e.g., `https://bookmarks.example`).
    pub base_url: String,

    /// Refresh-and-resend attempts allowed per request.
    pub max_retries: u32,

    /// HTTP request timeout.
    pub http_timeout: Duration,
}

impl SessionConfig {
    /// Create a configuration with default retries and timeouts.
    #[must_use]
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    /// Set the retry bound.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the HTTP timeout.
    #[must_use]
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }
}

// =============================================================================
// Session
// =============================================================================

#[derive(Default)]
struct Credentials {
    access_token: Option<SecretString>,
    refresh_cookie: Option<SecretString>,
    /// Bumped whenever the access token changes; lets waiters detect that a
    /// refresh already happened for the token they used.
    generation: u64,
}

struct Inner {
    config: SessionConfig,
    http: Client,
    credentials: RwLock<Credentials>,
    refresh_lock: Mutex<()>,
    state: watch::Sender<SessionState>,
}

/// An authenticated member session.
///
/// Clones share the same credentials.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.inner.config.base_url)
            .field("logged_in", &self.is_logged_in())
            .field("credentials", &"[REDACTED]")
            .finish()
    }
}

/// Response envelope used by the bookmark API.
#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct TokenPayload {
    access_token: String,
}

impl Session {
    /// Create a logged-out session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Configuration` if the HTTP client cannot be built.
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        let http = Client::builder()
            .timeout(config.http_timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| SessionError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        let (state, _) = watch::channel(SessionState::Idle);

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                http,
                credentials: RwLock::new(Credentials::default()),
                refresh_lock: Mutex::new(()),
                state,
            }),
        })
    }

    /// Absolute URL for an API path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.inner.config.base_url, path)
    }

    /// Current refresh state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.inner.state.borrow()
    }

    /// Watch state transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Whether an access token is currently held.
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.inner.credentials.read().access_token.is_some()
    }

    /// Member id of the logged-in member, read from the access token.
    ///
    /// The token is NOT verified; this is for display only.
    #[must_use]
    pub fn authenticated_member_id(&self) -> Option<String> {
        self.inner
            .credentials
            .read()
            .access_token
            .as_ref()
            .and_then(|token| peek_subject(token.expose_secret()))
    }

    /// Log in and return the member id.
    ///
    /// # Errors
    ///
    /// - `SessionError::InvalidCredentials` - wrong password
    /// - `SessionError::MemberNotFound` - unknown email
    /// - `SessionError::MissingCredentials` - blank email or password
    /// - `SessionError::Http` / `InvalidResponse` / `UnexpectedStatus`
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<String, SessionError> {
        let response = self
            .inner
            .http
            .post(self.url(LOGIN_PATH))
            .json(&serde_json::json!({
                "email": email,
                "password": password.expose_secret(),
            }))
            .send()
            .await
            .map_err(|e| SessionError::Http(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::UNAUTHORIZED => return Err(SessionError::InvalidCredentials),
            StatusCode::NOT_FOUND => return Err(SessionError::MemberNotFound),
            StatusCode::UNPROCESSABLE_ENTITY => return Err(SessionError::MissingCredentials),
            status => return Err(SessionError::UnexpectedStatus(status.as_u16())),
        }

        let cookie = refresh_cookie_from(&response);
        let payload: Envelope<TokenPayload> = response
            .json()
            .await
            .map_err(|e| SessionError::InvalidResponse(e.to_string()))?;

        let member_id = peek_subject(&payload.data.access_token).ok_or_else(|| {
            SessionError::InvalidResponse("Access token carries no subject".to_string())
        })?;

        {
            let mut credentials = self.inner.credentials.write();
            credentials.access_token = Some(SecretString::from(payload.data.access_token));
            credentials.refresh_cookie = cookie;
            credentials.generation += 1;
        }

        info!(target: "common.session", "Logged in");
        Ok(member_id)
    }

    /// Clear local credentials and tell the service to drop the cookie.
    ///
    /// Local state is cleared even if the call fails.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Http` if the logout call cannot be made.
    #[instrument(skip_all)]
    pub async fn logout(&self) -> Result<(), SessionError> {
        self.clear_credentials();

        self.inner
            .http
            .post(self.url(LOGOUT_PATH))
            .send()
            .await
            .map_err(|e| SessionError::Http(e.to_string()))?;

        info!(target: "common.session", "Logged out");
        Ok(())
    }

    /// Send an authorized request, refreshing the token on `401`.
    ///
    /// `build` is called once per attempt, so it must be able to rebuild the
    /// request. Non-401 responses (including errors) are returned as-is.
    ///
    /// # Errors
    ///
    /// - `SessionError::LoggedOut` - refresh failed, session was cleared
    /// - `SessionError::RetriesExhausted` - still 401 after `max_retries` refreshes
    /// - `SessionError::Http` - transport failure
    pub async fn send<F>(&self, build: F) -> Result<Response, SessionError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let max_retries = self.inner.config.max_retries;
        let mut retries_left = max_retries;

        loop {
            let (token, generation) = {
                let credentials = self.inner.credentials.read();
                (credentials.access_token.clone(), credentials.generation)
            };

            let mut request = build(&self.inner.http);
            if let Some(token) = &token {
                request = request.header(AUTHORIZATION, format!("Bearer {}", token.expose_secret()));
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    self.settle_idle();
                    return Err(SessionError::Http(e.to_string()));
                }
            };

            if response.status() != StatusCode::UNAUTHORIZED {
                self.settle_idle();
                return Ok(response);
            }

            if retries_left == 0 {
                warn!(
                    target: "common.session",
                    max_retries = max_retries,
                    "Request unauthorized after maximum refreshes, logging out"
                );
                self.force_logout().await;
                return Err(SessionError::RetriesExhausted(max_retries));
            }
            retries_left -= 1;

            self.refresh_after(generation).await?;
            self.set_state(SessionState::Retrying);
        }
    }

    /// Go back to `Idle` unless another request is in the middle of a refresh.
    fn settle_idle(&self) {
        if self.inner.refresh_lock.try_lock().is_ok() {
            self.set_state(SessionState::Idle);
        }
    }

    /// Refresh the access token unless someone already replaced the token
    /// from `stale_generation`.
    async fn refresh_after(&self, stale_generation: u64) -> Result<(), SessionError> {
        let _guard = self.inner.refresh_lock.lock().await;

        let cookie = {
            let credentials = self.inner.credentials.read();
            if credentials.generation != stale_generation {
                debug!(target: "common.session", "Token already refreshed by a concurrent request");
                return if credentials.access_token.is_some() {
                    Ok(())
                } else {
                    Err(SessionError::LoggedOut)
                };
            }
            credentials.refresh_cookie.clone()
        };

        let Some(cookie) = cookie else {
            debug!(target: "common.session", "No refresh cookie held, logging out");
            self.force_logout().await;
            return Err(SessionError::LoggedOut);
        };

        self.set_state(SessionState::Refreshing);

        match self.request_refresh(&cookie).await {
            Ok((token, rotated_cookie)) => {
                let mut credentials = self.inner.credentials.write();
                credentials.access_token = Some(token);
                if rotated_cookie.is_some() {
                    credentials.refresh_cookie = rotated_cookie;
                }
                credentials.generation += 1;
                debug!(target: "common.session", "Access token refreshed");
                Ok(())
            }
            Err(e) => {
                warn!(target: "common.session", error = %e, "Token refresh failed, logging out");
                self.force_logout().await;
                Err(SessionError::LoggedOut)
            }
        }
    }

    async fn request_refresh(
        &self,
        cookie: &SecretString,
    ) -> Result<(SecretString, Option<SecretString>), SessionError> {
        let response = self
            .inner
            .http
            .post(self.url(REFRESH_PATH))
            .header(
                COOKIE,
                format!("{REFRESH_COOKIE_NAME}={}", cookie.expose_secret()),
            )
            .send()
            .await
            .map_err(|e| SessionError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SessionError::UnexpectedStatus(status.as_u16()));
        }

        let rotated_cookie = refresh_cookie_from(&response);
        let payload: Envelope<TokenPayload> = response
            .json()
            .await
            .map_err(|e| SessionError::InvalidResponse(e.to_string()))?;

        Ok((SecretString::from(payload.data.access_token), rotated_cookie))
    }

    /// Clear credentials and make a best-effort logout call.
    async fn force_logout(&self) {
        if let Err(e) = self.logout().await {
            warn!(target: "common.session", error = %e, "Logout call failed");
        }
        self.set_state(SessionState::Idle);
    }

    fn clear_credentials(&self) {
        let mut credentials = self.inner.credentials.write();
        credentials.access_token = None;
        credentials.refresh_cookie = None;
        credentials.generation += 1;
    }

    fn set_state(&self, state: SessionState) {
        self.inner.state.send_replace(state);
    }
}

/// Extract the refresh cookie value from `Set-Cookie` headers.
///
/// An empty value (the service clearing the cookie) yields `None`.
fn refresh_cookie_from(response: &Response) -> Option<SecretString> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|cookie| {
            let pair = cookie.split(';').next()?.trim();
            let (name, value) = pair.split_once('=')?;
            (name.trim() == REFRESH_COOKIE_NAME && !value.is_empty())
                .then(|| SecretString::from(value.to_string()))
        })
}

// =============================================================================
// Tests
// =============================================================================
