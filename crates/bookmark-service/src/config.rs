//! Bookmark service configuration.
//!
//! Configuration is loaded from environment variables. Token secrets are held
//! as `SecretString` and redacted in Debug output.

use common::jwt::{is_supported_algorithm, Algorithm};
use common::secret::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default access token lifetime (1 hour).
pub const DEFAULT_ACCESS_TOKEN_LIFETIME_SECONDS: i64 = 3600;

/// Default refresh token lifetime (7 days).
pub const DEFAULT_REFRESH_TOKEN_LIFETIME_SECONDS: i64 = 604_800;

/// Minimum length of each token signing secret in bytes.
pub const MIN_TOKEN_SECRET_BYTES: usize = 32;

/// Default bcrypt cost factor.
pub const DEFAULT_BCRYPT_COST: u32 = 12;

/// Minimum bcrypt cost accepted by the `bcrypt` crate.
pub const MIN_BCRYPT_COST: u32 = 4;

/// Maximum bcrypt cost accepted by the `bcrypt` crate.
pub const MAX_BCRYPT_COST: u32 = 31;

/// Token issuing and validation settings.
///
/// Immutable once loaded; handed to `TokenService::new`.
#[derive(Clone)]
pub struct TokenConfig {
    /// Value written to and required in the `iss` claim.
    pub issuer: String,

    /// HMAC algorithm used for both token kinds.
    pub algorithm: Algorithm,

    /// Signing secret for access tokens.
    pub access_token_secret: SecretString,

    /// Signing secret for refresh tokens. Never equal to the access secret.
    pub refresh_token_secret: SecretString,

    /// Access token lifetime in seconds.
    pub access_token_lifetime_seconds: i64,

    /// Refresh token lifetime in seconds.
    pub refresh_token_lifetime_seconds: i64,
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("issuer", &self.issuer)
            .field("algorithm", &self.algorithm)
            .field("access_token_secret", &"[REDACTED]")
            .field("refresh_token_secret", &"[REDACTED]")
            .field(
                "access_token_lifetime_seconds",
                &self.access_token_lifetime_seconds,
            )
            .field(
                "refresh_token_lifetime_seconds",
                &self.refresh_token_lifetime_seconds,
            )
            .finish()
    }
}

/// Bookmark service configuration.
#[derive(Clone)]
pub struct Config {
    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Token settings.
    pub token: TokenConfig,

    /// Bcrypt cost factor for member passwords.
    pub bcrypt_cost: u32,

    /// Browser origin allowed to call the API with credentials.
    pub cors_allowed_origin: Option<String>,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("bind_address", &self.bind_address)
            .field("token", &self.token)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("cors_allowed_origin", &self.cors_allowed_origin)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid token secret: {0}")]
    InvalidTokenSecret(String),

    #[error("JWT_ACCESS_TOKEN_SECRET and JWT_REFRESH_TOKEN_SECRET must differ")]
    IdenticalTokenSecrets,

    #[error("Invalid JWT algorithm: {0}")]
    InvalidAlgorithm(String),

    #[error("Invalid token lifetime: {0}")]
    InvalidTokenLifetime(String),

    #[error("Invalid bcrypt cost: {0}")]
    InvalidBcryptCost(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = required(vars, "DATABASE_URL")?;

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let issuer = required(vars, "JWT_ISSUER")?;

        let access_token_secret = token_secret(vars, "JWT_ACCESS_TOKEN_SECRET")?;
        let refresh_token_secret = token_secret(vars, "JWT_REFRESH_TOKEN_SECRET")?;
        if access_token_secret.expose_secret() == refresh_token_secret.expose_secret() {
            return Err(ConfigError::IdenticalTokenSecrets);
        }

        let algorithm = match vars.get("JWT_ALGORITHM") {
            Some(value) => parse_algorithm(value)?,
            None => Algorithm::HS256,
        };

        let access_token_lifetime_seconds = lifetime(
            vars,
            "JWT_ACCESS_TOKEN_LIFETIME_SECONDS",
            DEFAULT_ACCESS_TOKEN_LIFETIME_SECONDS,
        )?;
        let refresh_token_lifetime_seconds = lifetime(
            vars,
            "JWT_REFRESH_TOKEN_LIFETIME_SECONDS",
            DEFAULT_REFRESH_TOKEN_LIFETIME_SECONDS,
        )?;

        let bcrypt_cost = if let Some(value_str) = vars.get("BCRYPT_COST") {
            let value: u32 = value_str.parse().map_err(|e| {
                ConfigError::InvalidBcryptCost(format!(
                    "BCRYPT_COST must be a valid integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&value) {
                return Err(ConfigError::InvalidBcryptCost(format!(
                    "BCRYPT_COST must be between {} and {}, got {}",
                    MIN_BCRYPT_COST, MAX_BCRYPT_COST, value
                )));
            }

            value
        } else {
            DEFAULT_BCRYPT_COST
        };

        let cors_allowed_origin = vars
            .get("CORS_ALLOWED_ORIGIN")
            .filter(|origin| !origin.trim().is_empty())
            .cloned();

        Ok(Config {
            database_url,
            bind_address,
            token: TokenConfig {
                issuer,
                algorithm,
                access_token_secret,
                refresh_token_secret,
                access_token_lifetime_seconds,
                refresh_token_lifetime_seconds,
            },
            bcrypt_cost,
            cors_allowed_origin,
        })
    }
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .filter(|value| !value.is_empty())
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn token_secret(vars: &HashMap<String, String>, name: &str) -> Result<SecretString, ConfigError> {
    let secret = required(vars, name)?;

    if secret.len() < MIN_TOKEN_SECRET_BYTES {
        return Err(ConfigError::InvalidTokenSecret(format!(
            "{} must be at least {} bytes, got {}",
            name,
            MIN_TOKEN_SECRET_BYTES,
            secret.len()
        )));
    }

    Ok(SecretString::from(secret))
}

fn parse_algorithm(value: &str) -> Result<Algorithm, ConfigError> {
    let algorithm: Algorithm = value.parse().map_err(|_| {
        ConfigError::InvalidAlgorithm(format!("Unknown JWT_ALGORITHM '{}'", value))
    })?;

    if !is_supported_algorithm(algorithm) {
        return Err(ConfigError::InvalidAlgorithm(format!(
            "JWT_ALGORITHM must be one of HS256, HS384, HS512, got '{}'",
            value
        )));
    }

    Ok(algorithm)
}

fn lifetime(
    vars: &HashMap<String, String>,
    name: &str,
    default: i64,
) -> Result<i64, ConfigError> {
    let Some(value_str) = vars.get(name) else {
        return Ok(default);
    };

    let value: i64 = value_str.parse().map_err(|e| {
        ConfigError::InvalidTokenLifetime(format!(
            "{} must be a valid integer, got '{}': {}",
            name, value_str, e
        ))
    })?;

    if value <= 0 {
        return Err(ConfigError::InvalidTokenLifetime(format!(
            "{} must be positive, got {}",
            name, value
        )));
    }

    Ok(value)
}
