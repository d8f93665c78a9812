//! Deterministic fixtures for testing
//!
//! Fixed token secrets, issuer and config so tokens built in tests validate
//! against a server spawned with `test_config()`.

use bookmark_service::config::{
    Config, TokenConfig, DEFAULT_ACCESS_TOKEN_LIFETIME_SECONDS,
    DEFAULT_REFRESH_TOKEN_LIFETIME_SECONDS, MIN_BCRYPT_COST,
};
use common::jwt::Algorithm;
use common::secret::SecretString;

/// Issuer used by every test server.
pub const TEST_ISSUER: &str = "https://bookmarks.test";

/// Access token signing secret (32+ bytes).
pub const TEST_ACCESS_TOKEN_SECRET: &str = "test-access-secret-0123456789abcdefghij";

/// Refresh token signing secret (32+ bytes, differs from the access secret).
pub const TEST_REFRESH_TOKEN_SECRET: &str = "test-refresh-secret-0123456789abcdefghi";

/// Lowest bcrypt cost, keeps registration fast.
pub const TEST_BCRYPT_COST: u32 = MIN_BCRYPT_COST;

/// Satisfies the password strength rules.
pub const TEST_PASSWORD: &str = "Passw0rd#";

/// Token settings matching the fixed test secrets.
pub fn test_token_config() -> TokenConfig {
    TokenConfig {
        issuer: TEST_ISSUER.to_string(),
        algorithm: Algorithm::HS256,
        access_token_secret: SecretString::from(TEST_ACCESS_TOKEN_SECRET),
        refresh_token_secret: SecretString::from(TEST_REFRESH_TOKEN_SECRET),
        access_token_lifetime_seconds: DEFAULT_ACCESS_TOKEN_LIFETIME_SECONDS,
        refresh_token_lifetime_seconds: DEFAULT_REFRESH_TOKEN_LIFETIME_SECONDS,
    }
}

/// Service config for an in-process test server.
pub fn test_config() -> Config {
    Config {
        database_url: String::new(), // Not used by the in-memory store
        bind_address: "127.0.0.1:0".to_string(),
        token: test_token_config(),
        bcrypt_cost: TEST_BCRYPT_COST,
        cors_allowed_origin: None,
    }
}
