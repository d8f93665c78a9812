//! # Bookmark Test Utilities
//!
//! Shared test utilities for the bookmark service.
//!
//! This crate provides:
//! - Fixed token secrets and a ready-made `Config` (crypto_fixtures)
//! - Claim builders signed with the test secrets (TestTokenBuilder)
//! - Server test harness (TestBookmarkServer for E2E tests)
//! - Custom assertions (TokenAssertions trait)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bookmark_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let server = TestBookmarkServer::spawn().await?;
//!     let member_id = server.register_member("alice@example.com").await?;
//!
//!     let token = TestTokenBuilder::new()
//!         .for_member(member_id)
//!         .expired_seconds_ago(60)
//!         .sign_access();
//!
//!     token.assert_valid_jwt().assert_for_subject(&member_id.to_string());
//!     Ok(())
//! }
//! ```

pub mod assertions;
pub mod crypto_fixtures;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use assertions::*;
pub use crypto_fixtures::*;
pub use server_harness::*;
pub use token_builders::*;
