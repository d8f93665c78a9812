//! Secret types for values that must never reach logs.
//!
//! Re-exports the [`secrecy`] types used across the workspace. Anything that
//! would let a reader impersonate a member goes in one of these:
//!
//! - JWT signing secrets (access and refresh)
//! - Member passwords on their way to bcrypt
//! - Access tokens and the refresh cookie value held by a client session
//!
//! `SecretString` implements `Debug` with redaction, so structs deriving
//! `Debug` stay safe to log. The inner value is only reachable through
//! [`ExposeSecret::expose_secret`], which makes every use greppable.
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! let password = SecretString::from("Hunter2#pass");
//! assert!(!format!("{password:?}").contains("Hunter2"));
//! assert_eq!(password.expose_secret(), "Hunter2#pass");
//! ```

pub use secrecy::{ExposeSecret, SecretBox, SecretString};
