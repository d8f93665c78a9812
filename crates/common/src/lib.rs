//! Common utilities and types shared across the bookmark service and its clients.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for JWT utilities (codec, claims, validation)
pub mod jwt;

/// Module for the member session client with single-flight token refresh
pub mod session;
