//! Bookmark service library
//!
//! Members register and log in, then manage their own tagged bookmarks.
//! Authentication uses short-lived access tokens sent as bearer tokens and a
//! rotating refresh token carried in an `HttpOnly` cookie.
//!
//! # Modules
//!
//! - `config` - Service configuration
//! - `cookies` - Refresh token cookie
//! - `crypto` - Password hashing
//! - `errors` - Error types
//! - `handlers` - HTTP request handlers
//! - `middleware` - Authorization gate and HTTP metrics
//! - `models` - Data models
//! - `observability` - Prometheus metrics
//! - `repositories` - Storage traits with Postgres and in-memory backends
//! - `routes` - Router and application state
//! - `services` - Business logic layer

pub mod config;
pub mod cookies;
pub mod crypto;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
