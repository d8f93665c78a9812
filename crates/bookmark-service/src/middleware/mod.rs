//! HTTP middleware.
//!
//! - `auth` - authorization gate for member routes
//! - `http_metrics` - request metrics for every response

pub mod auth;
pub mod http_metrics;

pub use auth::{require_member_auth, AuthState};
pub use http_metrics::http_metrics_middleware;
