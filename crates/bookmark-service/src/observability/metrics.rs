//! Metrics definitions for the bookmark service
//!
//! All metrics follow Prometheus naming conventions:
//! - `bookmark_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `token_kind`: 2 values (access, refresh)
//! - `status`: 2 values (success, error)
//! - `error_category`: bounded by `JwtError::category` plus `none`
//! - `outcome`: bounded by login outcomes (success, invalid_credentials, unknown_member, ...)
//! - `operation`: 2 values (hash, verify)
//! - `path`: known routes, dynamic ids replaced by `{id}`

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the Prometheus recorder and return the handle `/metrics` renders.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("bookmark_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // cost 12 hashes take around 250ms
        .set_buckets_for_metric(
            Matcher::Prefix("bookmark_bcrypt".to_string()),
            &[0.005, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.000],
        )
        .map_err(|e| format!("Failed to set bcrypt buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// Token Metrics
// ============================================================================

/// Record a token being issued
///
/// Metric: `bookmark_token_issued_total`
/// Labels: `token_kind`
pub fn record_token_issued(token_kind: &str) {
    counter!("bookmark_token_issued_total", "token_kind" => token_kind.to_string()).increment(1);
}

/// Record token validation result
///
/// Metric: `bookmark_token_validations_total`
/// Labels: `token_kind`, `status`, `error_category`
pub fn record_token_validation(token_kind: &str, status: &str, error_category: Option<&str>) {
    let category = error_category.unwrap_or("none");
    counter!("bookmark_token_validations_total",
        "token_kind" => token_kind.to_string(),
        "status" => status.to_string(),
        "error_category" => category.to_string()
    )
    .increment(1);
}

// ============================================================================
// Login Metrics
// ============================================================================

/// Record a login attempt
///
/// Metric: `bookmark_login_attempts_total`
/// Labels: `outcome`
pub fn record_login_attempt(outcome: &str) {
    counter!("bookmark_login_attempts_total", "outcome" => outcome.to_string()).increment(1);
}

// ============================================================================
// Crypto Metrics
// ============================================================================

/// Record bcrypt operation duration
///
/// Metric: `bookmark_bcrypt_duration_seconds`
/// Labels: `operation` (hash, verify)
pub fn record_bcrypt_duration(operation: &str, duration: Duration) {
    histogram!("bookmark_bcrypt_duration_seconds", "operation" => operation.to_string())
        .record(duration.as_secs_f64());
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `bookmark_http_requests_total`, `bookmark_http_request_duration_seconds`
/// Labels: `method`, `path`, `status_code`
///
/// This captures ALL HTTP responses including framework-level errors like
/// 404 Not Found and 405 Method Not Allowed.
pub fn record_http_request(method: &str, path: &str, status_code: u16, duration: Duration) {
    let normalized_path = normalize_path(path);

    histogram!("bookmark_http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => normalized_path.clone(),
        "status_code" => status_code.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("bookmark_http_requests_total",
        "method" => method.to_string(),
        "path" => normalized_path,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Normalize path to prevent label cardinality explosion
///
/// Known static routes are kept; bookmark ids are replaced with `{id}`.
pub(crate) fn normalize_path(path: &str) -> String {
    match path {
        "/" | "/health" | "/metrics" | "/api/v1/auth/login" | "/api/v1/auth/refresh"
        | "/api/v1/auth/logout" | "/api/v1/members" | "/api/v1/members/me"
        | "/api/v1/bookmarks" => path.to_string(),
        _ => normalize_dynamic_path(path),
    }
}

/// Normalize `/api/v1/bookmarks/{id}`; everything else becomes `/other`.
fn normalize_dynamic_path(path: &str) -> String {
    if let Some(id) = path.strip_prefix("/api/v1/bookmarks/") {
        if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) {
            return "/api/v1/bookmarks/{id}".to_string();
        }
    }

    "/other".to_string()
}
