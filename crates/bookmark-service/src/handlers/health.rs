/// Liveness probe handler.
///
/// Returns "OK" without checking any dependency.
pub async fn health_check() -> &'static str {
    "OK"
}
