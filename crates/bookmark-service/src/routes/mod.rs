//! HTTP routes for the bookmark service.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_member_auth, AuthState};
use crate::repositories::{BookmarkRepository, MemberRepository};
use crate::services::token_service::TokenService;
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Issues and validates access and refresh tokens.
    pub token_service: Arc<TokenService>,

    pub members: Arc<dyn MemberRepository>,

    pub bookmarks: Arc<dyn BookmarkRepository>,
}

impl AppState {
    pub fn new(
        config: Config,
        members: Arc<dyn MemberRepository>,
        bookmarks: Arc<dyn BookmarkRepository>,
    ) -> Self {
        let token_service = Arc::new(TokenService::new(config.token.clone()));
        Self {
            config,
            token_service,
            members,
            bookmarks,
        }
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Liveness probe (simple "OK") - public, unversioned
/// - `/metrics` - Prometheus metrics endpoint - public, unversioned
/// - `/api/v1/auth/{login,refresh,logout}` - public
/// - `POST /api/v1/members` - registration, public
/// - `/api/v1/members/me` - read or delete the caller - requires authentication
/// - `/api/v1/bookmarks[/:id]` - the caller's bookmarks - requires authentication
/// - CORS with credentials when `cors_allowed_origin` is configured
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let auth_state = Arc::new(AuthState {
        token_service: state.token_service.clone(),
    });

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/v1/auth/login", post(handlers::login))
        .route("/api/v1/auth/refresh", post(handlers::refresh))
        .route("/api/v1/auth/logout", post(handlers::logout))
        .route("/api/v1/members", post(handlers::register))
        .with_state(state.clone());

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route(
            "/api/v1/members/me",
            get(handlers::get_me).delete(handlers::delete_me),
        )
        .route(
            "/api/v1/bookmarks",
            get(handlers::list_bookmarks).post(handlers::create_bookmark),
        )
        .route(
            "/api/v1/bookmarks/:id",
            get(handlers::get_bookmark)
                .patch(handlers::update_bookmark)
                .put(handlers::update_bookmark)
                .delete(handlers::delete_bookmark),
        )
        .route_layer(middleware::from_fn_with_state(
            auth_state,
            require_member_auth,
        ))
        .with_state(state.clone());

    // Layer order (bottom-to-top execution):
    // 1. TraceLayer - Log request details (innermost)
    // 2. TimeoutLayer - Timeout the request
    // 3. CorsLayer - Answer preflights before auth runs
    // 4. http_metrics_middleware - Record ALL responses (outermost)
    let mut router = public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)));

    if let Some(cors) = state.config.cors_allowed_origin.as_deref().and_then(cors_layer) {
        router = router.layer(cors);
    }

    router.layer(middleware::from_fn(http_metrics_middleware))
}

/// Credentialed CORS for a single origin. The refresh cookie is only sent
/// cross-site when credentials are allowed.
fn cors_layer(origin: &str) -> Option<CorsLayer> {
    let origin = match HeaderValue::from_str(origin) {
        Ok(origin) => origin,
        Err(_) => {
            tracing::warn!(target: "bookmark.routes", "Ignoring CORS_ALLOWED_ORIGIN: not a valid header value");
            return None;
        }
    };

    Some(
        CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
    )
}
