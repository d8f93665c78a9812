//! Test server harness for E2E testing
//!
//! Provides TestBookmarkServer for spawning the real bookmark router on an
//! ephemeral port, backed by the in-memory store.

use crate::crypto_fixtures::{test_config, TEST_PASSWORD};
use bookmark_service::config::Config;
use bookmark_service::cookies::REFRESH_COOKIE_NAME;
use bookmark_service::observability::metrics::init_metrics_recorder;
use bookmark_service::repositories::InMemoryStore;
use bookmark_service::routes::{self, AppState};
use bookmark_service::services::token_service::TokenService;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Tokens returned by a successful login.
#[derive(Debug, Clone)]
pub struct LoginTokens {
    pub access_token: String,
    /// Value of the `jrt` cookie.
    pub refresh_token: String,
}

/// Test harness for spawning the bookmark server in E2E tests
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_login_e2e() -> anyhow::Result<()> {
///     let server = TestBookmarkServer::spawn().await?;
///     server.register_member("alice@example.com").await?;
///     let tokens = server.login("alice@example.com").await?;
///     assert!(!tokens.refresh_token.is_empty());
///     Ok(())
/// }
/// ```
pub struct TestBookmarkServer {
    addr: SocketAddr,
    state: Arc<AppState>,
    store: Arc<InMemoryStore>,
    client: reqwest::Client,
    _handle: JoinHandle<()>,
}

impl TestBookmarkServer {
    /// Spawn a server with the fixture config and an empty store
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with_config(test_config()).await
    }

    /// Spawn a server with a custom config (e.g. short token lifetimes)
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Keep members and bookmarks in a fresh in-memory store
    /// - Start the HTTP server in the background
    pub async fn spawn_with_config(config: Config) -> Result<Self, anyhow::Error> {
        let store = Arc::new(InMemoryStore::new());
        let state = Arc::new(AppState::new(config, store.clone(), store.clone()));

        // The global recorder can only be installed once per process; later
        // servers get a standalone recorder.
        let metrics_handle = match init_metrics_recorder() {
            Ok(handle) => handle,
            Err(_) => {
                use metrics_exporter_prometheus::PrometheusBuilder;
                PrometheusBuilder::new().build_recorder().handle()
            }
        };

        let app = routes::build_routes(state.clone(), metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            state,
            store,
            client: reqwest::Client::new(),
            _handle: handle,
        })
    }

    /// HTTP client shared by the helpers
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Get the base URL of the test server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration
    pub fn config(&self) -> &Config {
        &self.state.config
    }

    /// The server's token service, for minting tokens directly
    pub fn token_service(&self) -> &TokenService {
        &self.state.token_service
    }

    /// Backing store, for inspecting state the API does not expose
    pub fn store(&self) -> &InMemoryStore {
        &self.store
    }

    /// Register a member with `TEST_PASSWORD` and return their id
    pub async fn register_member(&self, email: &str) -> Result<i64, anyhow::Error> {
        let nickname = email.split('@').next().unwrap_or("member");
        let response = self
            .client
            .post(format!("{}/api/v1/members", self.url()))
            .json(&json!({
                "email": email,
                "nickname": nickname,
                "password": TEST_PASSWORD,
            }))
            .send()
            .await?;

        anyhow::ensure!(
            response.status() == reqwest::StatusCode::CREATED,
            "registration failed with {}",
            response.status()
        );

        let body: Value = response.json().await?;
        body["data"]["member_id"]
            .as_i64()
            .ok_or_else(|| anyhow::anyhow!("registration response has no member_id"))
    }

    /// Log in with `TEST_PASSWORD`
    pub async fn login(&self, email: &str) -> Result<LoginTokens, anyhow::Error> {
        let response = self
            .client
            .post(format!("{}/api/v1/auth/login", self.url()))
            .json(&json!({ "email": email, "password": TEST_PASSWORD }))
            .send()
            .await?;

        anyhow::ensure!(
            response.status() == reqwest::StatusCode::OK,
            "login failed with {}",
            response.status()
        );

        let refresh_token = extract_refresh_cookie(response.headers())
            .ok_or_else(|| anyhow::anyhow!("login response did not set the refresh cookie"))?;

        let body: Value = response.json().await?;
        let access_token = body["data"]["access_token"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("login response has no access_token"))?
            .to_string();

        Ok(LoginTokens {
            access_token,
            refresh_token,
        })
    }

    /// Register and log in; returns the member id and their tokens
    pub async fn member_session(&self, email: &str) -> Result<(i64, LoginTokens), anyhow::Error> {
        let member_id = self.register_member(email).await?;
        let tokens = self.login(email).await?;
        Ok((member_id, tokens))
    }
}

impl Drop for TestBookmarkServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

/// Value of the `jrt` cookie from `Set-Cookie` response headers.
pub fn extract_refresh_cookie(headers: &reqwest::header::HeaderMap) -> Option<String> {
    headers
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|s| s.split(';').next())
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == REFRESH_COOKIE_NAME)
        .map(|(_, value)| value.to_string())
}
