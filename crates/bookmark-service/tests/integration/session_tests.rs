//! E2E tests for the member session client against a live server.
//!
//! Short token lifetimes make the server reject the access token so the
//! session has to refresh on its own.

use bookmark_test_utils::{test_config, TestBookmarkServer, TEST_PASSWORD};
use common::secret::SecretString;
use common::session::{Session, SessionConfig, SessionError, SessionState};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

/// Past a one-second token lifetime, with margin for second-resolution claims.
const PAST_SHORT_LIFETIME: Duration = Duration::from_millis(2500);

fn session_for(server: &TestBookmarkServer) -> Result<Session, anyhow::Error> {
    Ok(Session::new(SessionConfig::new(server.url()))?)
}

async fn spawn_with_lifetimes(
    access_seconds: i64,
    refresh_seconds: i64,
) -> Result<TestBookmarkServer, anyhow::Error> {
    let mut config = test_config();
    config.token.access_token_lifetime_seconds = access_seconds;
    config.token.refresh_token_lifetime_seconds = refresh_seconds;
    TestBookmarkServer::spawn_with_config(config).await
}

#[tokio::test]
async fn test_session_login_and_send() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestBookmarkServer::spawn().await?;
    let member_id = server.register_member("alice@example.com").await?;
    let session = session_for(&server)?;

    // Act
    let logged_in_as = session
        .login("alice@example.com", &SecretString::from(TEST_PASSWORD))
        .await?;

    // Assert
    assert_eq!(logged_in_as, member_id.to_string());
    assert!(session.is_logged_in());
    assert_eq!(
        session.authenticated_member_id(),
        Some(member_id.to_string())
    );

    let url = session.url("/api/v1/members/me");
    let response = session.send(|http| http.get(&url)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body["data"]["member_id"], member_id);
    assert_eq!(session.state(), SessionState::Idle);

    Ok(())
}

#[tokio::test]
async fn test_session_login_failures() -> Result<(), anyhow::Error> {
    let server = TestBookmarkServer::spawn().await?;
    server.register_member("alice@example.com").await?;
    let session = session_for(&server)?;

    let wrong_password = session
        .login("alice@example.com", &SecretString::from("Wrong0ne#"))
        .await;
    assert_eq!(wrong_password, Err(SessionError::InvalidCredentials));

    let unknown = session
        .login("nobody@example.com", &SecretString::from(TEST_PASSWORD))
        .await;
    assert_eq!(unknown, Err(SessionError::MemberNotFound));

    let blank = session
        .login("alice@example.com", &SecretString::from(""))
        .await;
    assert_eq!(blank, Err(SessionError::MissingCredentials));

    assert!(!session.is_logged_in());

    Ok(())
}

#[tokio::test]
async fn test_session_refreshes_expired_access_token() -> Result<(), anyhow::Error> {
    // Arrange
    let server = spawn_with_lifetimes(1, 604_800).await?;
    server.register_member("alice@example.com").await?;
    let session = session_for(&server)?;
    session
        .login("alice@example.com", &SecretString::from(TEST_PASSWORD))
        .await?;

    tokio::time::sleep(PAST_SHORT_LIFETIME).await;

    // Act
    let url = session.url("/api/v1/bookmarks");
    let response = session.send(|http| http.get(&url)).await?;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    assert!(session.is_logged_in());
    assert_eq!(session.state(), SessionState::Idle);

    Ok(())
}

#[tokio::test]
async fn test_session_concurrent_requests_share_one_refresh() -> Result<(), anyhow::Error> {
    let server = spawn_with_lifetimes(1, 604_800).await?;
    server.register_member("alice@example.com").await?;
    let session = session_for(&server)?;
    session
        .login("alice@example.com", &SecretString::from(TEST_PASSWORD))
        .await?;

    tokio::time::sleep(PAST_SHORT_LIFETIME).await;

    let url = session.url("/api/v1/members/me");
    let (first, second, third) = tokio::join!(
        session.send(|http| http.get(&url)),
        session.send(|http| http.get(&url)),
        session.send(|http| http.get(&url)),
    );

    // Every request succeeds. A second refresh with the already rotated
    // cookie would still work, so the check here is that nobody was logged out.
    for response in [first?, second?, third?] {
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert!(session.is_logged_in());

    Ok(())
}

#[tokio::test]
async fn test_session_logs_out_when_refresh_token_expires() -> Result<(), anyhow::Error> {
    let server = spawn_with_lifetimes(1, 1).await?;
    server.register_member("alice@example.com").await?;
    let session = session_for(&server)?;
    session
        .login("alice@example.com", &SecretString::from(TEST_PASSWORD))
        .await?;

    tokio::time::sleep(PAST_SHORT_LIFETIME).await;

    let url = session.url("/api/v1/members/me");
    let result = session.send(|http| http.get(&url)).await;

    assert!(matches!(result, Err(SessionError::LoggedOut)));
    assert!(!session.is_logged_in());
    assert_eq!(session.authenticated_member_id(), None);

    Ok(())
}

#[tokio::test]
async fn test_session_logout_ends_session() -> Result<(), anyhow::Error> {
    let server = TestBookmarkServer::spawn().await?;
    server.register_member("alice@example.com").await?;
    let session = session_for(&server)?;
    session
        .login("alice@example.com", &SecretString::from(TEST_PASSWORD))
        .await?;

    session.logout().await?;
    assert!(!session.is_logged_in());

    let url = session.url("/api/v1/members/me");
    let result = session.send(|http| http.get(&url)).await;
    assert!(matches!(result, Err(SessionError::LoggedOut)));

    Ok(())
}

#[tokio::test]
async fn test_session_passes_through_non_auth_errors() -> Result<(), anyhow::Error> {
    let server = TestBookmarkServer::spawn().await?;
    server.register_member("alice@example.com").await?;
    let session = session_for(&server)?;
    session
        .login("alice@example.com", &SecretString::from(TEST_PASSWORD))
        .await?;

    let url = session.url("/api/v1/bookmarks/999");
    let response = session.send(|http| http.get(&url)).await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(session.is_logged_in());

    Ok(())
}
