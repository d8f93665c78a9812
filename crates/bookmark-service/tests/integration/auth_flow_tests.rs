//! E2E tests for login, refresh and logout.
//!
//! ## Test Naming
//!
//! Tests follow the convention: `test_<feature>_<scenario>_<expected_result>`

use bookmark_test_utils::{
    extract_refresh_cookie, TestBookmarkServer, TestTokenBuilder, TokenAssertions, TEST_ISSUER,
    TEST_PASSWORD,
};
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::StatusCode;
use serde_json::{json, Value};

async fn refresh_with(server: &TestBookmarkServer, cookie: &str) -> reqwest::Response {
    server
        .client()
        .post(format!("{}/api/v1/auth/refresh", server.url()))
        .header(COOKIE, format!("jrt={cookie}"))
        .send()
        .await
        .expect("refresh request should be sent")
}

// ============================================================================
// Login
// ============================================================================

#[tokio::test]
async fn test_login_happy_path_issues_tokens() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestBookmarkServer::spawn().await?;
    let member_id = server.register_member("alice@example.com").await?;

    // Act
    let response = server
        .client()
        .post(format!("{}/api/v1/auth/login", server.url()))
        .json(&json!({"email": "alice@example.com", "password": TEST_PASSWORD}))
        .send()
        .await?;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);

    let cookie_header = response
        .headers()
        .get(SET_COOKIE)
        .expect("login should set the refresh cookie")
        .to_str()?
        .to_string();
    for attribute in [
        "HttpOnly",
        "Secure",
        "Path=/",
        "SameSite=None",
        "Partitioned",
        "Max-Age=604800",
    ] {
        assert!(
            cookie_header.contains(attribute),
            "cookie should carry {attribute}: {cookie_header}"
        );
    }

    let body: Value = response.json().await?;
    assert_eq!(body["status"], true);
    assert_eq!(body["message"], "Login successful");
    assert_eq!(body["data"]["token_type"], "Bearer");
    assert_eq!(body["data"]["expires_in"], 3600);

    let access_token = body["data"]["access_token"].as_str().unwrap().to_string();
    access_token
        .assert_valid_jwt()
        .assert_issued_by(TEST_ISSUER)
        .assert_for_subject(&member_id.to_string())
        .assert_expires_in(3600);

    Ok(())
}

#[tokio::test]
async fn test_login_wrong_password_returns_401() -> Result<(), anyhow::Error> {
    let server = TestBookmarkServer::spawn().await?;
    server.register_member("alice@example.com").await?;

    let response = server
        .client()
        .post(format!("{}/api/v1/auth/login", server.url()))
        .json(&json!({"email": "alice@example.com", "password": "Wrong0ne#"}))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(SET_COOKIE).is_none());
    let body: Value = response.json().await?;
    assert_eq!(body["status"], false);
    assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");

    Ok(())
}

#[tokio::test]
async fn test_login_unknown_email_returns_404() -> Result<(), anyhow::Error> {
    let server = TestBookmarkServer::spawn().await?;

    let response = server
        .client()
        .post(format!("{}/api/v1/auth/login", server.url()))
        .json(&json!({"email": "nobody@example.com", "password": TEST_PASSWORD}))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await?;
    assert_eq!(body["error"]["code"], "MEMBER_NOT_FOUND");

    Ok(())
}

#[tokio::test]
async fn test_login_missing_fields_returns_422() -> Result<(), anyhow::Error> {
    let server = TestBookmarkServer::spawn().await?;
    server.register_member("alice@example.com").await?;

    for body in [
        json!({}),
        json!({"email": "", "password": TEST_PASSWORD}),
        json!({"email": "alice@example.com"}),
        json!({"email": "alice@example.com", "password": ""}),
    ] {
        let response = server
            .client()
            .post(format!("{}/api/v1/auth/login", server.url()))
            .json(&body)
            .send()
            .await?;

        assert_eq!(
            response.status(),
            StatusCode::UNPROCESSABLE_ENTITY,
            "body {body} should be rejected"
        );
    }

    Ok(())
}

// ============================================================================
// Refresh
// ============================================================================

#[tokio::test]
async fn test_refresh_rotates_both_tokens() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestBookmarkServer::spawn().await?;
    let (member_id, tokens) = server.member_session("alice@example.com").await?;

    // Act
    let response = refresh_with(&server, &tokens.refresh_token).await;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let rotated_cookie =
        extract_refresh_cookie(response.headers()).expect("refresh should rotate the cookie");
    assert_ne!(rotated_cookie, tokens.refresh_token);

    let body: Value = response.json().await?;
    assert_eq!(body["message"], "Token refreshed");
    let access_token = body["data"]["access_token"].as_str().unwrap().to_string();
    access_token.assert_for_subject(&member_id.to_string());

    // The rotated cookie works for the next refresh, and rotating again in
    // the same second still changes the cookie.
    let response = refresh_with(&server, &rotated_cookie).await;
    assert_eq!(response.status(), StatusCode::OK);
    let second_cookie =
        extract_refresh_cookie(response.headers()).expect("refresh should rotate the cookie");
    assert_ne!(second_cookie, rotated_cookie);

    Ok(())
}

#[tokio::test]
async fn test_refresh_without_cookie_returns_401() -> Result<(), anyhow::Error> {
    let server = TestBookmarkServer::spawn().await?;

    let response = server
        .client()
        .post(format!("{}/api/v1/auth/refresh", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await?;
    assert_eq!(body["error"]["code"], "REFRESH_TOKEN_MISSING");

    Ok(())
}

#[tokio::test]
async fn test_refresh_expired_cookie_returns_401() -> Result<(), anyhow::Error> {
    let server = TestBookmarkServer::spawn().await?;
    let expired = TestTokenBuilder::new()
        .for_member(1)
        .expired_seconds_ago(60)
        .sign_refresh();

    let response = refresh_with(&server, &expired).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let cleared = extract_refresh_cookie(response.headers()).expect("cookie should be cleared");
    assert!(cleared.is_empty());
    let body: Value = response.json().await?;
    assert_eq!(body["error"]["code"], "REFRESH_TOKEN_EXPIRED");

    Ok(())
}

#[tokio::test]
async fn test_refresh_rejects_access_token_and_foreign_issuer() -> Result<(), anyhow::Error> {
    let server = TestBookmarkServer::spawn().await?;
    let (_, tokens) = server.member_session("alice@example.com").await?;

    let foreign = TestTokenBuilder::new()
        .issued_by("https://someone-else.test")
        .sign_refresh();

    for cookie in [tokens.access_token.as_str(), foreign.as_str(), "garbage"] {
        let response = refresh_with(&server, cookie).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: Value = response.json().await?;
        assert_eq!(body["error"]["code"], "REFRESH_TOKEN_INVALID");
    }

    Ok(())
}

#[tokio::test]
async fn test_refresh_token_is_not_an_access_token() -> Result<(), anyhow::Error> {
    let server = TestBookmarkServer::spawn().await?;
    let (_, tokens) = server.member_session("alice@example.com").await?;

    let response = server
        .client()
        .get(format!("{}/api/v1/members/me", server.url()))
        .bearer_auth(&tokens.refresh_token)
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await?;
    assert_eq!(body["error"]["code"], "TOKEN_SIGNATURE_INVALID");

    Ok(())
}

// ============================================================================
// Logout
// ============================================================================

#[tokio::test]
async fn test_logout_expires_cookie() -> Result<(), anyhow::Error> {
    let server = TestBookmarkServer::spawn().await?;

    let response = server
        .client()
        .post(format!("{}/api/v1/auth/logout", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let cookie_header = response
        .headers()
        .get(SET_COOKIE)
        .expect("logout should clear the cookie")
        .to_str()?
        .to_string();
    assert!(cookie_header.starts_with("jrt=;"));
    assert!(cookie_header.contains("Max-Age=0"));

    let body: Value = response.json().await?;
    assert_eq!(body["message"], "Logout successful");

    Ok(())
}
