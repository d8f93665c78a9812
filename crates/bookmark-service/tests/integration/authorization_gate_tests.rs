//! E2E tests for the bearer token gate on member routes.
//!
//! Each rejection carries its own error code so clients can tell an expired
//! token (refresh and retry) from a forged one (log out).

use bookmark_test_utils::{TestBookmarkServer, TestTokenBuilder, TEST_ACCESS_TOKEN_SECRET};
use chrono::Utc;
use common::jwt::Algorithm;
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde_json::Value;

/// GET /api/v1/members/me with the given Authorization header.
async fn me_with_header(
    server: &TestBookmarkServer,
    header: Option<&str>,
) -> Result<(StatusCode, Value), anyhow::Error> {
    let mut request = server
        .client()
        .get(format!("{}/api/v1/members/me", server.url()));
    if let Some(header) = header {
        request = request.header(AUTHORIZATION, header);
    }

    let response = request.send().await?;
    let status = response.status();
    let body: Value = response.json().await?;
    Ok((status, body))
}

async fn assert_rejected(
    server: &TestBookmarkServer,
    header: Option<&str>,
    expected_code: &str,
) -> Result<(), anyhow::Error> {
    let (status, body) = me_with_header(server, header).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "header {header:?}");
    assert_eq!(body["status"], false);
    assert_eq!(body["error"]["code"], expected_code, "header {header:?}");
    Ok(())
}

#[tokio::test]
async fn test_gate_accepts_valid_token() -> Result<(), anyhow::Error> {
    let server = TestBookmarkServer::spawn().await?;
    let (member_id, tokens) = server.member_session("alice@example.com").await?;

    let (status, body) =
        me_with_header(&server, Some(&format!("Bearer {}", tokens.access_token))).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["member_id"], member_id);

    Ok(())
}

#[tokio::test]
async fn test_gate_missing_header() -> Result<(), anyhow::Error> {
    let server = TestBookmarkServer::spawn().await?;

    assert_rejected(&server, None, "MISSING_AUTHORIZATION_HEADER").await?;

    Ok(())
}

#[tokio::test]
async fn test_gate_missing_bearer_token() -> Result<(), anyhow::Error> {
    let server = TestBookmarkServer::spawn().await?;

    for header in ["Bearer ", "Basic dXNlcjpwYXNz", "Token abc"] {
        assert_rejected(&server, Some(header), "MISSING_ACCESS_TOKEN").await?;
    }

    Ok(())
}

#[tokio::test]
async fn test_gate_expired_token() -> Result<(), anyhow::Error> {
    let server = TestBookmarkServer::spawn().await?;
    let token = TestTokenBuilder::new()
        .for_member(1)
        .expired_seconds_ago(60)
        .sign_access();

    assert_rejected(&server, Some(&format!("Bearer {token}")), "TOKEN_EXPIRED").await?;

    Ok(())
}

#[tokio::test]
async fn test_gate_foreign_issuer() -> Result<(), anyhow::Error> {
    let server = TestBookmarkServer::spawn().await?;
    let token = TestTokenBuilder::new()
        .issued_by("https://someone-else.test")
        .sign_access();

    assert_rejected(
        &server,
        Some(&format!("Bearer {token}")),
        "TOKEN_ISSUER_MISMATCH",
    )
    .await?;

    Ok(())
}

#[tokio::test]
async fn test_gate_bad_signatures() -> Result<(), anyhow::Error> {
    let server = TestBookmarkServer::spawn().await?;

    let wrong_secret = TestTokenBuilder::new()
        .sign_with("some-other-secret-0123456789abcdefghijk", Algorithm::HS256);
    let wrong_algorithm = TestTokenBuilder::new().sign_with(TEST_ACCESS_TOKEN_SECRET, Algorithm::HS512);
    let refresh_token = TestTokenBuilder::new().sign_refresh();

    for token in [wrong_secret, wrong_algorithm, refresh_token] {
        assert_rejected(
            &server,
            Some(&format!("Bearer {token}")),
            "TOKEN_SIGNATURE_INVALID",
        )
        .await?;
    }

    Ok(())
}

#[tokio::test]
async fn test_gate_token_issued_in_future() -> Result<(), anyhow::Error> {
    let server = TestBookmarkServer::spawn().await?;
    let token = TestTokenBuilder::new()
        .issued_at(Utc::now().timestamp() + 600)
        .expires_in(7200)
        .sign_access();

    assert_rejected(
        &server,
        Some(&format!("Bearer {token}")),
        "TOKEN_NOT_YET_VALID",
    )
    .await?;

    Ok(())
}

#[tokio::test]
async fn test_gate_malformed_tokens() -> Result<(), anyhow::Error> {
    let server = TestBookmarkServer::spawn().await?;
    let non_numeric_subject = TestTokenBuilder::new().for_subject("alice").sign_access();

    for token in ["garbage", "a.b.c", non_numeric_subject.as_str()] {
        assert_rejected(&server, Some(&format!("Bearer {token}")), "TOKEN_MALFORMED").await?;
    }

    Ok(())
}

#[tokio::test]
async fn test_gate_covers_bookmark_routes() -> Result<(), anyhow::Error> {
    let server = TestBookmarkServer::spawn().await?;
    let client = server.client();
    let base = server.url();

    let requests = [
        client.get(format!("{base}/api/v1/bookmarks")),
        client.post(format!("{base}/api/v1/bookmarks")),
        client.get(format!("{base}/api/v1/bookmarks/1")),
        client.patch(format!("{base}/api/v1/bookmarks/1")),
        client.put(format!("{base}/api/v1/bookmarks/1")),
        client.delete(format!("{base}/api/v1/bookmarks/1")),
        client.delete(format!("{base}/api/v1/members/me")),
    ];

    for request in requests {
        let response = request.send().await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: Value = response.json().await?;
        assert_eq!(body["error"]["code"], "MISSING_AUTHORIZATION_HEADER");
    }

    Ok(())
}
