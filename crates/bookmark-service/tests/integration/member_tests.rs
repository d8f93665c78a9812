//! E2E tests for member registration, lookup and deletion.

use bookmark_test_utils::{TestBookmarkServer, TEST_PASSWORD};
use reqwest::StatusCode;
use serde_json::{json, Value};

async fn register(
    server: &TestBookmarkServer,
    body: Value,
) -> Result<(StatusCode, Value), anyhow::Error> {
    let response = server
        .client()
        .post(format!("{}/api/v1/members", server.url()))
        .json(&body)
        .send()
        .await?;
    let status = response.status();
    Ok((status, response.json().await?))
}

#[tokio::test]
async fn test_register_returns_public_view() -> Result<(), anyhow::Error> {
    let server = TestBookmarkServer::spawn().await?;

    let (status, body) = register(
        &server,
        json!({"email": "alice@example.com", "nickname": "Alice", "password": TEST_PASSWORD}),
    )
    .await?;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], true);
    assert_eq!(body["message"], "Member created successfully.");
    assert!(body["data"]["member_id"].as_i64().is_some());
    assert_eq!(body["data"]["nickname"], "Alice");
    assert!(body["data"]["created_at"].is_string());

    let data = body["data"].as_object().unwrap();
    assert!(!data.contains_key("email"));
    assert!(!data.contains_key("password"));
    assert!(!data.contains_key("password_hash"));

    Ok(())
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() -> Result<(), anyhow::Error> {
    let server = TestBookmarkServer::spawn().await?;
    server.register_member("alice@example.com").await?;

    let (status, body) = register(
        &server,
        json!({"email": "alice@example.com", "nickname": "Other", "password": TEST_PASSWORD}),
    )
    .await?;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
    assert_eq!(body["error"]["message"], "Email is already registered");

    Ok(())
}

#[tokio::test]
async fn test_register_rejects_invalid_fields() -> Result<(), anyhow::Error> {
    let server = TestBookmarkServer::spawn().await?;
    let long_nickname = "n".repeat(51);

    let cases = [
        json!({"email": "not-an-email", "nickname": "Alice", "password": TEST_PASSWORD}),
        json!({"email": "", "nickname": "Alice", "password": TEST_PASSWORD}),
        json!({"email": "alice@example.com", "nickname": "", "password": TEST_PASSWORD}),
        json!({"email": "alice@example.com", "nickname": long_nickname, "password": TEST_PASSWORD}),
        json!({"email": "alice@example.com", "nickname": "Alice", "password": "short"}),
        json!({"email": "alice@example.com", "nickname": "Alice", "password": "alllowercase1#"}),
        json!({"email": "alice@example.com", "nickname": "Alice"}),
    ];

    for case in cases {
        let (status, body) = register(&server, case.clone()).await?;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "body {case}");
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    // Nothing was stored by the rejected attempts.
    server.register_member("alice@example.com").await?;

    Ok(())
}

#[tokio::test]
async fn test_get_me_returns_current_member() -> Result<(), anyhow::Error> {
    let server = TestBookmarkServer::spawn().await?;
    let (member_id, tokens) = server.member_session("alice@example.com").await?;

    let response = server
        .client()
        .get(format!("{}/api/v1/members/me", server.url()))
        .bearer_auth(&tokens.access_token)
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body["message"], "Member found.");
    assert_eq!(body["data"]["member_id"], member_id);
    assert_eq!(body["data"]["nickname"], "alice");

    Ok(())
}

#[tokio::test]
async fn test_delete_me_then_gone() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestBookmarkServer::spawn().await?;
    let (_, tokens) = server.member_session("alice@example.com").await?;
    let me = format!("{}/api/v1/members/me", server.url());

    // Act
    let response = server
        .client()
        .delete(&me)
        .bearer_auth(&tokens.access_token)
        .send()
        .await?;

    // Assert
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(response.bytes().await?.is_empty());

    // The token still validates, but the member is gone.
    let response = server
        .client()
        .delete(&me)
        .bearer_auth(&tokens.access_token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::GONE);

    let response = server
        .client()
        .get(&me)
        .bearer_auth(&tokens.access_token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await?;
    assert_eq!(body["error"]["code"], "MEMBER_NOT_FOUND");

    // The email can be registered again.
    server.register_member("alice@example.com").await?;

    Ok(())
}

#[tokio::test]
async fn test_delete_member_removes_their_bookmarks() -> Result<(), anyhow::Error> {
    let server = TestBookmarkServer::spawn().await?;
    let (_, tokens) = server.member_session("alice@example.com").await?;

    let response = server
        .client()
        .post(format!("{}/api/v1/bookmarks", server.url()))
        .bearer_auth(&tokens.access_token)
        .json(&json!({"title": "Rust", "url": "https://www.rust-lang.org", "tags": ["rust"]}))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = server
        .client()
        .delete(format!("{}/api/v1/members/me", server.url()))
        .bearer_auth(&tokens.access_token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    assert_eq!(server.store().bookmark_count(), 0);

    Ok(())
}
