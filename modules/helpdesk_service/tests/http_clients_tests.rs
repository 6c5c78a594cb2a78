//! Identity provider and object storage HTTP clients against a mock server

mod common;

use bytes::Bytes;
use common::print_test_header;
use helpdesk_service::contract::*;
use helpdesk_service::infra::identity::GoTrueClient;
use helpdesk_service::infra::objects::StorageApiClient;
use helpdesk_service::{AuthConfig, StorageConfig};
use httpmock::prelude::*;
use serde_json::json;
use uuid::Uuid;

const ANON_KEY: &str = "anon-key";
const SERVICE_KEY: &str = "service-key";

fn gotrue(server: &MockServer) -> GoTrueClient {
    GoTrueClient::new(AuthConfig {
        base_url: server.base_url(),
        anon_key: ANON_KEY.to_string(),
        service_role_key: Some(SERVICE_KEY.to_string()),
        ..AuthConfig::default()
    })
    .unwrap()
}

fn user_json(id: Uuid) -> serde_json::Value {
    json!({ "id": id, "email": "joe@test.io", "aud": "authenticated" })
}

#[tokio::test]
async fn test_password_sign_in_posts_credentials() {
    print_test_header(
        "test_password_sign_in_posts_credentials",
        "Password grant sends the anon key and decodes the session",
    );

    let server = MockServer::start_async().await;
    let user_id = Uuid::new_v4();
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/auth/v1/token")
                .query_param("grant_type", "password")
                .header("apikey", ANON_KEY)
                .json_body(json!({ "email": "joe@test.io", "password": "secret-password" }));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "access_token": "jwt",
                    "refresh_token": "refresh",
                    "expires_in": 3600,
                    "token_type": "bearer",
                    "user": user_json(user_id),
                }));
        })
        .await;

    let session = gotrue(&server)
        .sign_in_with_password("joe@test.io", "secret-password")
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(session.access_token, "jwt");
    assert_eq!(session.expires_in, Some(3600));
    assert_eq!(session.user.map(|u| u.id), Some(user_id));
}

#[tokio::test]
async fn test_rejection_carries_provider_message() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/auth/v1/token");
            then.status(400)
                .header("content-type", "application/json")
                .json_body(json!({
                    "error": "invalid_grant",
                    "error_description": "Invalid login credentials",
                }));
        })
        .await;

    let result = gotrue(&server)
        .sign_in_with_password("joe@test.io", "nope-nope")
        .await;
    assert_eq!(
        result,
        Err(AuthError::Rejected {
            status: 400,
            message: "Invalid login credentials".to_string(),
        })
    );
}

#[tokio::test]
async fn test_get_user_sends_bearer_token() {
    let server = MockServer::start_async().await;
    let user_id = Uuid::new_v4();
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/auth/v1/user")
                .header("authorization", "Bearer jwt");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(user_json(user_id));
        })
        .await;

    let user = gotrue(&server).get_user("jwt").await.unwrap();
    mock.assert_async().await;
    assert_eq!(user.id, user_id);
    assert_eq!(user.email.as_deref(), Some("joe@test.io"));
}

#[tokio::test]
async fn test_sign_up_accepts_user_or_session_body() {
    let server = MockServer::start_async().await;
    let user_id = Uuid::new_v4();
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/auth/v1/signup")
                .query_param("redirect_to", "http://localhost:8080/auth/callback");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(user_json(user_id));
        })
        .await;

    let user = gotrue(&server)
        .sign_up(
            "joe@test.io",
            "secret-password",
            Some("http://localhost:8080/auth/callback"),
        )
        .await
        .unwrap();
    mock.assert_async().await;
    assert_eq!(user.id, user_id);
}

#[tokio::test]
async fn test_email_change_puts_with_redirect() {
    let server = MockServer::start_async().await;
    let user_id = Uuid::new_v4();
    let mock = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/auth/v1/user")
                .query_param("redirect_to", "http://localhost:8080/auth/email-changing")
                .header("authorization", "Bearer jwt")
                .json_body(json!({ "email": "joe@new.io" }));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "id": user_id,
                    "email": "joe@test.io",
                    "new_email": "joe@new.io",
                }));
        })
        .await;

    let update = UserUpdate {
        email: Some("joe@new.io".to_string()),
        ..UserUpdate::default()
    };
    let user = gotrue(&server)
        .update_user(
            "jwt",
            &update,
            Some("http://localhost:8080/auth/email-changing"),
        )
        .await
        .unwrap();
    mock.assert_async().await;
    assert_eq!(user.new_email.as_deref(), Some("joe@new.io"));
}

#[tokio::test]
async fn test_admin_delete_uses_service_key() {
    let server = MockServer::start_async().await;
    let user_id = Uuid::new_v4();
    let mock = server
        .mock_async(|when, then| {
            when.method(DELETE)
                .path(format!("/auth/v1/admin/users/{user_id}"))
                .header("apikey", SERVICE_KEY)
                .header("authorization", format!("Bearer {SERVICE_KEY}"));
            then.status(200).json_body(json!({}));
        })
        .await;

    gotrue(&server).admin_delete_user(user_id).await.unwrap();
    mock.assert_async().await;

    let unconfigured = GoTrueClient::new(AuthConfig {
        base_url: server.base_url(),
        ..AuthConfig::default()
    })
    .unwrap();
    assert!(matches!(
        unconfigured.admin_delete_user(user_id).await,
        Err(AuthError::NotConfigured(_))
    ));
}

#[tokio::test]
async fn test_pkce_exchange_posts_code_and_verifier() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/auth/v1/token")
                .query_param("grant_type", "pkce")
                .json_body(json!({ "auth_code": "code-1", "code_verifier": "verifier" }));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({ "access_token": "jwt", "refresh_token": "refresh" }));
        })
        .await;

    let session = gotrue(&server)
        .exchange_code_for_session("code-1", "verifier")
        .await
        .unwrap();
    mock.assert_async().await;
    assert_eq!(session.refresh_token.as_deref(), Some("refresh"));
    assert!(session.user.is_none());
}

// ===== Object storage =====

#[tokio::test]
async fn test_avatar_upload_posts_object() {
    print_test_header(
        "test_avatar_upload_posts_object",
        "Uploads go to the bucket path with content type and upsert flag",
    );

    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/storage/v1/object/avatars/u1/abc.png")
                .header("authorization", "Bearer storage-key")
                .header("content-type", "image/png")
                .header("x-upsert", "true");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({ "Key": "avatars/u1/abc.png" }));
        })
        .await;

    let client = StorageApiClient::new(StorageConfig {
        base_url: server.base_url(),
        key: "storage-key".to_string(),
        ..StorageConfig::default()
    })
    .unwrap();
    client
        .upload("avatars", "u1/abc.png", Bytes::from_static(b"png"), "image/png", true)
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_avatar_upload_rejection() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/storage/v1/object/avatars/u1/abc.png");
            then.status(413).body("Payload too large");
        })
        .await;

    let client = StorageApiClient::new(StorageConfig {
        base_url: server.base_url(),
        ..StorageConfig::default()
    })
    .unwrap();
    let result = client
        .upload("avatars", "u1/abc.png", Bytes::from_static(b"png"), "image/png", false)
        .await;
    assert_eq!(
        result,
        Err(StorageError::Rejected {
            status: 413,
            message: "Payload too large".to_string(),
        })
    );
}
