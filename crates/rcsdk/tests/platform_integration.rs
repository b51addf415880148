//! Integration tests for the platform session
//!
//! These tests run the reqwest transport against a wiremock server and cover
//! the token lifecycle plus request shaping on the wire.

use rcsdk::{ApiRequest, AuthStatus, Credentials, Error, Platform, PlatformConfig, TokenTtl};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{
    body_partial_json, body_string_contains, header, method, path, query_param,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BASIC_AUTH: &str = "Basic a2V5OnNlY3JldA==";

fn token_body(access: &str, refresh: &str) -> serde_json::Value {
    json!({
        "access_token": access,
        "refresh_token": refresh,
        "token_type": "bearer",
        "expires_in": "3600",
        "refresh_token_expires_in": "604800",
        "scope": "SMS RingOut",
        "owner_id": "400131249008"
    })
}

fn platform_for(server: &MockServer) -> Platform {
    platform_with(server, PlatformConfig::default())
}

fn platform_with(server: &MockServer, config: PlatformConfig) -> Platform {
    Platform::with_config(Credentials::new("key", "secret", server.uri()), config).unwrap()
}

async fn mount_token(server: &MockServer, access: &str, refresh: &str) {
    Mock::given(method("POST"))
        .and(path("/restapi/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(access, refresh)))
        .mount(server)
        .await;
}

// =============================================================================
// Authorization Tests
// =============================================================================

#[tokio::test]
async fn test_authorize_against_server() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/restapi/oauth/token"))
        .and(header("authorization", BASIC_AUTH))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("grant_type=password"))
        .and(body_string_contains("username=user"))
        .and(body_string_contains("extension=101"))
        .and(body_string_contains("access_token_ttl=3600"))
        .and(body_string_contains("refresh_token_ttl=604800"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("A", "B")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let platform = platform_for(&mock_server);
    let response = platform.authorize("user", "101", "pw").await.unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(platform.status().await, AuthStatus::Authorized);
    assert_eq!(platform.access_token().await, "A");

    let auth = platform.auth_data().await;
    assert_eq!(auth.refresh_token(), "B");
    assert_eq!(auth.owner_id(), Some("400131249008"));
}

#[tokio::test]
async fn test_authorize_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/restapi/oauth/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid resource owner credentials"
        })))
        .mount(&mock_server)
        .await;

    let platform = platform_for(&mock_server);
    let err = platform.authorize("user", "101", "wrong").await.unwrap_err();

    match err {
        Error::HttpStatus { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("invalid_grant"));
        }
        other => panic!("Expected HttpStatus error, got: {:?}", other),
    }
    assert_eq!(platform.status().await, AuthStatus::Unauthenticated);
}

#[tokio::test]
async fn test_authorize_garbage_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/restapi/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&mock_server)
        .await;

    let platform = platform_for(&mock_server);
    let err = platform.authorize("user", "101", "pw").await.unwrap_err();

    assert!(matches!(err, Error::MalformedResponse(_)));
    assert_eq!(platform.status().await, AuthStatus::Unauthenticated);
}

#[tokio::test]
async fn test_custom_token_ttl_is_requested() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/restapi/oauth/token"))
        .and(body_string_contains("access_token_ttl=600"))
        .and(body_string_contains("refresh_token_ttl=86400"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "A",
            "refresh_token": "B",
            "token_type": "bearer"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = PlatformConfig::new().with_token_ttl(TokenTtl::new(
        Duration::from_secs(600),
        Duration::from_secs(86_400),
    ));
    let platform = platform_with(&mock_server, config);
    platform.authorize("user", "101", "pw").await.unwrap();

    // no ttl in the response: the requested ttl is used
    let auth = platform.auth_data().await;
    let remaining = auth.access_token_expires_at().unwrap() - chrono::Utc::now();
    assert!(remaining.num_seconds() > 590 && remaining.num_seconds() <= 600);
}

// =============================================================================
// Refresh and Logout Tests
// =============================================================================

#[tokio::test]
async fn test_refresh_against_server() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/restapi/oauth/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=B"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("C", "D")))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/restapi/oauth/token"))
        .and(body_string_contains("grant_type=password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("A", "B")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let platform = platform_for(&mock_server);
    platform.authorize("user", "101", "pw").await.unwrap();
    platform.refresh().await.unwrap();

    assert_eq!(platform.access_token().await, "C");
    assert_eq!(platform.auth_data().await.refresh_token(), "D");
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server, "A", "B").await;

    Mock::given(method("POST"))
        .and(path("/restapi/oauth/revoke"))
        .and(header("authorization", BASIC_AUTH))
        .and(body_string_contains("token=A"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let platform = platform_for(&mock_server);
    platform.authorize("user", "101", "pw").await.unwrap();
    platform.logout().await.unwrap();

    assert_eq!(platform.status().await, AuthStatus::Unauthenticated);
    assert_eq!(platform.access_token().await, "");
}

#[tokio::test]
async fn test_logout_clears_state_when_revoke_fails() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server, "A", "B").await;

    Mock::given(method("POST"))
        .and(path("/restapi/oauth/revoke"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&mock_server)
        .await;

    let platform = platform_for(&mock_server);
    platform.authorize("user", "101", "pw").await.unwrap();

    let err = platform.logout().await.unwrap_err();
    assert_eq!(err.status(), Some(500));

    let auth = platform.auth_data().await;
    assert!(!auth.is_access_token_valid());
    assert!(!auth.is_refresh_token_valid());
}

// =============================================================================
// Business Request Tests
// =============================================================================

#[tokio::test]
async fn test_send_sms_on_the_wire() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server, "A", "B").await;

    Mock::given(method("POST"))
        .and(path("/restapi/v1.0/account/~/extension/~/sms"))
        .and(header("authorization", "Bearer A"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({
            "to": [{"phoneNumber": "16505550100"}],
            "from": {"phoneNumber": "16505550101"},
            "text": "hi"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 315,
            "messageStatus": "Queued"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let platform = platform_for(&mock_server);
    platform.authorize("user", "101", "pw").await.unwrap();

    let response = platform
        .send_sms("16505550100", "16505550101", "hi")
        .await
        .unwrap();
    let map = response.json_map().unwrap();
    assert_eq!(map.get("messageStatus"), Some(&json!("Queued")));
}

#[tokio::test]
async fn test_account_substitution_on_the_wire() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server, "A", "B").await;

    Mock::given(method("GET"))
        .and(path("/restapi/v1.0/account/400131249008/call-log"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"records": []})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = PlatformConfig::new().with_account("400131249008");
    let platform = platform_with(&mock_server, config);
    platform.authorize("user", "101", "pw").await.unwrap();
    platform.call_log().await.unwrap();
}

#[tokio::test]
async fn test_method_override_on_the_wire() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server, "A", "B").await;

    Mock::given(method("POST"))
        .and(path("/restapi/v1.0/account/~/extension/~/message-store/1"))
        .and(query_param("_method", "DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let platform = platform_for(&mock_server);
    platform.authorize("user", "101", "pw").await.unwrap();

    let request = ApiRequest::new("/account/~/extension/~/message-store/1").with_method_override();
    let response = platform.delete(request).await.unwrap();
    assert_eq!(response.status(), 204);
}

#[tokio::test]
async fn test_business_error_status() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server, "A", "B").await;

    Mock::given(method("GET"))
        .and(path("/restapi/v1.0/account/~/extension/~/message-store"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "errorCode": "CMN-408",
            "message": "In order to call this API endpoint, application needs to have [ReadMessages] permission"
        })))
        .mount(&mock_server)
        .await;

    let platform = platform_for(&mock_server);
    platform.authorize("user", "101", "pw").await.unwrap();

    let err = platform.message_store().await.unwrap_err();
    assert_eq!(err.status(), Some(403));
    assert!(err.to_string().contains("CMN-408"));
}

#[tokio::test]
async fn test_connection_refused() {
    // nothing listens on port 1
    let credentials = Credentials::new("key", "secret", "http://127.0.0.1:1");
    let platform = Platform::with_config(credentials, PlatformConfig::default()).unwrap();
    let err = platform.authorize("user", "101", "pw").await.unwrap_err();

    assert!(matches!(err, Error::Transport(_)));
    assert_eq!(platform.status().await, AuthStatus::Unauthenticated);
}
