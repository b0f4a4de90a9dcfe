use std::time::Duration;

use authgate_client::{AuthClient, ClientError, RefreshError};
use reqwest::{Method, StatusCode};

use crate::test_utils::{jane, spawn_server, spawn_server_with, test_settings};

#[tokio::test]
async fn test_client_session_flow() {
    let (base_url, server) = spawn_server().await;
    let client = AuthClient::new(&base_url).unwrap();

    let created = client.sign_up(&jane()).await.unwrap();
    assert_eq!(created.user.email, "jane@x.com");
    assert_eq!(created.user.name, "Jane Doe");

    let login = client.sign_in("jane@x.com", "Abc12345!").await.unwrap();
    assert_eq!(login.message, "Login successful");

    let profile = client.profile().await.unwrap();
    assert_eq!(profile.email, "jane@x.com");
    assert_eq!(profile.name.as_deref(), Some("Jane Doe"));

    client.refresh().await.unwrap();

    let logout = client.logout().await.unwrap();
    assert_eq!(logout.message, "Logout successful");

    // Cookies are gone: the retry path gives up and asks for sign-in
    tokio::time::sleep(Duration::from_millis(150)).await;
    let err = client.profile().await.unwrap_err();
    assert!(err.requires_sign_in(), "unexpected error {err:?}");

    server.abort();
}

#[tokio::test]
async fn test_client_reports_api_errors() {
    let (base_url, server) = spawn_server().await;
    let client = AuthClient::new(&base_url).unwrap();

    client.sign_up(&jane()).await.unwrap();

    match client.sign_up(&jane()).await.unwrap_err() {
        ClientError::Api { status, code, .. } => {
            assert_eq!(status, 409);
            assert_eq!(code, "USER_001");
        },
        other => panic!("unexpected error {other:?}"),
    }

    match client.sign_in("jane@x.com", "Wrong123!").await.unwrap_err() {
        ClientError::Api { status, code, message } => {
            assert_eq!(status, 401);
            assert_eq!(code, "AUTH_002");
            assert_eq!(message, "Invalid credentials");
        },
        other => panic!("unexpected error {other:?}"),
    }

    server.abort();
}

#[tokio::test]
async fn test_expired_access_token_is_refreshed_transparently() {
    let mut settings = test_settings();
    settings.jwt.access_ttl_secs = 1;
    let (base_url, server) = spawn_server_with(settings).await;
    let client = AuthClient::new(&base_url).unwrap();

    client.sign_up(&jane()).await.unwrap();
    client.sign_in("jane@x.com", "Abc12345!").await.unwrap();
    tokio::time::sleep(Duration::from_millis(1_500)).await;

    let results = futures_util::future::join_all((0..8).map(|_| client.profile())).await;
    for result in results {
        assert_eq!(result.unwrap().email, "jane@x.com");
    }

    let response = client.authenticated_call(Method::GET, "me").await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    server.abort();
}

#[tokio::test]
async fn test_refresh_without_session_is_rejected() {
    let (base_url, server) = spawn_server().await;
    let client = AuthClient::new(&base_url).unwrap();

    match client.refresh().await.unwrap_err() {
        ClientError::Refresh(RefreshError::Rejected(message)) => {
            assert_eq!(message, "Refresh token not provided");
        },
        other => panic!("unexpected error {other:?}"),
    }

    server.abort();
}
