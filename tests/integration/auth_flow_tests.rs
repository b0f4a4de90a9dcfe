use authgate_backend_lib::{auth::SessionState, create_router};
use axum::http::{Method, StatusCode};
use serde_json::json;

use crate::test_utils::{body_json, cookie_pair, jane, send, setup_test_env};

const AUTH: &str = "/api/v1/auth";

#[tokio::test]
async fn test_full_session_lifecycle() {
    let (state, _temp_dir) = setup_test_env().await;
    let sessions = state.sessions.clone();
    let app = create_router(state);

    // Register
    let response = send(
        &app,
        Method::POST,
        &format!("{AUTH}/signup"),
        Some(serde_json::to_value(jane()).unwrap()),
        &[],
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "User created successfully. Please login to continue.");
    let user = &body["user"];
    assert!(user["_id"].as_str().is_some_and(|id| !id.is_empty()));
    assert_eq!(user["email"], "jane@x.com");
    assert_eq!(user["name"], "Jane Doe");
    assert!(user.get("password").is_none());
    assert!(user.get("password_hash").is_none());

    // Wrong password
    let response = send(
        &app,
        Method::POST,
        &format!("{AUTH}/login"),
        Some(json!({ "email": "jane@x.com", "password": "Wrong123!" })),
        &[],
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let error = body_json(response).await;
    assert_eq!(error["error"]["code"], "AUTH_002");
    assert_eq!(error["error"]["message"], "Invalid credentials");

    // Unknown user fails the same way
    let response = send(
        &app,
        Method::POST,
        &format!("{AUTH}/login"),
        Some(json!({ "email": "john@x.com", "password": "Abc12345!" })),
        &[],
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"]["code"], "AUTH_002");

    // Sign in
    let response = send(
        &app,
        Method::POST,
        &format!("{AUTH}/login"),
        Some(json!({ "email": "jane@x.com", "password": "Abc12345!" })),
        &[],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let access = cookie_pair(&response, "token").unwrap();
    let refresh = cookie_pair(&response, "refreshToken").unwrap();

    // Profile
    let response = send(&app, Method::GET, &format!("{AUTH}/me"), None, &[access.clone()]).await;
    assert_eq!(response.status(), StatusCode::OK);
    let profile = body_json(response).await;
    assert_eq!(profile["user"]["email"], "jane@x.com");
    assert_eq!(profile["user"]["name"], "Jane Doe");
    assert!(profile["user"]["_id"].is_string());

    // Profile without credential
    let response = send(&app, Method::GET, &format!("{AUTH}/me"), None, &[]).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Refresh
    let response = send(&app, Method::POST, &format!("{AUTH}/refresh"), None, &[refresh.clone()]).await;
    assert_eq!(response.status(), StatusCode::OK);
    let fresh_access = cookie_pair(&response, "token").unwrap();
    assert_eq!(body_json(response).await["message"], "Token refreshed successfully");

    let refresh_value = refresh.trim_start_matches("refreshToken=").to_string();
    assert_eq!(
        sessions.session_state(None, Some(&refresh_value)).await,
        SessionState::RefreshRequired
    );

    // Logout
    let response = send(
        &app,
        Method::POST,
        &format!("{AUTH}/logout"),
        None,
        &[fresh_access.clone(), refresh.clone()],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(cookie_pair(&response, "token").as_deref(), Some("token="));
    assert_eq!(cookie_pair(&response, "refreshToken").as_deref(), Some("refreshToken="));
    assert_eq!(body_json(response).await["message"], "Logout successful");

    // The revoked refresh token no longer works
    let response = send(&app, Method::POST, &format!("{AUTH}/refresh"), None, &[refresh]).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        sessions.session_state(None, Some(&refresh_value)).await,
        SessionState::Expired
    );
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    let (state, _temp_dir) = setup_test_env().await;
    let app = create_router(state);

    send(
        &app,
        Method::POST,
        &format!("{AUTH}/signup"),
        Some(serde_json::to_value(jane()).unwrap()),
        &[],
    )
    .await;
    let response = send(
        &app,
        Method::POST,
        &format!("{AUTH}/login"),
        Some(json!({ "email": "jane@x.com", "password": "Abc12345!" })),
        &[],
    )
    .await;
    let access = cookie_pair(&response, "token").unwrap();
    let refresh = cookie_pair(&response, "refreshToken").unwrap();

    for _ in 0..2 {
        let response = send(
            &app,
            Method::POST,
            &format!("{AUTH}/logout"),
            None,
            &[access.clone(), refresh.clone()],
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    // Without a refresh cookie logout still succeeds
    let response = send(&app, Method::POST, &format!("{AUTH}/logout"), None, &[access]).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_parallel_sessions_are_revoked_independently() {
    let (state, _temp_dir) = setup_test_env().await;
    let app = create_router(state);

    send(
        &app,
        Method::POST,
        &format!("{AUTH}/signup"),
        Some(serde_json::to_value(jane()).unwrap()),
        &[],
    )
    .await;

    let login_uri = format!("{AUTH}/login");
    let logins = futures_util::future::join_all((0..4).map(|_| {
        send(
            &app,
            Method::POST,
            &login_uri,
            Some(json!({ "email": "jane@x.com", "password": "Abc12345!" })),
            &[],
        )
    }))
    .await;

    let sessions: Vec<(String, String)> = logins
        .iter()
        .map(|response| {
            assert_eq!(response.status(), StatusCode::OK);
            (
                cookie_pair(response, "token").unwrap(),
                cookie_pair(response, "refreshToken").unwrap(),
            )
        })
        .collect();

    let (access, refresh) = &sessions[0];
    let response = send(
        &app,
        Method::POST,
        &format!("{AUTH}/logout"),
        None,
        &[access.clone(), refresh.clone()],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, Method::POST, &format!("{AUTH}/refresh"), None, &[refresh.clone()]).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    for (_, refresh) in &sessions[1..] {
        let response = send(&app, Method::POST, &format!("{AUTH}/refresh"), None, &[refresh.clone()]).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
