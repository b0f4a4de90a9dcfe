use authgate_backend_lib::create_router;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;

use crate::test_utils::{body_json, cookie_pair, jane, memory_state, send, set_cookies};

const AUTH: &str = "/api/v1/auth";

fn signup_body(name: &str, email: &str, password: &str) -> serde_json::Value {
    json!({ "name": name, "email": email, "password": password })
}

#[tokio::test]
async fn test_health() {
    let app = create_router(memory_state());
    let response = send(&app, Method::GET, "/health", None, &[]).await;
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn test_signup_rejects_invalid_input() {
    let app = create_router(memory_state());
    let cases = [
        signup_body("Jane Doe", "not-an-email", "Abc12345!"),
        signup_body("Jo", "jane@x.com", "Abc12345!"),
        signup_body("Jane Doe", "jane@x.com", "short1!"),
        signup_body("Jane Doe", "jane@x.com", "NoDigitsHere!"),
        signup_body("Jane Doe", "jane@x.com", "NoSymbol123"),
        json!({ "email": "jane@x.com", "password": "Abc12345!" }),
    ];

    for body in cases {
        let response = send(&app, Method::POST, &format!("{AUTH}/signup"), Some(body.clone()), &[]).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {body}");
        assert_eq!(body_json(response).await["error"]["code"], "VAL_001");
    }
}

#[tokio::test]
async fn test_signup_rejects_non_json_body() {
    let app = create_router(memory_state());
    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("{AUTH}/signup"))
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_duplicate_signup_conflicts() {
    let app = create_router(memory_state());
    let body = serde_json::to_value(jane()).unwrap();

    let first = send(&app, Method::POST, &format!("{AUTH}/signup"), Some(body.clone()), &[]).await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = send(&app, Method::POST, &format!("{AUTH}/signup"), Some(body), &[]).await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let error = body_json(second).await;
    assert_eq!(error["error"]["code"], "USER_001");
    assert_eq!(error["error"]["message"], "User with this email already exists");
}

#[tokio::test]
async fn test_login_sets_cookie_attributes() {
    let app = create_router(memory_state());
    let body = serde_json::to_value(jane()).unwrap();
    send(&app, Method::POST, &format!("{AUTH}/signup"), Some(body), &[]).await;

    let response = send(
        &app,
        Method::POST,
        &format!("{AUTH}/login"),
        Some(json!({ "email": "jane@x.com", "password": "Abc12345!" })),
        &[],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 2);
    let access = cookies.iter().find(|c| c.starts_with("token=")).unwrap();
    let refresh = cookies.iter().find(|c| c.starts_with("refreshToken=")).unwrap();
    for cookie in [access, refresh] {
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Path=/"));
    }
    assert!(access.contains("Max-Age=3600"));
    assert!(refresh.contains("Max-Age=604800"));

    assert_eq!(body_json(response).await["message"], "Login successful");
}

#[tokio::test]
async fn test_overlong_sign_in_password_is_unauthorized() {
    let app = create_router(memory_state());
    let body = serde_json::to_value(jane()).unwrap();
    send(&app, Method::POST, &format!("{AUTH}/signup"), Some(body), &[]).await;

    let response = send(
        &app,
        Method::POST,
        &format!("{AUTH}/login"),
        Some(json!({ "email": "jane@x.com", "password": "a".repeat(200) })),
        &[],
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookies(&response).is_empty());
}

#[tokio::test]
async fn test_refresh_without_cookie() {
    let app = create_router(memory_state());
    let response = send(&app, Method::POST, &format!("{AUTH}/refresh"), None, &[]).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"]["message"], "Refresh token not provided");
}

#[tokio::test]
async fn test_rejected_refresh_clears_cookie() {
    let app = create_router(memory_state());
    let response = send(
        &app,
        Method::POST,
        &format!("{AUTH}/refresh"),
        None,
        &["refreshToken=forged.token.value".to_string()],
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(cookie_pair(&response, "refreshToken").as_deref(), Some("refreshToken="));
    assert!(set_cookies(&response)[0].contains("Max-Age=0"));
    assert_eq!(
        body_json(response).await["error"]["message"],
        "Invalid or expired refresh token"
    );
}

#[tokio::test]
async fn test_protected_routes_require_auth() {
    let app = create_router(memory_state());

    for (method, path) in [(Method::GET, "me"), (Method::POST, "me"), (Method::POST, "logout")] {
        let response = send(&app, method, &format!("{AUTH}/{path}"), None, &[]).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let error = body_json(response).await;
        assert_eq!(error["error"]["code"], "AUTH_001");
        assert_eq!(error["error"]["message"], "Authentication required");
    }
}

#[tokio::test]
async fn test_cors_preflight_allows_credentials() {
    let app = create_router(memory_state());
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri(format!("{AUTH}/login"))
        .header("origin", "http://localhost:3001")
        .header("access-control-request-method", "POST")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let headers = response.headers();
    assert_eq!(
        headers.get("access-control-allow-origin").unwrap(),
        "http://localhost:3001"
    );
    assert_eq!(headers.get("access-control-allow-credentials").unwrap(), "true");
}
