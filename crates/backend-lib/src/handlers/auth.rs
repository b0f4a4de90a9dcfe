// ============================
// crates/backend-lib/src/handlers/auth.rs
// ============================
//! Handlers for the `/auth` routes.
use authgate_common::{
    MessageResponse, ProfileResponse, SignInRequest, SignUpRequest, SignUpResponse,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse, Response},
    Json,
};

use crate::error::{AppError, REFRESH_TOKEN_MISSING};
use crate::middleware::AuthUser;
use crate::storage::UserStore;
use crate::validation::{validate_signin, validate_signup, ValidationError};
use crate::AppState;

pub const SIGNUP_MESSAGE: &str = "User created successfully. Please login to continue.";
pub const LOGIN_MESSAGE: &str = "Login successful";
pub const REFRESH_MESSAGE: &str = "Token refreshed successfully";
pub const LOGOUT_MESSAGE: &str = "Logout successful";

/// Unwrap a JSON body, turning extractor rejections into validation errors
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ValidationError::MalformedBody(rejection.body_text()).into())
}

/// `POST /auth/signup`
pub async fn signup<S: UserStore>(
    State(state): State<AppState<S>>,
    body: Result<Json<SignUpRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SignUpResponse>), AppError> {
    let request = json_body(body)?;
    validate_signup(&request, &state.settings.password.requirements())?;
    tracing::info!(email = %request.email, "sign-up request received");

    let SignUpRequest {
        name,
        email,
        password,
    } = request;
    let user = state.sessions.sign_up(&name, &email, password).await?;

    Ok((
        StatusCode::CREATED,
        Json(SignUpResponse {
            message: SIGNUP_MESSAGE.to_string(),
            user: user.to_public(),
        }),
    ))
}

/// `POST /auth/login`
pub async fn login<S: UserStore>(
    State(state): State<AppState<S>>,
    body: Result<Json<SignInRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let request = json_body(body)?;
    validate_signin(&request, &state.settings.password.requirements())?;
    tracing::info!(email = %request.email, "sign-in request received");

    let session = state.sessions.sign_in(&request.email, &request.password).await?;

    Ok((
        AppendHeaders([
            (SET_COOKIE, state.cookies.access_cookie(&session.access_token).to_string()),
            (SET_COOKIE, state.cookies.refresh_cookie(&session.refresh_token).to_string()),
        ]),
        Json(MessageResponse::new(LOGIN_MESSAGE)),
    )
        .into_response())
}

/// `POST /auth/refresh`
///
/// A rejected refresh token is also cleared from the browser.
pub async fn refresh<S: UserStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let refresh_token = state
        .cookies
        .refresh_token(&headers)
        .ok_or(AppError::Unauthorized(REFRESH_TOKEN_MISSING))?;

    let response = match state.sessions.refresh(&refresh_token).await {
        Ok(access_token) => (
            AppendHeaders([(SET_COOKIE, state.cookies.access_cookie(&access_token).to_string())]),
            Json(MessageResponse::new(REFRESH_MESSAGE)),
        )
            .into_response(),
        Err(err) => (
            AppendHeaders([(SET_COOKIE, state.cookies.clear_refresh_cookie().to_string())]),
            err,
        )
            .into_response(),
    };

    Ok(response)
}

/// `POST /auth/logout`, behind the auth gate
pub async fn logout<S: UserStore>(
    State(state): State<AppState<S>>,
    user: AuthUser,
    headers: HeaderMap,
) -> Response {
    let refresh_token = state.cookies.refresh_token(&headers);
    state.sessions.logout(&user.id, refresh_token.as_deref()).await;

    (
        AppendHeaders([
            (SET_COOKIE, state.cookies.clear_access_cookie().to_string()),
            (SET_COOKIE, state.cookies.clear_refresh_cookie().to_string()),
        ]),
        Json(MessageResponse::new(LOGOUT_MESSAGE)),
    )
        .into_response()
}

/// `GET /auth/me`, behind the auth gate
pub async fn me(user: AuthUser) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        user: user.summary(),
    })
}
