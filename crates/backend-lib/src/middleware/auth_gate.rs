// ============================
// crates/backend-lib/src/middleware/auth_gate.rs
// ============================
//! Authorization gate in front of protected routes.
//!
//! Reads the access token from its cookie, verifies it and attaches the
//! resolved identity to the request. Every failure is answered with the same
//! generic 401; the token error kind is only logged.
use authgate_common::UserSummary;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use metrics::counter;

use crate::auth::tokens::{fingerprint, Claims};
use crate::error::{AppError, AUTH_REQUIRED, INVALID_OR_EXPIRED_TOKEN};
use crate::metrics::GATE_REJECTED;
use crate::storage::UserStore;
use crate::AppState;

/// Identity of the caller, attached by [`require_auth`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
}

impl AuthUser {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
        }
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            name: claims.name,
        }
    }
}

/// Admit the request only with a valid access token. Never touches storage.
pub async fn require_auth<S: UserStore>(
    State(state): State<AppState<S>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(token) = state.cookies.access_token(request.headers()) else {
        counter!(GATE_REJECTED).increment(1);
        return Err(AppError::Unauthorized(AUTH_REQUIRED));
    };

    let claims = state.sessions.authenticate(&token).map_err(|e| {
        tracing::debug!(token = %fingerprint(&token), error = %e, "access token rejected");
        counter!(GATE_REJECTED).increment(1);
        AppError::Unauthorized(INVALID_OR_EXPIRED_TOKEN)
    })?;

    request.extensions_mut().insert(AuthUser::from(claims));
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AppError::Unauthorized(AUTH_REQUIRED))
    }
}
