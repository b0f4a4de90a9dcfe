// ============================
// crates/backend-lib/src/router.rs
// ============================
//! HTTP router.
use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, Method, StatusCode},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Settings;
use crate::handlers::{auth, health};
use crate::middleware::require_auth;
use crate::storage::UserStore;
use crate::AppState;

/// Create the application router
pub fn create_router<S: UserStore>(state: AppState<S>) -> Router {
    let protected = Router::new()
        .route("/logout", post(auth::logout::<S>))
        .route("/me", get(auth::me).post(auth::me))
        .route_layer(from_fn_with_state(state.clone(), require_auth::<S>));

    let auth_routes = Router::new()
        .route("/signup", post(auth::signup::<S>))
        .route("/login", post(auth::login::<S>))
        .route("/refresh", post(auth::refresh::<S>))
        .merge(protected);

    let prefix = format!("{}/auth", state.settings.api_prefix.trim_end_matches('/'));

    Router::new()
        .route("/health", get(health))
        .nest(&prefix, auth_routes)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.settings.request_timeout(),
        ))
        .layer(cors_layer(&state.settings))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Credentialed CORS for the configured browser origins
fn cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            },
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true)
}
