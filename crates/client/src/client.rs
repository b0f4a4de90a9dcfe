// ================
// crates/client/src/client.rs
// ================
//! HTTP client for the `/auth` routes.
//!
//! Tokens travel in HttpOnly cookies kept by reqwest's cookie jar; this client
//! never sees them. Protected calls go through the [`RefreshCoordinator`].
use std::time::Duration;

use authgate_common::{
    ErrorResponse, MessageResponse, ProfileResponse, SignInRequest, SignUpRequest,
    SignUpResponse, UserSummary,
};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::coordinator::{RefreshCoordinator, Refresher, Reply, DEFAULT_GRACE_WINDOW};
use crate::error::{ClientError, RefreshError};

impl Reply for Response {
    fn is_unauthorized(&self) -> bool {
        self.status() == StatusCode::UNAUTHORIZED
    }
}

/// Calls `POST /auth/refresh` with the cookies of the shared jar
struct HttpRefresher {
    http: reqwest::Client,
    url: String,
}

#[async_trait::async_trait]
impl Refresher for HttpRefresher {
    async fn refresh(&self) -> Result<(), RefreshError> {
        let response = self
            .http
            .post(&self.url)
            .send()
            .await
            .map_err(|e| RefreshError::Transport(e.to_string()))?;

        if response.status().is_success() {
            return Ok(());
        }
        match api_error(response).await {
            ClientError::Api { message, .. } => Err(RefreshError::Rejected(message)),
            other => Err(RefreshError::Transport(other.to_string())),
        }
    }
}

pub struct AuthClient {
    http: reqwest::Client,
    auth_url: String,
    coordinator: RefreshCoordinator<HttpRefresher>,
}

impl AuthClient {
    /// `api_base` is the server URL including the API prefix,
    /// e.g. `http://localhost:3000/api/v1`
    pub fn new(api_base: &str) -> Result<Self, ClientError> {
        Self::with_grace_window(api_base, DEFAULT_GRACE_WINDOW)
    }

    pub fn with_grace_window(api_base: &str, grace: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        let auth_url = format!("{}/auth", api_base.trim_end_matches('/'));
        let refresher = HttpRefresher {
            // Clones share the cookie jar
            http: http.clone(),
            url: format!("{auth_url}/refresh"),
        };

        Ok(Self {
            http,
            auth_url,
            coordinator: RefreshCoordinator::with_grace_window(refresher, grace),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.auth_url, path.trim_start_matches('/'))
    }

    pub async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpResponse, ClientError> {
        let response = self.http.post(self.url("signup")).json(request).send().await?;
        decode(response).await
    }

    /// Sign in; the session cookies land in the jar
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<MessageResponse, ClientError> {
        let request = SignInRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self.http.post(self.url("login")).json(&request).send().await?;
        decode(response).await
    }

    /// Refresh the access token now, joining a refresh already in flight
    pub async fn refresh(&self) -> Result<(), ClientError> {
        self.coordinator.ensure_fresh_access_token().await?;
        Ok(())
    }

    pub async fn profile(&self) -> Result<UserSummary, ClientError> {
        let response = self.authenticated_call(Method::GET, "me").await?;
        decode::<ProfileResponse>(response).await.map(|profile| profile.user)
    }

    pub async fn logout(&self) -> Result<MessageResponse, ClientError> {
        let response = self.authenticated_call(Method::POST, "logout").await?;
        decode(response).await
    }

    /// Call a protected route, refreshing and retrying once on 401
    pub async fn authenticated_call(&self, method: Method, path: &str) -> Result<Response, ClientError> {
        let url = self.url(path);
        self.coordinator
            .call(|| {
                let request = self.http.request(method.clone(), &url);
                async move { request.send().await.map_err(ClientError::from) }
            })
            .await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    if response.status().is_success() {
        return Ok(response.json::<T>().await?);
    }
    Err(api_error(response).await)
}

async fn api_error(response: Response) -> ClientError {
    let status = response.status().as_u16();
    match response.text().await {
        Ok(body) => match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(parsed) => ClientError::Api {
                status,
                code: parsed.error.code,
                message: parsed.error.message,
            },
            Err(_) => ClientError::Api {
                status,
                code: String::new(),
                message: body,
            },
        },
        Err(e) => ClientError::Http(e),
    }
}
