// ================
// crates/common/src/lib.rs
// ================
//! Common types and structures
//! used for communication between the auth client and server.
//! This module defines the JSON bodies exchanged by the `/auth` endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `POST /auth/signup`
/// # Fields
/// * `name` - Display name (min 3 chars)
/// * `email` - Email address, used as the natural key
/// * `password` - Plaintext password, checked against the password policy
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SignUpRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Body of `POST /auth/login`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// A registered user as returned by signup. Never carries the password hash.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PublicUser {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Identity resolved from an access token.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Response of `POST /auth/signup`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SignUpResponse {
    pub message: String,
    pub user: PublicUser,
}

/// Response of `GET /auth/me`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ProfileResponse {
    pub user: UserSummary,
}

/// Plain acknowledgement used by login, refresh and logout
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error envelope produced by the server for every failed request
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Error code and human readable message
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}
