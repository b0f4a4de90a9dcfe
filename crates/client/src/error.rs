// ================
// crates/client/src/error.rs
// ================
//! Client error types.
use thiserror::Error;

/// Why a refresh did not produce a new access token.
/// Cloned to every caller waiting on the same refresh.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    #[error("refresh rejected: {0}")]
    Rejected(String),

    #[error("refresh request failed: {0}")]
    Transport(String),

    #[error("refresh was aborted")]
    Aborted,
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request failed with status {status}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error(transparent)]
    Refresh(#[from] RefreshError),

    #[error("session expired, please sign in again")]
    SessionExpired,
}

impl ClientError {
    /// The caller has to send the user back to sign-in
    pub fn requires_sign_in(&self) -> bool {
        matches!(
            self,
            ClientError::SessionExpired | ClientError::Refresh(RefreshError::Rejected(_))
        )
    }
}
