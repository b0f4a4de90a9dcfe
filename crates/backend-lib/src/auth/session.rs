// ============================
// crates/backend-lib/src/auth/session.rs
// ============================
//! Session lifecycle: sign-up, sign-in, refresh and logout.
//!
//! A session is an access/refresh token pair handed out together at sign-in.
//! Access tokens are checked on signature and expiry alone. Refresh tokens
//! additionally have to be present in the holder's ledger entry, so logout
//! revokes them even though their signature stays valid until expiry.
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use authgate_common::UserSummary;
use metrics::counter;

use super::credentials::CredentialStore;
use super::ledger::RefreshLedger;
use super::tokens::{fingerprint, Claims, TokenError, TokenKind, TokenPayload, TokenService};
use crate::config::Settings;
use crate::error::{AppError, INVALID_OR_EXPIRED_TOKEN, INVALID_REFRESH_TOKEN};
use crate::metrics::{
    LOGOUT, REFRESH_FAILURE, REFRESH_SUCCESS, SIGNIN_FAILURE, SIGNIN_SUCCESS, SIGNUP,
};
use crate::storage::{User, UserStore};

/// Tokens delivered together at sign-in
#[derive(Clone)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}

impl fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokens")
            .field("access_token", &fingerprint(&self.access_token))
            .field("refresh_token", &fingerprint(&self.refresh_token))
            .finish()
    }
}

/// How usable a pair of presented credentials is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No credentials at all
    Anonymous,
    /// The access token is valid
    Active,
    /// The access token is unusable but the refresh token can mint a new one
    RefreshRequired,
    /// Credentials were presented but none of them is usable
    Expired,
}

/// Orchestrates the credential store, token service and refresh ledger
pub struct SessionManager<S> {
    credentials: CredentialStore<S>,
    tokens: TokenService,
    ledger: RefreshLedger<S>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl<S: UserStore> SessionManager<S> {
    pub fn new(store: Arc<S>, settings: &Settings) -> Self {
        Self {
            credentials: CredentialStore::new(store.clone(), &settings.password),
            tokens: TokenService::from_settings(&settings.jwt),
            ledger: RefreshLedger::new(store),
            access_ttl: settings.access_ttl(),
            refresh_ttl: settings.refresh_ttl(),
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn ledger(&self) -> &RefreshLedger<S> {
        &self.ledger
    }

    pub fn credentials(&self) -> &CredentialStore<S> {
        &self.credentials
    }

    /// Register a user. The caller still has to sign in.
    pub async fn sign_up(&self, name: &str, email: &str, password: String) -> Result<User, AppError> {
        let user = self.credentials.register(name, email, password).await?;
        counter!(SIGNUP).increment(1);
        Ok(user)
    }

    /// Check credentials and open a session.
    /// Unknown email and wrong password fail identically.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SessionTokens, AppError> {
        let user = match self.credentials.find_by_email(email).await? {
            Some(user) => user,
            None => {
                tracing::warn!(email, "sign-in failed: unknown email");
                counter!(SIGNIN_FAILURE).increment(1);
                return Err(AppError::InvalidCredentials);
            },
        };

        if !self.credentials.verify_password(password, &user.password_hash).await {
            tracing::warn!(email, user_id = %user.id, "sign-in failed: wrong password");
            counter!(SIGNIN_FAILURE).increment(1);
            return Err(AppError::InvalidCredentials);
        }

        let payload = payload_for(&user);
        let access_token = self
            .tokens
            .issue(&payload, TokenKind::Access, self.access_ttl)
            .map_err(signing_failure)?;
        let refresh_token = self
            .tokens
            .issue(&payload, TokenKind::Refresh, self.refresh_ttl)
            .map_err(signing_failure)?;

        self.ledger.record(&user.id, &refresh_token).await.map_err(|e| {
            tracing::error!(user_id = %user.id, error = %e, "failed to record refresh token");
            AppError::from(e)
        })?;

        tracing::info!(user_id = %user.id, email, "user signed in");
        counter!(SIGNIN_SUCCESS).increment(1);
        Ok(SessionTokens {
            access_token,
            refresh_token,
        })
    }

    /// Mint a new access token from a refresh token that is both correctly
    /// signed and still in the ledger. The refresh token itself is kept.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AppError> {
        let result = self.try_refresh(refresh_token).await;
        match &result {
            Ok(_) => counter!(REFRESH_SUCCESS).increment(1),
            Err(_) => counter!(REFRESH_FAILURE).increment(1),
        }
        result
    }

    async fn try_refresh(&self, refresh_token: &str) -> Result<String, AppError> {
        let claims = self.verify_refresh_token(refresh_token).map_err(|e| {
            tracing::debug!(token = %fingerprint(refresh_token), error = %e, "refresh token rejected");
            AppError::Unauthorized(INVALID_REFRESH_TOKEN)
        })?;

        let user = match self.ledger.holder(refresh_token).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                tracing::warn!(
                    user_id = %claims.sub,
                    token = %fingerprint(refresh_token),
                    "refresh token not in ledger"
                );
                return Err(AppError::Unauthorized(INVALID_REFRESH_TOKEN));
            },
            Err(e) => {
                tracing::error!(user_id = %claims.sub, error = %e, "refresh ledger lookup failed");
                return Err(AppError::Unauthorized(INVALID_REFRESH_TOKEN));
            },
        };

        // Bind to the stored record so profile changes since sign-in show up.
        let access_token = self
            .tokens
            .issue(&payload_for(&user), TokenKind::Access, self.access_ttl)
            .map_err(|e| {
                tracing::error!(user_id = %user.id, error = %e, "failed to sign access token");
                AppError::Unauthorized(INVALID_REFRESH_TOKEN)
            })?;

        tracing::debug!(user_id = %user.id, "access token refreshed");
        Ok(access_token)
    }

    /// Remove the presented refresh token from the user's ledger entry.
    /// Never fails: the session must look terminated to the client regardless.
    pub async fn logout(&self, user_id: &str, refresh_token: Option<&str>) {
        if let Some(token) = refresh_token {
            match self.ledger.revoke(user_id, token).await {
                Ok(true) => {},
                Ok(false) => {
                    tracing::debug!(user_id, token = %fingerprint(token), "refresh token already gone");
                },
                Err(e) => {
                    tracing::warn!(user_id, error = %e, "failed to remove refresh token on logout");
                },
            }
        }

        tracing::info!(user_id, "user logged out");
        counter!(LOGOUT).increment(1);
    }

    /// Revoke every session of a user
    pub async fn revoke_all_sessions(&self, user_id: &str) -> Result<(), AppError> {
        self.ledger.revoke_all(user_id).await.map_err(|e| {
            tracing::error!(user_id, error = %e, "failed to clear refresh tokens");
            AppError::from(e)
        })?;
        tracing::info!(user_id, "all sessions revoked");
        Ok(())
    }

    /// The identity carried by an access token, without reading storage
    pub fn get_profile(&self, access_token: &str) -> Result<UserSummary, AppError> {
        self.authenticate(access_token)
            .map(|claims| claims.summary())
            .map_err(|_| AppError::Unauthorized(INVALID_OR_EXPIRED_TOKEN))
    }

    /// Signature, issuer, kind and expiry check of an access token
    pub fn authenticate(&self, access_token: &str) -> Result<Claims, TokenError> {
        self.tokens.verify(access_token, TokenKind::Access)
    }

    /// Signature, issuer, kind and expiry check of a refresh token.
    /// Ledger membership is checked separately by [`RefreshLedger::holder`].
    pub fn verify_refresh_token(&self, refresh_token: &str) -> Result<Claims, TokenError> {
        self.tokens.verify(refresh_token, TokenKind::Refresh)
    }

    /// Classify presented credentials. Does not mutate anything.
    pub async fn session_state(&self, access: Option<&str>, refresh: Option<&str>) -> SessionState {
        if access.is_none() && refresh.is_none() {
            return SessionState::Anonymous;
        }

        if access.is_some_and(|token| self.authenticate(token).is_ok()) {
            return SessionState::Active;
        }

        if let Some(token) = refresh {
            if self.verify_refresh_token(token).is_ok()
                && matches!(self.ledger.holder(token).await, Ok(Some(_)))
            {
                return SessionState::RefreshRequired;
            }
        }

        SessionState::Expired
    }
}

fn payload_for(user: &User) -> TokenPayload {
    TokenPayload {
        subject: user.id.clone(),
        email: user.email.clone(),
        name: Some(user.name.clone()),
    }
}

fn signing_failure(err: TokenError) -> AppError {
    tracing::error!(error = %err, "failed to sign token");
    AppError::Internal(err.to_string())
}
