// ============================
// crates/backend-lib/src/auth/credentials.rs
// ============================
//! Credential store: user registration, lookup and password verification.
use std::sync::Arc;

use crate::auth::password::{hash_password_secure, verify_password};
use crate::config::PasswordSettings;
use crate::error::AppError;
use crate::storage::{NewUser, StoreError, User, UserStore};

/// Owns user records and password hashes
pub struct CredentialStore<S> {
    store: Arc<S>,
    scrypt_log_n: u8,
}

impl<S: UserStore> CredentialStore<S> {
    pub fn new(store: Arc<S>, settings: &PasswordSettings) -> Self {
        Self {
            store,
            scrypt_log_n: settings.scrypt_log_n,
        }
    }

    /// Register a new user with a salted scrypt hash of `password`.
    /// Fails with `DuplicateUser` when the email is already taken.
    pub async fn register(&self, name: &str, email: &str, password: String) -> Result<User, AppError> {
        // Cheap pre-check so duplicates don't pay for a hash; `insert` re-checks atomically.
        if self.store.find_by_email(email).await?.is_some() {
            tracing::warn!(email, "user creation failed: email already exists");
            return Err(AppError::DuplicateUser);
        }

        let log_n = self.scrypt_log_n;
        let password_hash = tokio::task::spawn_blocking(move || {
            let mut password = password;
            hash_password_secure(&mut password, log_n)
        })
        .await?
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))?;

        let user = self
            .store
            .insert(NewUser {
                name: name.to_string(),
                email: email.to_string(),
                password_hash,
            })
            .await
            .map_err(|e| {
                if !matches!(e, StoreError::DuplicateEmail(_)) {
                    tracing::error!(email, error = %e, "failed to save user");
                }
                AppError::from(e)
            })?;

        tracing::info!(user_id = %user.id, email = %user.email, "user created");
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.store.find_by_email(email).await
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        self.store.find_by_id(id).await
    }

    /// Compare `plain` against a stored hash off the async runtime.
    /// Any failure, including a malformed hash, yields `false`.
    pub async fn verify_password(&self, plain: &str, hash: &str) -> bool {
        let plain = plain.to_string();
        let hash = hash.to_string();
        match tokio::task::spawn_blocking(move || verify_password(&hash, &plain)).await {
            Ok(valid) => valid,
            Err(e) => {
                tracing::error!(error = %e, "password verification task failed");
                false
            },
        }
    }
}
