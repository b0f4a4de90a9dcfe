// ============================
// crates/backend-lib/src/auth/ledger.rs
// ============================
//! Refresh token ledger.
//!
//! The per-user set of currently valid refresh tokens. A refresh token is only
//! honoured while it is a member of its holder's set, which makes stateless
//! tokens revocable before their natural expiry.
use std::sync::Arc;

use crate::storage::{StoreError, User, UserStore};

pub struct RefreshLedger<S> {
    store: Arc<S>,
}

impl<S: UserStore> RefreshLedger<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Add `token` to the user's set
    pub async fn record(&self, user_id: &str, token: &str) -> Result<(), StoreError> {
        self.store.push_refresh_token(user_id, token).await
    }

    /// Remove exactly `token`. Returns `false` if it was not in the set.
    pub async fn revoke(&self, user_id: &str, token: &str) -> Result<bool, StoreError> {
        self.store.pull_refresh_token(user_id, token).await
    }

    /// Drop every refresh token of the user
    pub async fn revoke_all(&self, user_id: &str) -> Result<(), StoreError> {
        self.store.clear_refresh_tokens(user_id).await
    }

    /// The user currently holding `token`, if it has not been revoked
    pub async fn holder(&self, token: &str) -> Result<Option<User>, StoreError> {
        self.store.find_by_refresh_token(token).await
    }
}
