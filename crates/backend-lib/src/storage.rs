// ============================
// crates/backend-lib/src/storage.rs
// ============================
//! User storage abstraction with in-memory and flat-file implementations.
//!
//! Every mutation of a user's refresh-token set is a single-document update:
//! the memory store applies it under the map's per-entry lock and the flat-file
//! store applies it under the store's write lock before atomically replacing the
//! document on disk. Concurrent logins and logouts for the same user therefore
//! never lose each other's updates.
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use authgate_common::PublicUser;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::{fs as tokio_fs, sync::RwLock};
use uuid::Uuid;

/// Storage errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("email already registered: {0}")]
    DuplicateEmail(String),

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt user record: {0}")]
    Corrupt(String),
}

/// A persisted user record
#[derive(Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    /// Currently valid refresh tokens, oldest first
    #[serde(default)]
    pub refresh_tokens: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("name", &self.name)
            .field("refresh_tokens", &self.refresh_tokens.len())
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

impl User {
    /// The user as it may be shown to clients
    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            created_at: self.created_at,
        }
    }

    fn from_new(new_user: NewUser) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: new_user.email,
            name: new_user.name,
            password_hash: new_user.password_hash,
            refresh_tokens: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Add a token unless already present. Returns whether the set changed.
    fn push_token(&mut self, token: &str) -> bool {
        if self.refresh_tokens.iter().any(|t| t == token) {
            return false;
        }
        self.refresh_tokens.push(token.to_string());
        true
    }

    /// Remove a token if present. Returns whether the set changed.
    fn pull_token(&mut self, token: &str) -> bool {
        let before = self.refresh_tokens.len();
        self.refresh_tokens.retain(|t| t != token);
        before != self.refresh_tokens.len()
    }
}

/// Data needed to create a user. The password is already hashed.
#[derive(Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// Trait for user storage backends
#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    /// Persist a new user. Fails with `DuplicateEmail` if the email is taken.
    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;

    /// Find the user whose refresh-token set contains `token`
    async fn find_by_refresh_token(&self, token: &str) -> Result<Option<User>, StoreError>;

    /// Append one refresh token to the user's set
    async fn push_refresh_token(&self, user_id: &str, token: &str) -> Result<(), StoreError>;

    /// Remove one refresh token. Returns `false` if it was not present.
    async fn pull_refresh_token(&self, user_id: &str, token: &str) -> Result<bool, StoreError>;

    /// Empty the user's refresh-token set
    async fn clear_refresh_tokens(&self, user_id: &str) -> Result<(), StoreError>;
}

/// In-memory implementation of the `UserStore` trait
#[derive(Default)]
pub struct MemoryUserStore {
    users: DashMap<String, User>,
    /// email -> user id
    emails: DashMap<String, String>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, new_user: NewUser) -> Result<User, StoreError> {
        let user = User::from_new(new_user);
        let email = user.email.clone();

        // Publish the record first, then claim the email; losers roll back.
        self.users.insert(user.id.clone(), user.clone());
        let mut claimed = false;
        self.emails.entry(email.clone()).or_insert_with(|| {
            claimed = true;
            user.id.clone()
        });

        if !claimed {
            self.users.remove(&user.id);
            return Err(StoreError::DuplicateEmail(email));
        }

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let Some(id) = self.emails.get(email).map(|r| r.value().clone()) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|r| r.value().clone()))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(id).map(|r| r.value().clone()))
    }

    async fn find_by_refresh_token(&self, token: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.refresh_tokens.iter().any(|t| t == token))
            .map(|entry| entry.value().clone()))
    }

    async fn push_refresh_token(&self, user_id: &str, token: &str) -> Result<(), StoreError> {
        let mut user = self
            .users
            .get_mut(user_id)
            .ok_or_else(|| StoreError::UserNotFound(user_id.to_string()))?;
        user.push_token(token);
        Ok(())
    }

    async fn pull_refresh_token(&self, user_id: &str, token: &str) -> Result<bool, StoreError> {
        Ok(self
            .users
            .get_mut(user_id)
            .map(|mut user| user.pull_token(token))
            .unwrap_or(false))
    }

    async fn clear_refresh_tokens(&self, user_id: &str) -> Result<(), StoreError> {
        if let Some(mut user) = self.users.get_mut(user_id) {
            user.refresh_tokens.clear();
        }
        Ok(())
    }
}

/// Flat-file implementation of the `UserStore` trait.
///
/// Layout: `<root>/users/<id>.json`, one document per user. All documents are
/// loaded at startup and served from memory; writes go to disk first.
pub struct FlatFileUserStore {
    root: PathBuf,
    users: RwLock<HashMap<String, User>>,
}

impl FlatFileUserStore {
    /// Open (or create) a store rooted at `root` and load existing users
    pub async fn open<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        tokio_fs::create_dir_all(root.join("users")).await?;

        let mut users = HashMap::new();
        let mut entries = tokio_fs::read_dir(root.join("users")).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let content = tokio_fs::read_to_string(&path).await?;
            let user: User = serde_json::from_str(&content)
                .map_err(|e| StoreError::Corrupt(format!("{}: {e}", path.display())))?;
            users.insert(user.id.clone(), user);
        }

        tracing::info!(count = users.len(), path = %root.display(), "loaded user store");

        Ok(Self {
            root,
            users: RwLock::new(users),
        })
    }

    fn user_path(&self, id: &str) -> PathBuf {
        self.root.join("users").join(format!("{id}.json"))
    }

    /// Replace one user document on disk
    async fn persist(&self, user: &User) -> Result<(), StoreError> {
        let path = self.user_path(&user.id);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(user)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        tokio_fs::write(&tmp, json).await?;
        tokio_fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Apply `change` to one user and write the document back.
    /// `change` returns whether anything changed; unchanged documents are not rewritten.
    async fn update<F>(&self, user_id: &str, change: F) -> Result<Option<bool>, StoreError>
    where
        F: FnOnce(&mut User) -> bool + Send,
    {
        let mut users = self.users.write().await;
        let Some(current) = users.get(user_id) else {
            return Ok(None);
        };

        let mut updated = current.clone();
        if !change(&mut updated) {
            return Ok(Some(false));
        }

        self.persist(&updated).await?;
        users.insert(updated.id.clone(), updated);
        Ok(Some(true))
    }
}

#[async_trait]
impl UserStore for FlatFileUserStore {
    async fn insert(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == new_user.email) {
            return Err(StoreError::DuplicateEmail(new_user.email));
        }

        let user = User::from_new(new_user);
        self.persist(&user).await?;
        users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.get(id).cloned())
    }

    async fn find_by_refresh_token(&self, token: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.refresh_tokens.iter().any(|t| t == token))
            .cloned())
    }

    async fn push_refresh_token(&self, user_id: &str, token: &str) -> Result<(), StoreError> {
        let token = token.to_string();
        match self.update(user_id, move |user| user.push_token(&token)).await? {
            Some(_) => Ok(()),
            None => Err(StoreError::UserNotFound(user_id.to_string())),
        }
    }

    async fn pull_refresh_token(&self, user_id: &str, token: &str) -> Result<bool, StoreError> {
        let token = token.to_string();
        let removed = self
            .update(user_id, move |user| user.pull_token(&token))
            .await?;
        Ok(removed.unwrap_or(false))
    }

    async fn clear_refresh_tokens(&self, user_id: &str) -> Result<(), StoreError> {
        self.update(user_id, |user| {
            let had_tokens = !user.refresh_tokens.is_empty();
            user.refresh_tokens.clear();
            had_tokens
        })
        .await?;
        Ok(())
    }
}
