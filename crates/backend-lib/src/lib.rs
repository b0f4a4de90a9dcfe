// ============================
// authgate-backend-lib/src/lib.rs
// ============================
//! Core backend-lib functionality for the authgate server.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod router;
pub mod storage;
pub mod validation;

use std::sync::Arc;

use crate::auth::{CookieConfig, SessionManager};
use crate::config::Settings;
use crate::storage::UserStore;

pub use router::create_router;

/// Application state shared across all handlers
pub struct AppState<S> {
    /// Session lifecycle
    pub sessions: Arc<SessionManager<S>>,
    /// Settings the server was started with
    pub settings: Arc<Settings>,
    /// Credential cookie attributes
    pub cookies: Arc<CookieConfig>,
}

// Derived Clone would require `S: Clone`.
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            sessions: Arc::clone(&self.sessions),
            settings: Arc::clone(&self.settings),
            cookies: Arc::clone(&self.cookies),
        }
    }
}

impl<S: UserStore> AppState<S> {
    /// Create a new application state over `store`
    pub fn new(store: Arc<S>, settings: Settings) -> Self {
        let sessions = Arc::new(SessionManager::new(store, &settings));
        let cookies = Arc::new(CookieConfig::from_settings(&settings));
        Self {
            sessions,
            settings: Arc::new(settings),
            cookies,
        }
    }
}
