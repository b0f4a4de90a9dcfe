// ============================
// crates/backend-lib/src/auth/cookies.rs
// ============================
//! HttpOnly cookies carrying the access and refresh tokens.
use std::time::Duration;

use axum::http::{header::COOKIE, HeaderMap};
use cookie::{Cookie, SameSite};

use crate::config::Settings;

/// Names and attributes of the two credential cookies
#[derive(Debug, Clone)]
pub struct CookieConfig {
    /// Set the Secure flag. Off only for plain-HTTP development.
    pub secure: bool,
    pub path: String,
    pub access_name: String,
    pub refresh_name: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl CookieConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            secure: settings.cookies.secure,
            path: settings.cookies.path.clone(),
            access_name: settings.cookies.access_name.clone(),
            refresh_name: settings.cookies.refresh_name.clone(),
            access_ttl: settings.access_ttl(),
            refresh_ttl: settings.refresh_ttl(),
        }
    }

    /// Cookie holding a freshly issued access token
    pub fn access_cookie(&self, token: &str) -> Cookie<'static> {
        self.build(self.access_name.clone(), token.to_string(), self.access_ttl)
    }

    /// Cookie holding a freshly issued refresh token
    pub fn refresh_cookie(&self, token: &str) -> Cookie<'static> {
        self.build(self.refresh_name.clone(), token.to_string(), self.refresh_ttl)
    }

    /// Expired cookie that makes the browser drop the access token
    pub fn clear_access_cookie(&self) -> Cookie<'static> {
        self.removal(self.access_name.clone())
    }

    /// Expired cookie that makes the browser drop the refresh token
    pub fn clear_refresh_cookie(&self) -> Cookie<'static> {
        self.removal(self.refresh_name.clone())
    }

    pub fn access_token(&self, headers: &HeaderMap) -> Option<String> {
        extract_cookie(headers, &self.access_name)
    }

    pub fn refresh_token(&self, headers: &HeaderMap) -> Option<String> {
        extract_cookie(headers, &self.refresh_name)
    }

    fn build(&self, name: String, value: String, ttl: Duration) -> Cookie<'static> {
        let max_age = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        Cookie::build((name, value))
            .path(self.path.clone())
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Strict)
            .max_age(cookie::time::Duration::seconds(max_age))
            .build()
    }

    fn removal(&self, name: String) -> Cookie<'static> {
        let mut cookie = Cookie::build((name, ""))
            .path(self.path.clone())
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Strict)
            .build();
        cookie.make_removal();
        cookie
    }
}

/// Value of the named cookie across all `Cookie` headers.
/// An empty value counts as absent.
pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}
