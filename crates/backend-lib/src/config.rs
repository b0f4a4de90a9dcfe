// ============================
// crates/backend-lib/src/config.rs
// ============================
//! Configuration management.
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::password::DEFAULT_SCRYPT_LOG_N;
use crate::auth::PasswordRequirements;

/// Default configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Prefix of environment overrides, e.g. `AUTHGATE_JWT__SECRET`
pub const ENV_PREFIX: &str = "AUTHGATE_";

/// Shortest accepted HMAC secret, in bytes
pub const MIN_SECRET_LENGTH: usize = 32;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["pretty", "json"];

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Log level
    pub log_level: String,
    /// Log output format (`pretty` or `json`)
    pub log_format: String,
    /// Prefix mounted in front of every API route
    pub api_prefix: String,
    /// Origins allowed to make credentialed cross-origin requests
    pub cors_origins: Vec<String>,
    /// Upper bound on the lifetime of one request
    pub request_timeout_secs: u64,
    /// User storage
    pub storage: StorageSettings,
    /// Token signing
    pub jwt: JwtSettings,
    /// Credential carrier cookies
    pub cookies: CookieSettings,
    /// Password policy and hashing cost
    pub password: PasswordSettings,
}

/// Which user store backs the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    File,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    /// Data directory path (file backend only)
    pub path: PathBuf,
}

/// Token signing settings. The secret has no default and must be configured.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtSettings {
    pub secret: String,
    pub issuer: String,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
}

impl fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSettings")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieSettings {
    /// Only send cookies over HTTPS. Disable for plain-HTTP development only.
    pub secure: bool,
    pub access_name: String,
    pub refresh_name: String,
    pub path: String,
}

/// Password complexity requirements and hashing cost
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordSettings {
    /// Minimum password length
    pub min_length: usize,
    /// Require at least one letter
    pub require_letter: bool,
    /// Require digits
    pub require_digit: bool,
    /// Require special characters
    pub require_special: bool,
    /// scrypt cost parameter (log2 of N)
    pub scrypt_log_n: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            api_prefix: "/api/v1".to_string(),
            cors_origins: vec![
                "http://localhost:3001".to_string(),
                "http://localhost:3000".to_string(),
            ],
            request_timeout_secs: 30,
            storage: StorageSettings::default(),
            jwt: JwtSettings::default(),
            cookies: CookieSettings::default(),
            password: PasswordSettings::default(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            path: PathBuf::from("data"),
        }
    }
}

impl Default for JwtSettings {
    fn default() -> Self {
        Self {
            secret: String::new(),
            issuer: "authgate".to_string(),
            access_ttl_secs: 60 * 60,
            refresh_ttl_secs: 60 * 60 * 24 * 7, // 7 days
        }
    }
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            secure: true,
            access_name: "token".to_string(),
            refresh_name: "refreshToken".to_string(),
            path: "/".to_string(),
        }
    }
}

impl Default for PasswordSettings {
    fn default() -> Self {
        Self {
            min_length: 8,
            require_letter: true,
            require_digit: true,
            require_special: true,
            scrypt_log_n: DEFAULT_SCRYPT_LOG_N,
        }
    }
}

impl PasswordSettings {
    pub fn requirements(&self) -> PasswordRequirements {
        PasswordRequirements {
            min_length: self.min_length,
            require_letter: self.require_letter,
            require_digit: self.require_digit,
            require_special: self.require_special,
        }
    }
}

impl Settings {
    /// Load settings from `config.toml` (if present) and the environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load settings from a specific TOML file, then apply environment overrides.
    /// A missing file is not an error; defaults and environment still apply.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings: Settings = Self::figment(path.as_ref())
            .extract()
            .map_err(Box::new)?;
        settings.validate()?;
        Ok(settings)
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Check settings for values the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "log_level must be one of {LOG_LEVELS:?}, got '{}'",
                self.log_level
            )));
        }

        if !LOG_FORMATS.contains(&self.log_format.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "log_format must be one of {LOG_FORMATS:?}, got '{}'",
                self.log_format
            )));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }

        if self.jwt.secret.is_empty() {
            return Err(ConfigError::Invalid(
                "jwt.secret is required (set AUTHGATE_JWT__SECRET)".to_string(),
            ));
        }

        if self.jwt.secret.len() < MIN_SECRET_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "jwt.secret must be at least {MIN_SECRET_LENGTH} bytes"
            )));
        }

        if self.jwt.access_ttl_secs == 0 || self.jwt.refresh_ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "token lifetimes must be greater than zero".to_string(),
            ));
        }

        if self.jwt.refresh_ttl_secs <= self.jwt.access_ttl_secs {
            return Err(ConfigError::Invalid(
                "jwt.refresh_ttl_secs must be longer than jwt.access_ttl_secs".to_string(),
            ));
        }

        if self.password.min_length < 8 {
            return Err(ConfigError::Invalid(
                "password.min_length must be at least 8".to_string(),
            ));
        }

        if !(10..=20).contains(&self.password.scrypt_log_n) {
            return Err(ConfigError::Invalid(
                "password.scrypt_log_n must be between 10 and 20".to_string(),
            ));
        }

        if !self.api_prefix.is_empty() && !self.api_prefix.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "api_prefix must start with '/', got '{}'",
                self.api_prefix
            )));
        }

        if self.cors_origins.iter().any(|origin| origin.trim() == "*") {
            return Err(ConfigError::Invalid(
                "cors_origins cannot contain '*' when cookies are sent cross-origin".to_string(),
            ));
        }

        if self.cookies.access_name.is_empty()
            || self.cookies.refresh_name.is_empty()
            || self.cookies.access_name == self.cookies.refresh_name
        {
            return Err(ConfigError::Invalid(
                "cookie names must be non-empty and distinct".to_string(),
            ));
        }

        Ok(())
    }

    pub fn access_ttl(&self) -> Duration {
        Duration::from_secs(self.jwt.access_ttl_secs)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::from_secs(self.jwt.refresh_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
