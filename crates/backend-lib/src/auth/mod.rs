// ============================
// crates/backend-lib/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod cookies;
pub mod credentials;
pub mod ledger;
pub mod password;
pub mod session;
pub mod token_generator;
pub mod tokens;

pub use cookies::CookieConfig;
pub use credentials::CredentialStore;
pub use ledger::RefreshLedger;
pub use password::{
    validate_password_strength, verify_password, PasswordRequirements,
    MIN_PASSWORD_LENGTH,
};
pub use session::{SessionManager, SessionState, SessionTokens};
pub use token_generator::generate_signing_secret;
pub use tokens::{Claims, TokenError, TokenKind, TokenPayload, TokenService};
