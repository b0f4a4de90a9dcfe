// ============================
// crates/backend-lib/src/auth/tokens.rs
// ============================
//! Signing and verification of stateless bearer tokens.
//!
//! Access and refresh tokens are HS256 JWTs carrying the same identity payload
//! with independent lifetimes. The service holds no per-token state; refresh
//! token revocation lives in the [`RefreshLedger`](super::RefreshLedger).
use std::time::Duration;

use authgate_common::UserSummary;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::token_generator::generate_token_id;
use crate::config::JwtSettings;

/// Distinguishes access from refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Identity asserted by a token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPayload {
    pub subject: String,
    pub email: String,
    pub name: Option<String>,
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    pub iss: String,
    pub kind: TokenKind,
    /// Unique token identifier
    pub jti: String,
}

impl Claims {
    pub fn payload(&self) -> TokenPayload {
        TokenPayload {
            subject: self.sub.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
        }
    }

    /// Identity derived purely from the token, without touching storage
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.sub.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
        }
    }
}

/// Token verification failures. `Expired` means a refresh may help;
/// the other kinds require re-authentication.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token signature is invalid")]
    Invalid,

    #[error("token has expired")]
    Expired,

    #[error("token is malformed")]
    Malformed,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Issues and verifies tokens with one process-wide secret
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
}

impl TokenService {
    pub fn new(secret: &[u8], issuer: impl Into<String>) -> Self {
        let issuer = issuer.into();

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is compared in `verify_at` so the boundary is exact.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_issuer(&[issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            issuer,
        }
    }

    pub fn from_settings(settings: &JwtSettings) -> Self {
        Self::new(settings.secret.as_bytes(), settings.issuer.clone())
    }

    /// Sign a token for `payload` valid for `ttl` from now
    pub fn issue(
        &self,
        payload: &TokenPayload,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        self.issue_at(payload, kind, ttl, now_unix())
    }

    /// Sign a token as if the current time were `now` (Unix seconds)
    pub fn issue_at(
        &self,
        payload: &TokenPayload,
        kind: TokenKind,
        ttl: Duration,
        now: i64,
    ) -> Result<String, TokenError> {
        let ttl_secs = i64::try_from(ttl.as_secs())
            .map_err(|_| TokenError::Signing("token lifetime out of range".to_string()))?;

        let claims = Claims {
            sub: payload.subject.clone(),
            email: payload.email.clone(),
            name: payload.name.clone(),
            iat: now,
            exp: now.saturating_add(ttl_secs),
            iss: self.issuer.clone(),
            kind,
            jti: generate_token_id(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify signature, issuer, kind and expiry
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, TokenError> {
        self.verify_at(token, kind, now_unix())
    }

    /// Verify as if the current time were `now`. Valid while `now < exp`.
    pub fn verify_at(&self, token: &str, kind: TokenKind, now: i64) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::InvalidIssuer
                | ErrorKind::InvalidAudience
                | ErrorKind::InvalidSubject
                | ErrorKind::ImmatureSignature => TokenError::Invalid,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            }
        })?;

        let claims = data.claims;
        if claims.kind != kind {
            return Err(TokenError::Invalid);
        }
        if now >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

/// Short suffix of a token, safe to write to logs
pub fn fingerprint(token: &str) -> String {
    let start = token.char_indices().rev().nth(5).map_or(0, |(i, _)| i);
    format!("...{}", &token[start..])
}

fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn service() -> TokenService {
        TokenService::new(SECRET, "authgate")
    }

    fn payload() -> TokenPayload {
        TokenPayload {
            subject: "user-1".to_string(),
            email: "jane@x.com".to_string(),
            name: Some("Jane Doe".to_string()),
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let service = service();
        let token = service
            .issue(&payload(), TokenKind::Access, Duration::from_secs(3600))
            .unwrap();

        let claims = service.verify(&token, TokenKind::Access).unwrap();
        assert_eq!(claims.payload(), payload());
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(claims.iss, "authgate");
    }

    #[test]
    fn test_expiry_boundary() {
        let service = service();
        let issued_at = 1_700_000_000;
        let token = service
            .issue_at(&payload(), TokenKind::Access, Duration::from_secs(60), issued_at)
            .unwrap();
        let expires_at = issued_at + 60;

        assert!(service.verify_at(&token, TokenKind::Access, expires_at - 1).is_ok());
        assert_eq!(
            service.verify_at(&token, TokenKind::Access, expires_at).unwrap_err(),
            TokenError::Expired
        );
        assert_eq!(
            service.verify_at(&token, TokenKind::Access, expires_at + 1).unwrap_err(),
            TokenError::Expired
        );
    }

    #[test]
    fn test_expired_with_real_clock() {
        let service = service();
        let token = service
            .issue_at(&payload(), TokenKind::Access, Duration::from_secs(60), 1_000)
            .unwrap();
        assert_eq!(service.verify(&token, TokenKind::Access).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = service()
            .issue(&payload(), TokenKind::Access, Duration::from_secs(60))
            .unwrap();
        let other = TokenService::new(b"another-secret-another-secret-xx", "authgate");
        assert_eq!(other.verify(&token, TokenKind::Access).unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn test_tampered_signature_is_invalid() {
        let service = service();
        let token = service
            .issue(&payload(), TokenKind::Access, Duration::from_secs(60))
            .unwrap();

        let (head, sig) = token.rsplit_once('.').unwrap();
        let mut sig: Vec<char> = sig.chars().collect();
        sig[0] = if sig[0] == 'A' { 'B' } else { 'A' };
        let tampered = format!("{head}.{}", sig.into_iter().collect::<String>());

        assert_eq!(service.verify(&tampered, TokenKind::Access).unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn test_malformed_input() {
        let service = service();
        for input in ["", "garbage", "a.b.c", "...."] {
            assert_eq!(
                service.verify(input, TokenKind::Access).unwrap_err(),
                TokenError::Malformed,
                "input {input:?}"
            );
        }
    }

    #[test]
    fn test_kind_mismatch_is_invalid() {
        let service = service();
        let refresh = service
            .issue(&payload(), TokenKind::Refresh, Duration::from_secs(60))
            .unwrap();
        assert_eq!(service.verify(&refresh, TokenKind::Access).unwrap_err(), TokenError::Invalid);
        assert!(service.verify(&refresh, TokenKind::Refresh).is_ok());
    }

    #[test]
    fn test_wrong_issuer_is_invalid() {
        let token = TokenService::new(SECRET, "someone-else")
            .issue(&payload(), TokenKind::Access, Duration::from_secs(60))
            .unwrap();
        assert_eq!(service().verify(&token, TokenKind::Access).unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn test_tokens_issued_together_are_distinct() {
        let service = service();
        let a = service.issue_at(&payload(), TokenKind::Refresh, Duration::from_secs(60), 5).unwrap();
        let b = service.issue_at(&payload(), TokenKind::Refresh, Duration::from_secs(60), 5).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_is_short() {
        assert_eq!(fingerprint("aaaa.bbbb.cccccc123456"), "...123456");
        assert_eq!(fingerprint("ab"), "...ab");
    }
}
