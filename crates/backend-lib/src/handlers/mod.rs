// ============================
// crates/backend-lib/src/handlers/mod.rs
// ============================
//! HTTP handlers.

pub mod auth;

/// Liveness probe
pub async fn health() -> &'static str {
    "ok"
}
