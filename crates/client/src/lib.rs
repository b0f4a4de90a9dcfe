// ================
// crates/client/src/lib.rs
// ================
//! Client side of the auth server: an HTTP client for the `/auth` routes and
//! the refresh coordinator that keeps its access token fresh.

pub mod client;
pub mod coordinator;
pub mod error;

pub use client::AuthClient;
pub use coordinator::{RefreshCoordinator, Refresher, Reply, DEFAULT_GRACE_WINDOW};
pub use error::{ClientError, RefreshError};
