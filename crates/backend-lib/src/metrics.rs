// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for Prometheus metric keys
pub const SIGNUP: &str = "auth.signup";
pub const SIGNIN_SUCCESS: &str = "auth.signin.success";
pub const SIGNIN_FAILURE: &str = "auth.signin.failure";
pub const REFRESH_SUCCESS: &str = "auth.refresh.success";
pub const REFRESH_FAILURE: &str = "auth.refresh.failure";
pub const LOGOUT: &str = "auth.logout";
pub const GATE_REJECTED: &str = "auth.gate.rejected";
