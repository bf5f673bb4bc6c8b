// ============================
// crates/backend-lib/src/metrics.rs
// ============================
//! Central place for Prometheus metric keys
pub const IDENTITY_REGISTERED: &str = "identity.registered";
pub const LOGIN_SUCCESS: &str = "auth.login.success";
pub const LOGIN_FAILED: &str = "auth.login.failed";
pub const LOGIN_LOCKOUT: &str = "auth.login.lockout";
pub const SESSION_CREATED: &str = "session.created";
pub const SESSION_DESTROYED: &str = "session.destroyed";
pub const SESSION_EXPIRED: &str = "session.expired";
pub const TOKEN_ISSUED: &str = "token.issued";
