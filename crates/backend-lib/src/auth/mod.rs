// ============================
// crates/backend-lib/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod gateway;
pub mod password;
pub mod rate_limit;
pub mod session;
pub mod token;
pub mod token_generator;

pub use gateway::{AuthGateway, AuthProof, BearerIssuer, CredentialIssuer, SessionIssuer};
pub use password::PasswordHasher;
pub use rate_limit::AuthRateLimiter;
pub use session::{Session, SessionManager};
pub use token::{Claims, TokenIssuer};
pub use token_generator::generate_secure_token;
