// ============================
// crates/backend-lib/src/lib.rs
// ============================
//! Core backend-lib functionality for the personnel registry server:
//! identity registration, credential storage and the session/token
//! authentication strategies.

pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod registration;
pub mod router;
pub mod store;
pub mod validation;

use crate::auth::{
    AuthGateway, AuthRateLimiter, BearerIssuer, CredentialIssuer, PasswordHasher, SessionIssuer,
    SessionManager, TokenIssuer,
};
use crate::config::Settings;
use crate::error::AppError;
use crate::registration::RegistrationService;
use crate::store::{FlatFileIdentityStore, IdentityStore};
use pms_common::AuthMode;
use std::sync::Arc;
use std::time::Duration;

/// Application state shared across all handlers
pub struct AppState {
    /// Registration service
    pub registration: RegistrationService,
    /// Auth gateway with the configured credential issuer
    pub gateway: AuthGateway,
    /// Login rate limiter
    pub rate_limiter: Arc<AuthRateLimiter>,
    /// Settings manager
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Create the application state from validated settings.
    ///
    /// Exactly one credential issuer is constructed here, per the
    /// configured deployment mode; the choice is never revisited at
    /// request time.
    pub fn new(settings: Settings) -> Result<Self, AppError> {
        settings.validate()?;
        let settings = Arc::new(settings);
        let op_timeout = Duration::from_millis(settings.store_timeout_ms);

        let store: Arc<dyn IdentityStore> = Arc::new(
            FlatFileIdentityStore::new(&settings.data_dir, op_timeout)
                .map_err(|e| AppError::Store(e.to_string()))?,
        );

        let hasher =
            PasswordHasher::new(settings.scrypt_log_n, settings.scrypt_r, settings.scrypt_p)?;

        let issuer: Arc<dyn CredentialIssuer> = match settings.auth_mode {
            AuthMode::Session => {
                let sessions = SessionManager::new(
                    &settings.session_dir,
                    Duration::from_secs(settings.session_ttl_secs),
                    op_timeout,
                )
                .map_err(|e| AppError::Store(e.to_string()))?;
                Arc::new(SessionIssuer::new(sessions))
            },
            AuthMode::Token => {
                // validate() already guaranteed the secret is present
                let secret = settings
                    .token_secret
                    .as_deref()
                    .ok_or_else(|| AppError::Config("token_secret is required".to_string()))?;
                let tokens =
                    TokenIssuer::new(secret, Duration::from_secs(settings.token_ttl_secs));
                Arc::new(BearerIssuer::new(tokens, Arc::clone(&store)))
            },
        };

        let registration =
            RegistrationService::new(Arc::clone(&store), hasher.clone(), Arc::clone(&settings));
        let gateway = AuthGateway::new(store, hasher, issuer)?;

        let rate_limiter = Arc::new(AuthRateLimiter::new(
            settings.login_max_attempts,
            Duration::from_secs(settings.login_lockout_secs),
        ));

        Ok(Self {
            registration,
            gateway,
            rate_limiter,
            settings,
        })
    }
}
