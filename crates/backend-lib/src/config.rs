// ============================
// crates/backend-lib/src/config.rs
// ============================
//! Configuration management.
//!
//! Settings are read exactly once at startup and handed to each
//! component's constructor. No module reads ambient process state on
//! its own.
use crate::error::AppError;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use pms_common::AuthMode;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Identity store root directory
    pub data_dir: PathBuf,
    /// Session store root directory, shared across server instances
    pub session_dir: PathBuf,
    /// Log level filter
    pub log_level: String,
    /// Which credential proof this deployment issues
    pub auth_mode: AuthMode,
    /// Token signing secret. Mandatory in token mode; its absence is a
    /// fatal startup condition.
    pub token_secret: Option<String>,
    /// Session TTL in seconds (absolute, refreshed only on re-login)
    pub session_ttl_secs: u64,
    /// Bearer token TTL in seconds
    pub token_ttl_secs: u64,
    /// scrypt cost parameter (log2 N)
    pub scrypt_log_n: u8,
    /// scrypt block size
    pub scrypt_r: u32,
    /// scrypt parallelism
    pub scrypt_p: u32,
    /// Deadline for a single store operation, in milliseconds
    pub store_timeout_ms: u64,
    /// Failed logins from one address before it is locked out
    pub login_max_attempts: u32,
    /// Lockout duration in seconds
    pub login_lockout_secs: u64,
    /// Which profile field carries the unique identity key
    /// ("email" or "service_number")
    pub unique_key_field: String,
    /// Profile fields that must be present and non-empty at registration
    pub required_profile_fields: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".parse().unwrap(),
            data_dir: PathBuf::from("data"),
            session_dir: PathBuf::from("data/sessions"),
            log_level: "info".to_string(),
            auth_mode: AuthMode::Session,
            token_secret: None,
            session_ttl_secs: 60 * 60 * 24 * 7, // 7 days
            token_ttl_secs: 60 * 60 * 24 * 7,   // 7 days
            scrypt_log_n: 15,
            scrypt_r: 8,
            scrypt_p: 1,
            store_timeout_ms: 5_000,
            login_max_attempts: 5,
            login_lockout_secs: 5 * 60,
            unique_key_field: "email".to_string(),
            required_profile_fields: vec![
                "surname".to_string(),
                "firstname".to_string(),
                "gender".to_string(),
                "service_number".to_string(),
                "state".to_string(),
                "lga".to_string(),
                "passport_url".to_string(),
                "email".to_string(),
            ],
        }
    }
}

impl Settings {
    /// Load settings from `config.toml` and `PMS_`-prefixed environment
    /// variables, over the built-in defaults.
    pub fn load() -> Result<Self, AppError> {
        Self::load_from("config.toml")
    }

    /// Load settings with an explicit config file path
    pub fn load_from(path: &str) -> Result<Self, AppError> {
        let settings: Settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("PMS_"))
            .extract()
            .map_err(|e| AppError::Config(e.to_string()))?;
        Ok(settings)
    }

    /// Reject configurations the server cannot start with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.auth_mode == AuthMode::Token
            && self
                .token_secret
                .as_deref()
                .map_or(true, |s| s.trim().is_empty())
        {
            return Err(AppError::Config(
                "token mode requires a non-empty token_secret".to_string(),
            ));
        }
        if self.session_ttl_secs == 0 || self.token_ttl_secs == 0 {
            return Err(AppError::Config("TTLs must be non-zero".to_string()));
        }
        if self.store_timeout_ms == 0 {
            return Err(AppError::Config(
                "store_timeout_ms must be non-zero".to_string(),
            ));
        }
        if self.login_max_attempts == 0 || self.login_lockout_secs == 0 {
            return Err(AppError::Config(
                "login rate limit settings must be non-zero".to_string(),
            ));
        }
        if !self
            .required_profile_fields
            .iter()
            .any(|f| f == &self.unique_key_field)
        {
            return Err(AppError::Config(format!(
                "unique_key_field '{}' is not a required profile field",
                self.unique_key_field
            )));
        }
        // Validated properly by Params::new when the hasher is built;
        // catch the obvious zero here so the message names the setting.
        if self.scrypt_log_n == 0 || self.scrypt_r == 0 || self.scrypt_p == 0 {
            return Err(AppError::Config(
                "scrypt parameters must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.auth_mode, AuthMode::Session);
        assert_eq!(settings.unique_key_field, "email");
        assert_eq!(settings.session_ttl_secs, 60 * 60 * 24 * 7);
    }

    #[test]
    fn test_token_mode_requires_secret() {
        let settings = Settings {
            auth_mode: AuthMode::Token,
            token_secret: None,
            ..Settings::default()
        };
        assert!(matches!(settings.validate(), Err(AppError::Config(_))));

        let settings = Settings {
            auth_mode: AuthMode::Token,
            token_secret: Some("   ".to_string()),
            ..Settings::default()
        };
        assert!(matches!(settings.validate(), Err(AppError::Config(_))));

        let settings = Settings {
            auth_mode: AuthMode::Token,
            token_secret: Some("a-long-enough-secret".to_string()),
            ..Settings::default()
        };
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_session_mode_does_not_require_secret() {
        let settings = Settings {
            auth_mode: AuthMode::Session,
            token_secret: None,
            ..Settings::default()
        };
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_unique_key_field_must_be_required() {
        let settings = Settings {
            unique_key_field: "nickname".to_string(),
            ..Settings::default()
        };
        assert!(matches!(settings.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_zero_rate_limit_rejected() {
        let settings = Settings {
            login_max_attempts: 0,
            ..Settings::default()
        };
        assert!(matches!(settings.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let settings = Settings {
            session_ttl_secs: 0,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }
}
