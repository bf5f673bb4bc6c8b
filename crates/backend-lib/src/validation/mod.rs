// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! Registration input validation.

use crate::error::AppError;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321 SMTP limit
const MAX_FIELD_LENGTH: usize = 512;

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());

/// Require a profile field to be present and non-empty after trimming.
/// Returns the trimmed value.
pub fn require_field(
    profile: &HashMap<String, String>,
    field: &str,
) -> Result<String, AppError> {
    let value = profile
        .get(field)
        .map(|v| v.trim())
        .unwrap_or_default();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    if value.len() > MAX_FIELD_LENGTH {
        return Err(AppError::Validation(format!(
            "{field} must be at most {MAX_FIELD_LENGTH} characters"
        )));
    }
    Ok(value.to_string())
}

/// Require a non-empty password (trimmed)
pub fn require_password(password: &str) -> Result<(), AppError> {
    if password.trim().is_empty() {
        return Err(AppError::Validation("password is required".to_string()));
    }
    Ok(())
}

/// Validate an email address
pub fn validate_email(email: &str) -> Result<(), AppError> {
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(AppError::Validation(format!(
            "email must be at most {MAX_EMAIL_LENGTH} characters"
        )));
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err(AppError::Validation(
            "email address is malformed".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_field() {
        let mut profile = HashMap::new();
        profile.insert("surname".to_string(), "  Okoro  ".to_string());
        profile.insert("gender".to_string(), "   ".to_string());

        assert_eq!(require_field(&profile, "surname").unwrap(), "Okoro");
        assert!(matches!(
            require_field(&profile, "gender"),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            require_field(&profile, "state"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_require_password() {
        assert!(require_password("secret1").is_ok());
        assert!(require_password("").is_err());
        assert!(require_password("   ").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("a@x.com").is_ok());
        assert!(validate_email("first.last+tag@sub.domain.ng").is_ok());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("missing@tld").is_err());
        assert!(validate_email("@x.com").is_err());
    }

    #[test]
    fn test_overlong_email_rejected() {
        let local = "a".repeat(250);
        assert!(validate_email(&format!("{local}@x.com")).is_err());
    }
}
