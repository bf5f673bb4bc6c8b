//! End-to-end flows through the registration service and auth gateway,
//! in both deployment modes.

use backend_lib::auth::AuthProof;
use backend_lib::config::Settings;
use backend_lib::error::AppError;
use backend_lib::AppState;
use pms_common::{AuthMode, RegisterRequest};
use std::collections::HashMap;
use tempfile::TempDir;
use tokio::time::{timeout, Duration};

fn test_settings(dir: &TempDir, mode: AuthMode) -> Settings {
    Settings {
        data_dir: dir.path().join("data"),
        session_dir: dir.path().join("sessions"),
        auth_mode: mode,
        token_secret: Some("integration-test-secret".to_string()),
        // Low-cost hashing keeps the tests fast
        scrypt_log_n: 8,
        ..Settings::default()
    }
}

fn register_request(email: &str) -> RegisterRequest {
    let mut profile = HashMap::new();
    for (field, value) in [
        ("surname", "Okoro"),
        ("firstname", "Chinedu"),
        ("gender", "male"),
        ("service_number", "NN/1234"),
        ("state", "Lagos"),
        ("lga", "Ikeja"),
        ("passport_url", "https://img.example/p/1.jpg"),
        ("email", email),
    ] {
        profile.insert(field.to_string(), value.to_string());
    }
    RegisterRequest {
        profile,
        password: "secret1".to_string(),
    }
}

#[tokio::test]
async fn test_session_mode_login_flow() {
    timeout(Duration::from_secs(10), async {
        let dir = TempDir::new().unwrap();
        let state = AppState::new(test_settings(&dir, AuthMode::Session)).unwrap();

        let id = state
            .registration
            .register(register_request("a@x.com"))
            .await
            .unwrap();

        let (proof, user) = state.gateway.login("a@x.com", "secret1").await.unwrap();
        assert!(matches!(proof, AuthProof::SessionCookie(_)));
        assert_eq!(user.id, id);
        assert_eq!(user.display_name, "Chinedu Okoro");

        // The issued proof resolves back to the same identity
        let resolved = state.gateway.authenticate(proof.value()).await.unwrap();
        assert_eq!(resolved.id, id);
        assert_eq!(resolved.unique_key, "a@x.com");
    })
    .await
    .expect("Test timed out");
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    timeout(Duration::from_secs(10), async {
        let dir = TempDir::new().unwrap();
        let state = AppState::new(test_settings(&dir, AuthMode::Session)).unwrap();

        state
            .registration
            .register(register_request("a@x.com"))
            .await
            .unwrap();

        // Wrong password and unknown key must yield the same error kind
        let wrong_password = state.gateway.login("a@x.com", "wrong").await.unwrap_err();
        let unknown_key = state
            .gateway
            .login("nobody@x.com", "secret1")
            .await
            .unwrap_err();

        assert!(matches!(wrong_password, AppError::InvalidCredentials));
        assert!(matches!(unknown_key, AppError::InvalidCredentials));
        assert_eq!(wrong_password.error_code(), unknown_key.error_code());
        assert_eq!(
            wrong_password.sanitized_message(),
            unknown_key.sanitized_message()
        );
    })
    .await
    .expect("Test timed out");
}

#[tokio::test]
async fn test_login_is_case_insensitive_on_the_unique_key() {
    timeout(Duration::from_secs(10), async {
        let dir = TempDir::new().unwrap();
        let state = AppState::new(test_settings(&dir, AuthMode::Session)).unwrap();

        state
            .registration
            .register(register_request("a@x.com"))
            .await
            .unwrap();

        assert!(state.gateway.login(" A@X.COM ", "secret1").await.is_ok());
    })
    .await
    .expect("Test timed out");
}

#[tokio::test]
async fn test_logout_destroys_the_session() {
    timeout(Duration::from_secs(10), async {
        let dir = TempDir::new().unwrap();
        let state = AppState::new(test_settings(&dir, AuthMode::Session)).unwrap();

        state
            .registration
            .register(register_request("a@x.com"))
            .await
            .unwrap();
        let (proof, _) = state.gateway.login("a@x.com", "secret1").await.unwrap();

        state.gateway.logout(proof.value()).await.unwrap();

        // A destroyed session is indistinguishable from an unknown one
        let destroyed = state
            .gateway
            .authenticate(proof.value())
            .await
            .unwrap_err();
        let unknown = state
            .gateway
            .authenticate("zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz")
            .await
            .unwrap_err();
        assert!(matches!(destroyed, AppError::Unauthenticated));
        assert!(matches!(unknown, AppError::Unauthenticated));
    })
    .await
    .expect("Test timed out");
}

#[tokio::test]
async fn test_token_mode_login_flow() {
    timeout(Duration::from_secs(10), async {
        let dir = TempDir::new().unwrap();
        let state = AppState::new(test_settings(&dir, AuthMode::Token)).unwrap();

        let id = state
            .registration
            .register(register_request("t@x.com"))
            .await
            .unwrap();

        let (proof, user) = state.gateway.login("t@x.com", "secret1").await.unwrap();
        let AuthProof::BearerToken(token) = &proof else {
            panic!("token mode must issue a bearer token");
        };
        assert_eq!(user.id, id);

        // The bearer token resolves without any server-side session
        let resolved = state.gateway.authenticate(token).await.unwrap();
        assert_eq!(resolved.id, id);

        // Token mode has no server-side logout
        let err = state.gateway.logout(token).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // The token remains valid until natural expiry
        assert!(state.gateway.authenticate(token).await.is_ok());
    })
    .await
    .expect("Test timed out");
}

#[tokio::test]
async fn test_token_mode_rejects_foreign_and_garbage_tokens() {
    timeout(Duration::from_secs(10), async {
        let dir = TempDir::new().unwrap();
        let state = AppState::new(test_settings(&dir, AuthMode::Token)).unwrap();

        let err = state.gateway.authenticate("garbage").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));

        // Signed by a different deployment secret
        let other_dir = TempDir::new().unwrap();
        let mut other_settings = test_settings(&other_dir, AuthMode::Token);
        other_settings.token_secret = Some("another-secret".to_string());
        let other = AppState::new(other_settings).unwrap();
        other
            .registration
            .register(register_request("t@x.com"))
            .await
            .unwrap();
        let (proof, _) = other.gateway.login("t@x.com", "secret1").await.unwrap();

        let err = state
            .gateway
            .authenticate(proof.value())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
    })
    .await
    .expect("Test timed out");
}

#[tokio::test]
async fn test_registration_race_has_exactly_one_winner() {
    timeout(Duration::from_secs(10), async {
        let dir = TempDir::new().unwrap();
        let state = AppState::new(test_settings(&dir, AuthMode::Session)).unwrap();

        let (a, b) = tokio::join!(
            state.registration.register(register_request("race@x.com")),
            state.registration.register(register_request("race@x.com")),
        );

        let winners = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(winners, 1);

        let loser = if a.is_ok() { b } else { a };
        assert!(matches!(loser.unwrap_err(), AppError::Conflict(_)));
    })
    .await
    .expect("Test timed out");
}
