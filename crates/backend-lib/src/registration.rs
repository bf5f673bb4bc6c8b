// ============================
// crates/backend-lib/src/registration.rs
// ============================
//! Registration service: input completeness, identity uniqueness,
//! password hashing, persistence.
use crate::auth::password::PasswordHasher;
use crate::config::Settings;
use crate::error::AppError;
use crate::metrics::IDENTITY_REGISTERED;
use crate::store::{normalize_key, IdentityStore, NewIdentity};
use crate::validation;
use metrics::counter;
use pms_common::{RegisterRequest, BASELINE_TIER};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Registers new identity records.
///
/// Self-registration always lands on the baseline tier; only the
/// administrative entry point may assign a status. (The mixed
/// precedents in earlier deployments are resolved in favor of the
/// self-signup behavior: status is server-assigned, never client
/// input.)
pub struct RegistrationService {
    store: Arc<dyn IdentityStore>,
    hasher: PasswordHasher,
    settings: Arc<Settings>,
}

impl RegistrationService {
    pub fn new(
        store: Arc<dyn IdentityStore>,
        hasher: PasswordHasher,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            store,
            hasher,
            settings,
        }
    }

    /// Self-service registration. Status is forced to the baseline
    /// tier regardless of request content.
    pub async fn register(&self, request: RegisterRequest) -> Result<Uuid, AppError> {
        self.register_inner(request, BASELINE_TIER).await
    }

    /// Administrative registration with an explicit status tier.
    pub async fn register_with_status(
        &self,
        request: RegisterRequest,
        status: u8,
    ) -> Result<Uuid, AppError> {
        self.register_inner(request, status).await
    }

    async fn register_inner(
        &self,
        mut request: RegisterRequest,
        status: u8,
    ) -> Result<Uuid, AppError> {
        // 1. All required fields must be non-empty after trimming.
        //    Trimmed values are what gets persisted.
        let mut profile = HashMap::new();
        for field in &self.settings.required_profile_fields {
            profile.insert(field.clone(), validation::require_field(&request.profile, field)?);
        }
        // Optional fields (othername, religion, ...) survive as given
        for (field, value) in &request.profile {
            profile
                .entry(field.clone())
                .or_insert_with(|| value.trim().to_string());
        }
        validation::require_password(&request.password)?;

        // 2. Extract and normalize the configured unique key
        let raw_key = &profile[&self.settings.unique_key_field];
        if self.settings.unique_key_field == "email" {
            validation::validate_email(raw_key)?;
        }
        let key = normalize_key(raw_key);

        // 3. Friendly duplicate pre-check. Not atomic with the insert;
        //    the store's exclusive claim below is what actually closes
        //    the race.
        if self.store.find_by_unique_key(&key).await?.is_some() {
            return Err(AppError::Conflict(key));
        }

        // 4. Hash the password, wiping the plaintext
        let password_hash = self.hasher.hash_secure(&mut request.password)?;

        // 5. Persist; a concurrent registration of the same key loses
        //    here with the same Conflict the pre-check would have given
        let identity = self
            .store
            .insert(NewIdentity {
                unique_key: key,
                password_hash,
                profile,
                status,
            })
            .await?;

        counter!(IDENTITY_REGISTERED).increment(1);
        tracing::info!(identity = %identity.id, "identity registered");
        Ok(identity.id)
    }
}
