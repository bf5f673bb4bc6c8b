// ============================
// crates/backend-lib/src/auth/gateway.rs
// ============================
//! The auth gateway: the single decision point for one login attempt.
//!
//! Lookup and password verification failures collapse into one
//! `InvalidCredentials` signal so callers cannot enumerate valid keys.
//! Issuing the credential proof goes through the `CredentialIssuer`
//! seam; a deployment constructs exactly one implementation at startup.
use crate::auth::password::PasswordHasher;
use crate::auth::session::SessionManager;
use crate::auth::token::TokenIssuer;
use crate::error::AppError;
use crate::metrics::{LOGIN_FAILED, LOGIN_SUCCESS};
use crate::store::{self, IdentityStore};
use async_trait::async_trait;
use metrics::counter;
use pms_common::{AuthMode, IdentitySnapshot};
use std::sync::Arc;

/// The proof handed back to a freshly authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthProof {
    /// Opaque session id, delivered as an HTTP-only cookie
    SessionCookie(String),
    /// Signed bearer token, delivered in the response body
    BearerToken(String),
}

impl AuthProof {
    /// The raw token value, independent of delivery mechanism
    pub fn value(&self) -> &str {
        match self {
            AuthProof::SessionCookie(token) | AuthProof::BearerToken(token) => token,
        }
    }
}

/// Polymorphic credential issuer: stateful session or stateless token.
/// The deployment mode is fixed configuration, never negotiated per
/// request.
#[async_trait]
pub trait CredentialIssuer: Send + Sync {
    fn mode(&self) -> AuthMode;

    /// Issue a proof for an authenticated identity
    async fn issue(&self, snapshot: &IdentitySnapshot) -> Result<AuthProof, AppError>;

    /// Resolve a presented proof back to an identity view
    async fn resolve(&self, presented: &str) -> Result<IdentitySnapshot, AppError>;

    /// Invalidate a presented proof, where the strategy supports it
    async fn revoke(&self, presented: &str) -> Result<(), AppError>;
}

/// Session-mode issuer backed by the shared session store
pub struct SessionIssuer {
    sessions: SessionManager,
}

impl SessionIssuer {
    pub fn new(sessions: SessionManager) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl CredentialIssuer for SessionIssuer {
    fn mode(&self) -> AuthMode {
        AuthMode::Session
    }

    async fn issue(&self, snapshot: &IdentitySnapshot) -> Result<AuthProof, AppError> {
        let token = self.sessions.create(snapshot.clone()).await?;
        Ok(AuthProof::SessionCookie(token))
    }

    async fn resolve(&self, presented: &str) -> Result<IdentitySnapshot, AppError> {
        self.sessions.resolve(presented).await
    }

    async fn revoke(&self, presented: &str) -> Result<(), AppError> {
        self.sessions.destroy(presented).await
    }
}

/// Token-mode issuer. Resolution rebuilds the snapshot from the
/// credential store since claims only carry the id and status.
pub struct BearerIssuer {
    tokens: TokenIssuer,
    store: Arc<dyn IdentityStore>,
}

impl BearerIssuer {
    pub fn new(tokens: TokenIssuer, store: Arc<dyn IdentityStore>) -> Self {
        Self { tokens, store }
    }
}

#[async_trait]
impl CredentialIssuer for BearerIssuer {
    fn mode(&self) -> AuthMode {
        AuthMode::Token
    }

    async fn issue(&self, snapshot: &IdentitySnapshot) -> Result<AuthProof, AppError> {
        let token = self.tokens.issue(snapshot.id, snapshot.status)?;
        Ok(AuthProof::BearerToken(token))
    }

    async fn resolve(&self, presented: &str) -> Result<IdentitySnapshot, AppError> {
        let claims = self.tokens.verify(presented)?;
        let id = claims.identity_id()?;
        // A token can outlive its identity record
        let identity = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(AppError::Unauthenticated)?;
        Ok(identity.snapshot())
    }

    async fn revoke(&self, _presented: &str) -> Result<(), AppError> {
        // No server-side revocation in this design; the bearer discards
        // the token client-side at logout.
        Err(AppError::Validation(
            "logout is not available in token mode".to_string(),
        ))
    }
}

/// Auth gateway over the credential store, hasher and configured issuer
pub struct AuthGateway {
    store: Arc<dyn IdentityStore>,
    hasher: PasswordHasher,
    issuer: Arc<dyn CredentialIssuer>,
    /// Pre-computed hash burned on unknown-key lookups so both failure
    /// paths pay the verification cost (timing equalization)
    dummy_hash: String,
}

impl AuthGateway {
    pub fn new(
        store: Arc<dyn IdentityStore>,
        hasher: PasswordHasher,
        issuer: Arc<dyn CredentialIssuer>,
    ) -> Result<Self, AppError> {
        let dummy_hash = hasher.hash("gateway-timing-equalizer")?;
        Ok(Self {
            store,
            hasher,
            issuer,
            dummy_hash,
        })
    }

    /// The configured deployment mode
    pub fn mode(&self) -> AuthMode {
        self.issuer.mode()
    }

    /// Authenticate a unique key + password pair and issue a proof.
    ///
    /// State machine: lookup -> not found => fail InvalidCredentials;
    /// found -> verify -> mismatch => fail InvalidCredentials;
    /// match -> issue proof -> done.
    pub async fn login(
        &self,
        unique_key: &str,
        password: &str,
    ) -> Result<(AuthProof, IdentitySnapshot), AppError> {
        let key = store::normalize_key(unique_key);
        if key.is_empty() || password.is_empty() {
            return Err(AppError::Validation(
                "unique key and password are required".to_string(),
            ));
        }

        let Some(identity) = self.store.find_by_unique_key(&key).await? else {
            // Equalize with the found-but-mismatched path
            let _ = self.hasher.verify(password, &self.dummy_hash);
            counter!(LOGIN_FAILED).increment(1);
            return Err(AppError::InvalidCredentials);
        };

        if !self.hasher.verify(password, &identity.password_hash)? {
            counter!(LOGIN_FAILED).increment(1);
            return Err(AppError::InvalidCredentials);
        }

        let snapshot = identity.snapshot();
        let proof = self.issuer.issue(&snapshot).await?;
        counter!(LOGIN_SUCCESS).increment(1);
        tracing::info!(identity = %snapshot.id, mode = ?self.issuer.mode(), "login succeeded");
        Ok((proof, snapshot))
    }

    /// Resolve a presented proof (session cookie value or bearer token)
    /// back to the sanitized identity view.
    pub async fn authenticate(&self, presented: &str) -> Result<IdentitySnapshot, AppError> {
        self.issuer.resolve(presented).await
    }

    /// Destroy the presented proof. Session mode only; token mode
    /// reports that logout is client-side.
    pub async fn logout(&self, presented: &str) -> Result<(), AppError> {
        self.issuer.revoke(presented).await
    }
}
