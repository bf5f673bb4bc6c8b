// ============================
// crates/backend-lib/src/auth/token.rs
// ============================
//! Stateless signed-token issuance and verification.
//!
//! Tokens are JWTs (HS256) carrying the identity id and status tier.
//! They are never persisted; validity is signature plus expiry, and
//! there is no server-side revocation before natural expiry.
use crate::error::AppError;
use crate::metrics::TOKEN_ISSUED;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Claim set embedded in issued tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Identity id (standard JWT `sub` claim)
    pub sub: String,
    /// Status tier at issue time
    pub status: u8,
    /// Issued at (unix timestamp)
    pub iat: i64,
    /// Expiry (unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Parse the subject back into an identity id
    pub fn identity_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::Unauthenticated)
    }
}

/// Issues and verifies signed bearer tokens with a process-wide secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenIssuer {
    /// Build an issuer from the configured signing secret and TTL.
    /// The secret's presence is checked at startup (`Settings::validate`),
    /// never per request.
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::default();
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    /// Sign a claim set for an authenticated identity
    pub fn issue(&self, identity_id: Uuid, status: u8) -> Result<String, AppError> {
        let iat = Utc::now().timestamp();
        let claims = Claims {
            sub: identity_id.to_string(),
            status,
            iat,
            exp: iat + self.ttl.as_secs() as i64,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))?;
        counter!(TOKEN_ISSUED).increment(1);
        Ok(token)
    }

    /// Verify a presented token.
    ///
    /// Expired tokens and invalid ones (bad signature, malformed
    /// structure, wrong algorithm) both surface `Unauthenticated`; the
    /// cause is logged at debug level for diagnostics only.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        match decode::<Claims>(token, &self.decoding, &self.validation) {
            Ok(data) => Ok(data.claims),
            Err(e) if matches!(e.kind(), jsonwebtoken::errors::ErrorKind::ExpiredSignature) => {
                tracing::debug!("expired bearer token presented");
                Err(AppError::Unauthenticated)
            },
            Err(e) => {
                tracing::debug!(error = %e, "invalid bearer token presented");
                Err(AppError::Unauthenticated)
            },
        }
    }
}
