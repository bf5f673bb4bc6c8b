// ============================
// crates/common/src/lib.rs
// ============================
//! Common types and structures
//! shared between the personnel registry server and its clients.
//! This module defines the HTTP request/response bodies and the
//! sanitized identity view returned by authenticated endpoints.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Baseline status tier assigned at self-registration
pub const BASELINE_TIER: u8 = 1;

/// Which credential proof a deployment issues on login.
/// Fixed at startup; never negotiated per request.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Stateful server-side session referenced by an opaque cookie
    Session,
    /// Stateless signed bearer token
    Token,
}

/// Sanitized identity view: the snapshot copied into sessions and
/// returned to callers. Never carries the password hash.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IdentitySnapshot {
    /// Identity record id
    pub id: Uuid,
    /// Human-readable name derived from the profile
    pub display_name: String,
    /// Normalized unique key (email or service number)
    pub unique_key: String,
    /// Status tier
    pub status: u8,
}

/// Body of `POST /api/register`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RegisterRequest {
    /// Profile attributes (surname, firstname, gender, state, lga,
    /// passport URL, email / service number, ...). Which fields are
    /// required, and which one is the unique key, is server
    /// configuration.
    #[serde(default)]
    pub profile: HashMap<String, String>,
    /// Plaintext password; hashed before storage, never persisted
    pub password: String,
}

/// Response to a successful registration
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RegisterResponse {
    pub message: String,
    /// Id of the created identity record
    pub id: Uuid,
}

/// Body of `POST /auth/login`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginRequest {
    /// Unique key value (email or service number, per deployment)
    pub unique_key: String,
    /// Plaintext password
    pub password: String,
}

/// Response to a successful login
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginResponse {
    pub message: String,
    /// Sanitized identity view
    pub user: IdentitySnapshot,
    /// Bearer token, present in token mode only. Session mode
    /// delivers the proof as a Set-Cookie header instead.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Plain message response (logout, liveness)
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MessageResponse {
    pub message: String,
}
