// ============================
// crates/backend-lib/src/store.rs
// ============================
//! Credential store abstraction with flat-file implementation.
//!
//! The store owns identity records and is the only layer allowed to
//! enforce unique-key semantics. Uniqueness is guaranteed here with an
//! exclusive-create key claim, not by the application-level pre-check,
//! so a racing insert loses cleanly with a conflict.
use crate::error::AppError;
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use pms_common::IdentitySnapshot;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::{fs as tokio_fs, io::AsyncWriteExt, time::timeout};
use uuid::Uuid;

/// Normalize a unique key for comparison: trim and lower-case.
pub fn normalize_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// A stored identity record. `password_hash` never leaves this crate;
/// callers get an [`IdentitySnapshot`] instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    /// Normalized unique key (email or service number)
    pub unique_key: String,
    /// scrypt PHC string
    pub password_hash: String,
    /// Auxiliary attributes, complete at creation, unused afterwards
    pub profile: HashMap<String, String>,
    /// Status tier
    pub status: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    /// Sanitized view of this record
    pub fn snapshot(&self) -> IdentitySnapshot {
        let display_name = match (self.profile.get("firstname"), self.profile.get("surname")) {
            (Some(first), Some(sur)) => format!("{first} {sur}"),
            _ => self
                .profile
                .get("name")
                .cloned()
                .unwrap_or_else(|| self.unique_key.clone()),
        };
        IdentitySnapshot {
            id: self.id,
            display_name,
            unique_key: self.unique_key.clone(),
            status: self.status,
        }
    }
}

/// Input to [`IdentityStore::insert`]; the store assigns id and
/// timestamps.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub unique_key: String,
    pub password_hash: String,
    pub profile: HashMap<String, String>,
    pub status: u8,
}

/// Trait for identity store backends
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Persist a new identity record. Fails with `Conflict` if the
    /// normalized unique key is already claimed, atomically with
    /// respect to concurrent inserts.
    async fn insert(&self, record: NewIdentity) -> Result<Identity, AppError>;

    /// Look up an identity by its unique key (normalized internally)
    async fn find_by_unique_key(&self, key: &str) -> Result<Option<Identity>, AppError>;

    /// Look up an identity by id
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, AppError>;
}

/// Flat-file implementation of the IdentityStore trait.
///
/// Layout: one JSON document per identity under `identities/`, plus one
/// claim file per normalized key under `keys/` whose name is the
/// URL-safe base64 of the key and whose content is the identity id.
/// The claim file doubles as the unique index: it is created with
/// `create_new`, so the filesystem rejects the second writer.
#[derive(Clone)]
pub struct FlatFileIdentityStore {
    root: PathBuf,
    op_timeout: Duration,
}

impl FlatFileIdentityStore {
    pub fn new<P: AsRef<Path>>(root: P, op_timeout: Duration) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(root.join("identities"))?;
        std::fs::create_dir_all(root.join("keys"))?;
        Ok(Self { root, op_timeout })
    }

    fn identity_path(&self, id: Uuid) -> PathBuf {
        self.root.join("identities").join(format!("{id}.json"))
    }

    fn key_path(&self, normalized: &str) -> PathBuf {
        let encoded = URL_SAFE_NO_PAD.encode(normalized.as_bytes());
        self.root.join("keys").join(encoded)
    }

    /// Every store operation runs under the configured deadline and
    /// surfaces `Timeout` instead of hanging the caller.
    async fn deadline<T>(
        &self,
        fut: impl Future<Output = Result<T, AppError>>,
    ) -> Result<T, AppError> {
        timeout(self.op_timeout, fut)
            .await
            .map_err(|_| AppError::Timeout)?
    }

    async fn insert_inner(&self, record: NewIdentity) -> Result<Identity, AppError> {
        let key = normalize_key(&record.unique_key);
        let id = Uuid::new_v4();
        let key_path = self.key_path(&key);

        // Exclusive create is the atomic insert-if-absent primitive;
        // exactly one of two racing registrations gets the claim.
        let mut claim = match tokio_fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&key_path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(AppError::Conflict(key));
            },
            Err(e) => return Err(AppError::from(e)),
        };
        if let Err(e) = claim.write_all(id.to_string().as_bytes()).await {
            // Release the claim, otherwise the key stays taken by an
            // insert that never happened.
            let _ = tokio_fs::remove_file(&key_path).await;
            return Err(AppError::from(e));
        }

        let now = Utc::now();
        let identity = Identity {
            id,
            unique_key: key.clone(),
            password_hash: record.password_hash,
            profile: record.profile,
            status: record.status,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_string_pretty(&identity)?;
        if let Err(e) = tokio_fs::write(self.identity_path(id), json).await {
            // Release the claim so the key is not poisoned by a
            // half-finished insert.
            let _ = tokio_fs::remove_file(&key_path).await;
            return Err(AppError::from(e));
        }

        Ok(identity)
    }

    async fn find_by_unique_key_inner(&self, key: &str) -> Result<Option<Identity>, AppError> {
        let key = normalize_key(key);
        let key_path = self.key_path(&key);

        let content = match tokio_fs::read_to_string(&key_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AppError::from(e)),
        };

        let id = Uuid::parse_str(content.trim())
            .map_err(|_| AppError::Store(format!("corrupt key index entry for '{key}'")))?;

        // A claim without its identity document is a half-finished
        // insert: either a writer is between the claim and the record
        // right now, or it died there. Report absence; a competing
        // insert of the same key still loses with Conflict at the
        // exclusive create.
        self.read_identity(id).await
    }

    async fn read_identity(&self, id: Uuid) -> Result<Option<Identity>, AppError> {
        let content = match tokio_fs::read_to_string(self.identity_path(id)).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AppError::from(e)),
        };
        let identity: Identity = serde_json::from_str(&content)?;
        Ok(Some(identity))
    }
}

#[async_trait]
impl IdentityStore for FlatFileIdentityStore {
    async fn insert(&self, record: NewIdentity) -> Result<Identity, AppError> {
        self.deadline(self.insert_inner(record)).await
    }

    async fn find_by_unique_key(&self, key: &str) -> Result<Option<Identity>, AppError> {
        self.deadline(self.find_by_unique_key_inner(key)).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, AppError> {
        self.deadline(self.read_identity(id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn new_record(key: &str) -> NewIdentity {
        let mut profile = HashMap::new();
        profile.insert("surname".to_string(), "Okoro".to_string());
        profile.insert("firstname".to_string(), "Chinedu".to_string());
        NewIdentity {
            unique_key: key.to_string(),
            password_hash: "$scrypt$ln=8,r=8,p=1$c2FsdHNhbHQ$aGFzaGhhc2g".to_string(),
            profile,
            status: 1,
        }
    }

    fn store(dir: &TempDir) -> FlatFileIdentityStore {
        FlatFileIdentityStore::new(dir.path(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let identity = store.insert(new_record("a@x.com")).await.unwrap();
        assert_eq!(identity.unique_key, "a@x.com");
        assert_eq!(identity.created_at, identity.updated_at);

        let found = store.find_by_unique_key("a@x.com").await.unwrap().unwrap();
        assert_eq!(found.id, identity.id);

        let by_id = store.find_by_id(identity.id).await.unwrap().unwrap();
        assert_eq!(by_id.unique_key, "a@x.com");
    }

    #[tokio::test]
    async fn test_duplicate_key_conflicts() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store.insert(new_record("a@x.com")).await.unwrap();
        let err = store.insert(new_record("a@x.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_key_normalization() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store.insert(new_record("  A@X.com ")).await.unwrap();

        // Same key after normalization, different spelling
        let err = store.insert(new_record("a@x.COM")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let found = store.find_by_unique_key("A@X.COM").await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_unknown_key_and_id() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        assert!(store
            .find_by_unique_key("nobody@x.com")
            .await
            .unwrap()
            .is_none());
        assert!(store.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_inserts_one_winner() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let (a, b) = tokio::join!(
            store.insert(new_record("race@x.com")),
            store.insert(new_record("race@x.com")),
        );

        let outcomes = [a.is_ok(), b.is_ok()];
        assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);

        let loser = if outcomes[0] { b } else { a };
        assert!(matches!(loser.unwrap_err(), AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_dangling_claim_reads_as_absent() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        // A claim whose identity document never landed: a writer died
        // between the exclusive create and the record write
        let encoded = URL_SAFE_NO_PAD.encode("ghost@x.com".as_bytes());
        std::fs::write(
            dir.path().join("keys").join(encoded),
            Uuid::new_v4().to_string(),
        )
        .unwrap();

        assert!(store
            .find_by_unique_key("ghost@x.com")
            .await
            .unwrap()
            .is_none());

        // Racing into that window still loses with Conflict, never a
        // storage error
        let err = store.insert(new_record("ghost@x.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_failed_insert_releases_the_key_claim() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        // Force the identity write to fail
        std::fs::remove_dir_all(dir.path().join("identities")).unwrap();
        let err = store.insert(new_record("a@x.com")).await.unwrap_err();
        assert!(!matches!(err, AppError::Conflict(_)));

        // The key is not poisoned: once the store is healthy again the
        // same key registers
        std::fs::create_dir_all(dir.path().join("identities")).unwrap();
        assert!(store.insert(new_record("a@x.com")).await.is_ok());
    }

    #[test]
    fn test_snapshot_never_carries_hash() {
        let mut profile = HashMap::new();
        profile.insert("firstname".to_string(), "Chinedu".to_string());
        profile.insert("surname".to_string(), "Okoro".to_string());
        let identity = Identity {
            id: Uuid::new_v4(),
            unique_key: "a@x.com".to_string(),
            password_hash: "secret-hash".to_string(),
            profile,
            status: 2,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let snapshot = identity.snapshot();
        assert_eq!(snapshot.display_name, "Chinedu Okoro");
        assert_eq!(snapshot.status, 2);

        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(!json.contains("secret-hash"));
    }
}
