// ============================
// crates/backend-lib/src/auth/session.rs
// ============================
//! Session token handling and management.
//!
//! Sessions live in a durable directory shared across server instances
//! (one JSON file per session), so any instance can resolve a session
//! created by another. Expiry is absolute: the TTL is stamped at login
//! and never refreshed on access.
use crate::auth::token_generator::{generate_secure_token, is_well_formed_token};
use crate::error::AppError;
use crate::metrics::{SESSION_CREATED, SESSION_DESTROYED, SESSION_EXPIRED};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use metrics::counter;
use pms_common::IdentitySnapshot;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::{fs as tokio_fs, io::AsyncWriteExt, time::timeout};

/// Interval between expired-session sweeps
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60); // 1 hour

/// One active stateful login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Identity view copied at login time, not live-joined
    pub snapshot: IdentitySnapshot,
    pub created_at: DateTime<Utc>,
    /// Absolute expiry, refreshed only by explicit re-login
    pub expires_at: DateTime<Utc>,
}

/// Session manager over the shared durable session store
#[derive(Clone)]
pub struct SessionManager {
    root: PathBuf,
    ttl: ChronoDuration,
    op_timeout: Duration,
}

impl SessionManager {
    /// Create a new session manager and spawn the cleanup task
    pub fn new<P: AsRef<Path>>(
        root: P,
        ttl: Duration,
        op_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;

        let manager = SessionManager {
            root,
            ttl: ChronoDuration::from_std(ttl)?,
            op_timeout,
        };

        let manager_clone = manager.clone();
        tokio::spawn(async move {
            manager_clone.cleanup_task().await;
        });

        Ok(manager)
    }

    fn session_path(&self, token: &str) -> PathBuf {
        self.root.join(format!("{token}.json"))
    }

    async fn deadline<T>(
        &self,
        fut: impl Future<Output = Result<T, AppError>>,
    ) -> Result<T, AppError> {
        timeout(self.op_timeout, fut)
            .await
            .map_err(|_| AppError::Timeout)?
    }

    /// Create a new session for an authenticated identity.
    /// Returns the opaque cookie token (256 bits of entropy).
    pub async fn create(&self, snapshot: IdentitySnapshot) -> Result<String, AppError> {
        let token = generate_secure_token();
        let now = Utc::now();
        let session = Session {
            snapshot,
            created_at: now,
            expires_at: now + self.ttl,
        };

        let json = serde_json::to_string(&session)?;
        let path = self.session_path(&token);
        self.deadline(async {
            let mut file = tokio_fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await?;
            file.write_all(json.as_bytes()).await?;
            Ok(())
        })
        .await?;

        counter!(SESSION_CREATED).increment(1);
        Ok(token)
    }

    /// Resolve a presented session token to its identity snapshot.
    ///
    /// Unknown and expired sessions both come back as
    /// `Unauthenticated`; the distinction is logged at debug level but
    /// must never be observable in the response.
    pub async fn resolve(&self, token: &str) -> Result<IdentitySnapshot, AppError> {
        if !is_well_formed_token(token) {
            tracing::debug!("rejected malformed session token");
            return Err(AppError::Unauthenticated);
        }

        let path = self.session_path(token);
        let content = self
            .deadline(async {
                match tokio_fs::read_to_string(&path).await {
                    Ok(content) => Ok(Some(content)),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                    Err(e) => Err(AppError::from(e)),
                }
            })
            .await?;

        let Some(content) = content else {
            tracing::debug!("unknown session token presented");
            return Err(AppError::Unauthenticated);
        };

        // Same treatment as the cleanup sweep: an unreadable record is
        // reclaimed, and to the presenter it is just not a session.
        let Ok(session) = serde_json::from_str::<Session>(&content) else {
            tracing::debug!("corrupt session record presented");
            let _ = tokio_fs::remove_file(&path).await;
            return Err(AppError::Unauthenticated);
        };
        if Utc::now() >= session.expires_at {
            tracing::debug!(identity = %session.snapshot.id, "expired session presented");
            counter!(SESSION_EXPIRED).increment(1);
            let _ = tokio_fs::remove_file(&path).await;
            return Err(AppError::Unauthenticated);
        }

        Ok(session.snapshot)
    }

    /// Destroy a session. Idempotent; destroying an unknown token is
    /// not an error.
    pub async fn destroy(&self, token: &str) -> Result<(), AppError> {
        if !is_well_formed_token(token) {
            return Ok(());
        }
        let path = self.session_path(token);
        self.deadline(async {
            match tokio_fs::remove_file(&path).await {
                Ok(()) => {
                    counter!(SESSION_DESTROYED).increment(1);
                    Ok(())
                },
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(AppError::from(e)),
            }
        })
        .await
    }

    /// Remove every expired session file. Called by the cleanup task,
    /// public so deployments can sweep on demand.
    pub async fn cleanup_expired(&self) -> Result<usize, AppError> {
        let now = Utc::now();
        let mut removed = 0;

        let mut entries = tokio_fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Ok(content) = tokio_fs::read_to_string(&path).await else {
                continue;
            };
            let Ok(session) = serde_json::from_str::<Session>(&content) else {
                // Unreadable records are reclaimed too
                let _ = tokio_fs::remove_file(&path).await;
                removed += 1;
                continue;
            };
            if now >= session.expires_at && tokio_fs::remove_file(&path).await.is_ok() {
                removed += 1;
            }
        }

        if removed > 0 {
            counter!(SESSION_EXPIRED).increment(removed as u64);
            tracing::debug!(removed, "reclaimed expired sessions");
        }
        Ok(removed)
    }

    /// Cleanup task that runs periodically to remove expired sessions
    async fn cleanup_task(&self) {
        loop {
            tokio::time::sleep(CLEANUP_INTERVAL).await;
            if let Err(e) = self.cleanup_expired().await {
                tracing::warn!(error = %e, "session cleanup sweep failed");
            }
        }
    }
}
