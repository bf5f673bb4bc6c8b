// ============================
// crates/backend-lib/src/auth/rate_limit.rs
// ============================
//! Login rate limiting.
//!
//! Failed attempts are tracked per client address; too many in a row
//! lock the address out for the configured duration. A periodic sweep
//! reclaims lapsed lockouts and stale failure records so the map does
//! not grow with one-off failures.

use crate::metrics::LOGIN_LOCKOUT;
use dashmap::DashMap;
use metrics::counter;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Interval between stale-entry sweeps
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60); // 1 hour

/// How long a never-locked failure record survives before the sweep
/// reclaims it
const ENTRY_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
struct FailureRecord {
    failures: u32,
    last_failure: Instant,
    locked_until: Option<Instant>,
}

impl FailureRecord {
    fn locked(&self, now: Instant) -> bool {
        self.locked_until.is_some_and(|until| now < until)
    }
}

/// Per-address lockout for the login endpoint. Limits come from
/// `Settings`, fixed at startup.
#[derive(Clone)]
pub struct AuthRateLimiter {
    attempts: Arc<DashMap<IpAddr, FailureRecord>>,
    max_attempts: u32,
    lockout: Duration,
}

impl AuthRateLimiter {
    /// Build a limiter and spawn its periodic sweep
    pub fn new(max_attempts: u32, lockout: Duration) -> Self {
        let limiter = Self {
            attempts: Arc::new(DashMap::new()),
            max_attempts,
            lockout,
        };

        let sweep = limiter.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(CLEANUP_INTERVAL).await;
                sweep.cleanup();
            }
        });

        limiter
    }

    /// Whether this address may attempt a login right now
    pub fn check_rate_limit(&self, ip: IpAddr) -> bool {
        self.attempts
            .get(&ip)
            .map_or(true, |record| !record.locked(Instant::now()))
    }

    /// Count a failed login; reaching the threshold starts the lockout
    pub fn record_failed_attempt(&self, ip: IpAddr) {
        let now = Instant::now();
        let mut record = self.attempts.entry(ip).or_insert_with(|| FailureRecord {
            failures: 0,
            last_failure: now,
            locked_until: None,
        });

        // A lapsed lockout starts a fresh count
        if record.locked_until.is_some_and(|until| now >= until) {
            record.failures = 0;
            record.locked_until = None;
        }

        record.failures += 1;
        record.last_failure = now;

        if record.failures >= self.max_attempts {
            record.locked_until = Some(now + self.lockout);
            counter!(LOGIN_LOCKOUT).increment(1);
            tracing::warn!(%ip, "client locked out after repeated failed logins");
        }
    }

    /// A successful login clears the address's record
    pub fn record_success(&self, ip: IpAddr) {
        self.attempts.remove(&ip);
    }

    /// Drop lapsed lockouts and stale failure records
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.attempts.retain(|_, record| match record.locked_until {
            Some(until) => now < until,
            None => now.duration_since(record.last_failure) < ENTRY_RETENTION,
        });
    }
}
