//! In-process `KeyValueStore` for development and tests
//!
//! Mirrors the Redis semantics the OTP service depends on: per-key expiry,
//! set-if-absent and an increment that only sets the expiry when it creates
//! the counter. State is lost when the process exits.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use otp_core::services::{Clock, KeyValueStore, StoreError, StoreResult, SystemClock};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: DateTime<Utc>,
}

impl Entry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// In-memory store with clock-driven expiry
pub struct MemoryOtpStore {
    entries: Mutex<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
    offline: AtomicBool,
}

impl MemoryOtpStore {
    /// Create a store using the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a store whose expiry follows the given clock
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
            offline: AtomicBool::new(false),
        }
    }

    /// Simulate an outage: every operation fails with a connection error
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of live keys
    pub async fn len(&self) -> usize {
        let now = self.clock.now();
        self.entries
            .lock()
            .await
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn ensure_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("memory store is offline".to_string()));
        }
        Ok(())
    }

    fn expiry(&self, now: DateTime<Utc>, seconds: u64) -> StoreResult<DateTime<Utc>> {
        i64::try_from(seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| StoreError::Command(format!("expiry of {}s is out of range", seconds)))
    }
}

impl Default for MemoryOtpStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Drop expired entries, mirroring lazy expiry on access
fn purge_expired(entries: &mut HashMap<String, Entry>, now: DateTime<Utc>) {
    entries.retain(|_, entry| entry.is_live(now));
}

#[async_trait]
impl KeyValueStore for MemoryOtpStore {
    async fn exists(&self, key: &str) -> StoreResult<bool> {
        self.ensure_online()?;
        let now = self.clock.now();
        let entries = self.entries.lock().await;
        Ok(entries.get(key).is_some_and(|entry| entry.is_live(now)))
    }

    async fn set_with_expiry(&self, key: &str, value: &str, expiry_seconds: u64) -> StoreResult<()> {
        self.ensure_online()?;
        let now = self.clock.now();
        let expires_at = self.expiry(now, expiry_seconds)?;

        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, expiry_seconds: u64) -> StoreResult<bool> {
        self.ensure_online()?;
        let now = self.clock.now();
        let expires_at = self.expiry(now, expiry_seconds)?;

        let mut entries = self.entries.lock().await;
        purge_expired(&mut entries, now);
        if entries.contains_key(key) {
            debug!("Key '{}' already present, conditional set skipped", key);
            return Ok(false);
        }

        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(true)
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.ensure_online()?;
        let now = self.clock.now();
        let entries = self.entries.lock().await;
        Ok(entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        self.ensure_online()?;
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        purge_expired(&mut entries, now);
        Ok(entries.remove(key).is_some())
    }

    async fn increment(&self, key: &str, expiry_seconds: u64) -> StoreResult<i64> {
        self.ensure_online()?;
        let now = self.clock.now();
        let expires_at = self.expiry(now, expiry_seconds)?;

        let mut entries = self.entries.lock().await;
        purge_expired(&mut entries, now);

        match entries.get_mut(key) {
            Some(entry) => {
                let count = entry
                    .value
                    .parse::<i64>()
                    .ok()
                    .and_then(|count| count.checked_add(1))
                    .ok_or_else(|| {
                        StoreError::Command(format!("value at '{}' is not an integer or out of range", key))
                    })?;
                entry.value = count.to_string();
                Ok(count)
            }
            None => {
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: "1".to_string(),
                        expires_at,
                    },
                );
                Ok(1)
            }
        }
    }

    async fn ping(&self) -> StoreResult<()> {
        self.ensure_online()
    }
}
