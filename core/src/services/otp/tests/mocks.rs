//! Mock implementations for testing the OTP service

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::services::otp::{Clock, CodeDigest, KeyValueStore, StoreError, StoreResult};

/// Clock that only moves when told to
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()),
        }
    }

    pub fn advance_seconds(&self, seconds: i64) {
        let mut now = self.now.lock().unwrap();
        *now += Duration::seconds(seconds);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Digest that makes stored values easy to predict
pub struct EchoDigest;

impl CodeDigest for EchoDigest {
    fn digest(&self, input: &str) -> String {
        format!("h({})", input)
    }
}

type Entry = (String, Option<DateTime<Utc>>);

// Mock store with expiry driven by a manual clock
pub struct MockStore {
    pub entries: Mutex<HashMap<String, Entry>>,
    clock: Arc<ManualClock>,
    pub should_fail: AtomicBool,
    pub fail_operation: Mutex<Option<&'static str>>,
    pub increments: AtomicUsize,
}

impl MockStore {
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
            should_fail: AtomicBool::new(false),
            fail_operation: Mutex::new(None),
            increments: AtomicUsize::new(0),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.should_fail.store(failing, Ordering::SeqCst);
    }

    pub fn fail_on(&self, operation: Option<&'static str>) {
        *self.fail_operation.lock().unwrap() = operation;
    }

    /// Live value at a key, ignoring expired entries
    pub fn peek(&self, key: &str) -> Option<String> {
        let now = self.clock.now();
        self.entries
            .lock()
            .unwrap()
            .get(key)
            .filter(|(_, expires_at)| expires_at.map_or(true, |at| at > now))
            .map(|(value, _)| value.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    fn check(&self, operation: &'static str) -> StoreResult<()> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("connection refused".to_string()));
        }
        if *self.fail_operation.lock().unwrap() == Some(operation) {
            return Err(StoreError::Command(format!("{} failed", operation)));
        }
        Ok(())
    }

    fn expiry(&self, seconds: u64) -> Option<DateTime<Utc>> {
        Some(self.clock.now() + Duration::seconds(seconds as i64))
    }

    fn purge_expired(&self, entries: &mut HashMap<String, Entry>) {
        let now = self.clock.now();
        entries.retain(|_, (_, expires_at)| expires_at.map_or(true, |at| at > now));
    }
}

#[async_trait]
impl KeyValueStore for MockStore {
    async fn exists(&self, key: &str) -> StoreResult<bool> {
        self.check("exists")?;
        Ok(self.peek(key).is_some())
    }

    async fn set_with_expiry(&self, key: &str, value: &str, expiry_seconds: u64) -> StoreResult<()> {
        self.check("set_with_expiry")?;
        let expires_at = self.expiry(expiry_seconds);
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, expiry_seconds: u64) -> StoreResult<bool> {
        self.check("set_if_absent")?;
        let expires_at = self.expiry(expiry_seconds);
        let mut entries = self.entries.lock().unwrap();
        self.purge_expired(&mut entries);
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), (value.to_string(), expires_at));
        Ok(true)
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.check("get")?;
        Ok(self.peek(key))
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        self.check("delete")?;
        let mut entries = self.entries.lock().unwrap();
        self.purge_expired(&mut entries);
        Ok(entries.remove(key).is_some())
    }

    async fn increment(&self, key: &str, expiry_seconds: u64) -> StoreResult<i64> {
        self.check("increment")?;
        self.increments.fetch_add(1, Ordering::SeqCst);
        let expires_at = self.expiry(expiry_seconds);
        let mut entries = self.entries.lock().unwrap();
        self.purge_expired(&mut entries);

        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| ("0".to_string(), expires_at));
        let count = entry
            .0
            .parse::<i64>()
            .map_err(|e| StoreError::Command(e.to_string()))?
            + 1;
        entry.0 = count.to_string();
        Ok(count)
    }

    async fn ping(&self) -> StoreResult<()> {
        self.check("ping")
    }
}
