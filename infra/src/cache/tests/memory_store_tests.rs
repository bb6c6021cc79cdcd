//! Unit tests for the in-memory store

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::{Arc, Mutex};

use otp_core::services::{
    Clock, CreateOtpOptions, KeyValueStore, OtpConfig, OtpService, Sha256Digest, StoreError,
};
use otp_core::DomainError;

use crate::cache::MemoryOtpStore;

struct TestClock {
    now: Mutex<DateTime<Utc>>,
}

impl TestClock {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2026, 5, 4, 8, 30, 0).unwrap()),
        })
    }

    fn advance(&self, seconds: i64) {
        *self.now.lock().unwrap() += Duration::seconds(seconds);
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[tokio::test]
async fn test_values_expire_with_clock() {
    let clock = TestClock::new();
    let store = MemoryOtpStore::with_clock(clock.clone());

    store.set_with_expiry("otp:data:a", "hash", 30).await.unwrap();
    assert_eq!(store.get("otp:data:a").await.unwrap().as_deref(), Some("hash"));
    assert!(store.exists("otp:data:a").await.unwrap());

    clock.advance(30);
    assert_eq!(store.get("otp:data:a").await.unwrap(), None);
    assert!(!store.exists("otp:data:a").await.unwrap());
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_set_if_absent_only_first_writer_wins() {
    let clock = TestClock::new();
    let store = MemoryOtpStore::with_clock(clock.clone());

    assert!(store.set_if_absent("otp:rate:a", "1", 60).await.unwrap());
    assert!(!store.set_if_absent("otp:rate:a", "2", 60).await.unwrap());
    assert_eq!(store.get("otp:rate:a").await.unwrap().as_deref(), Some("1"));

    clock.advance(61);
    assert!(store.set_if_absent("otp:rate:a", "3", 60).await.unwrap());
}

#[tokio::test]
async fn test_increment_sets_expiry_on_first_write_only() {
    let clock = TestClock::new();
    let store = MemoryOtpStore::with_clock(clock.clone());

    assert_eq!(store.increment("otp:attempts:a", 100).await.unwrap(), 1);
    clock.advance(60);
    assert_eq!(store.increment("otp:attempts:a", 100).await.unwrap(), 2);

    // Window still counts from the first increment
    clock.advance(40);
    assert_eq!(store.get("otp:attempts:a").await.unwrap(), None);
    assert_eq!(store.increment("otp:attempts:a", 100).await.unwrap(), 1);
}

#[tokio::test]
async fn test_increment_rejects_non_numeric_value() {
    let store = MemoryOtpStore::new();

    store.set_with_expiry("otp:attempts:a", "lots", 60).await.unwrap();
    assert!(matches!(
        store.increment("otp:attempts:a", 60).await,
        Err(StoreError::Command(_))
    ));
}

#[tokio::test]
async fn test_delete_reports_presence() {
    let store = MemoryOtpStore::new();

    store.set_with_expiry("otp:data:a", "hash", 60).await.unwrap();
    assert!(store.delete("otp:data:a").await.unwrap());
    assert!(!store.delete("otp:data:a").await.unwrap());
}

#[tokio::test]
async fn test_offline_store_fails_every_operation() {
    let store = MemoryOtpStore::new();
    store.set_offline(true);

    assert!(matches!(store.ping().await, Err(StoreError::Connection(_))));
    assert!(matches!(store.get("k").await, Err(StoreError::Connection(_))));
    assert!(matches!(
        store.set_if_absent("k", "v", 1).await,
        Err(StoreError::Connection(_))
    ));

    store.set_offline(false);
    assert!(store.ping().await.is_ok());
}

#[tokio::test]
async fn test_service_lifecycle_over_memory_store() {
    let clock = TestClock::new();
    let store = Arc::new(MemoryOtpStore::with_clock(clock.clone()));
    let service = OtpService::with_components(
        store.clone(),
        Arc::new(Sha256Digest::new()),
        clock.clone(),
        OtpConfig::default(),
    )
    .unwrap();

    let issued = service
        .create("password-change", "user-42", &CreateOtpOptions::default())
        .await
        .unwrap();
    assert_eq!(issued.code.len(), 6);
    assert_eq!(store.len().await, 2);

    let again = service
        .create("password-change", "user-42", &CreateOtpOptions::default())
        .await;
    assert!(matches!(again, Err(DomainError::RateLimited { .. })));

    let code = issued.code.expose().to_string();
    assert!(service
        .verify_and_consume("password-change", "user-42", Some(&code))
        .await
        .unwrap());
    assert!(!service
        .verify_and_consume("password-change", "user-42", Some(&code))
        .await
        .unwrap());

    store.set_offline(true);
    assert!(!service.is_operational().await);
    assert!(matches!(
        service
            .verify_and_consume("password-change", "user-42", Some(&code))
            .await,
        Err(DomainError::Unavailable { .. })
    ));
}
