//! Traits for store, digest and clock integration

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Failures reported by a key-value store adapter
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached
    #[error("store connection failed: {0}")]
    Connection(String),

    /// The store was reached but rejected or failed the command
    #[error("store command failed: {0}")]
    Command(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Key-value store with per-key expiry
///
/// Each operation must be atomic on its single key. Expiry is enforced by
/// the store itself; the service never sweeps.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Check if a key is present
    async fn exists(&self, key: &str) -> StoreResult<bool>;

    /// Store a value, overwriting any previous one, expiring after `expiry_seconds`
    async fn set_with_expiry(&self, key: &str, value: &str, expiry_seconds: u64)
        -> StoreResult<()>;

    /// Store a value only if the key is absent; returns whether this call set it
    async fn set_if_absent(&self, key: &str, value: &str, expiry_seconds: u64)
        -> StoreResult<bool>;

    /// Read a value
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Remove a key; returns whether it existed
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Atomically increment a counter, applying `expiry_seconds` on the first write
    async fn increment(&self, key: &str, expiry_seconds: u64) -> StoreResult<i64>;

    /// Round trip to the store
    async fn ping(&self) -> StoreResult<()>;
}

/// One-way, fixed-output-length digest used for codes at rest and subjects in keys
pub trait CodeDigest: Send + Sync {
    fn digest(&self, input: &str) -> String;
}

/// Source of the current instant
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
