//! Redis-backed `KeyValueStore` for the OTP service

use async_trait::async_trait;

use otp_core::services::{KeyValueStore, StoreError, StoreResult};

use crate::cache::redis_client::{is_connection_error, RedisClient};
use crate::InfrastructureError;

/// OTP state store over a shared Redis client
///
/// Every operation maps onto a single Redis command (or script), so the
/// per-key atomicity the service relies on comes from Redis itself.
#[derive(Clone)]
pub struct RedisOtpStore {
    client: RedisClient,
}

impl RedisOtpStore {
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &RedisClient {
        &self.client
    }
}

#[async_trait]
impl KeyValueStore for RedisOtpStore {
    async fn exists(&self, key: &str) -> StoreResult<bool> {
        self.client.exists(key).await.map_err(to_store_error)
    }

    async fn set_with_expiry(&self, key: &str, value: &str, expiry_seconds: u64) -> StoreResult<()> {
        self.client
            .set_with_expiry(key, value, expiry_seconds)
            .await
            .map_err(to_store_error)
    }

    async fn set_if_absent(&self, key: &str, value: &str, expiry_seconds: u64) -> StoreResult<bool> {
        self.client
            .set_if_absent(key, value, expiry_seconds)
            .await
            .map_err(to_store_error)
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.client.get(key).await.map_err(to_store_error)
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        self.client.delete(key).await.map_err(to_store_error)
    }

    async fn increment(&self, key: &str, expiry_seconds: u64) -> StoreResult<i64> {
        self.client
            .increment(key, expiry_seconds)
            .await
            .map_err(to_store_error)
    }

    async fn ping(&self) -> StoreResult<()> {
        match self.client.health_check().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(StoreError::Command("unexpected PING reply".to_string())),
            Err(e) => Err(to_store_error(e)),
        }
    }
}

/// Unreachable server becomes `Connection`, anything else `Command`
pub(crate) fn to_store_error(error: InfrastructureError) -> StoreError {
    match error {
        InfrastructureError::Cache(e) if is_connection_error(&e) => {
            StoreError::Connection(e.to_string())
        }
        other => StoreError::Command(other.to_string()),
    }
}
