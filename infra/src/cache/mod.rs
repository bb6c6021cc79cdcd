//! Cache module for Redis-backed OTP state
//!
//! Provides the Redis client with retry logic, the `KeyValueStore` adapter
//! over it, and an in-process store for development and tests.

pub mod memory_store;
pub mod redis_client;
pub mod redis_store;

#[cfg(test)]
mod tests;

pub use memory_store::MemoryOtpStore;
pub use redis_client::RedisClient;
pub use redis_store::RedisOtpStore;

// Re-export commonly used types
pub use otp_shared::config::CacheConfig;
