//! Statistic cache boundary.
//!
//! Values are JSON documents addressed by string keys and expire after a TTL.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;

pub mod in_memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use in_memory::InMemoryStatsCache;
#[cfg(feature = "redis")]
pub use self::redis::RedisStatsCache;

/// Cache key of the average-price-by-category statistic.
pub const AVG_PRICE_BY_CATEGORY_KEY: &str = "avg_price_by_category";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cache (de)serialization error: {0}")]
    Serialize(String),

    #[error("cache lock poisoned")]
    Poisoned,
}

#[async_trait]
pub trait StatsCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<JsonValue>, CacheError>;

    async fn set(&self, key: &str, value: JsonValue, ttl: Duration) -> Result<(), CacheError>;

    async fn invalidate(&self, key: &str) -> Result<(), CacheError>;
}
