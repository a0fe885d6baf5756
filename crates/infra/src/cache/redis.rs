//! Redis-backed statistic cache (optional).
//!
//! Uses the synchronous client on the blocking pool; each call opens a
//! connection, which is fine for a value read once per request at most.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use super::{CacheError, StatsCache};

#[derive(Debug, Clone)]
pub struct RedisStatsCache {
    client: redis::Client,
    prefix: String,
}

impl RedisStatsCache {
    pub fn new(redis_url: impl AsRef<str>) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(Self {
            client,
            prefix: "prodstats:".to_string(),
        })
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    async fn run<T, F>(&self, op: F) -> Result<T, CacheError>
    where
        T: Send + 'static,
        F: FnOnce(&mut redis::Connection) -> redis::RedisResult<T> + Send + 'static,
    {
        let client = self.client.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = client
                .get_connection()
                .map_err(|e| CacheError::Backend(e.to_string()))?;
            op(&mut conn).map_err(|e| CacheError::Backend(e.to_string()))
        })
        .await
        .map_err(|e| CacheError::Backend(format!("redis task failed: {e}")))?
    }
}

#[async_trait]
impl StatsCache for RedisStatsCache {
    async fn get(&self, key: &str) -> Result<Option<JsonValue>, CacheError> {
        let key = self.key(key);
        let raw: Option<String> = self
            .run(move |conn| redis::cmd("GET").arg(&key).query(conn))
            .await?;
        raw.map(|s| serde_json::from_str(&s).map_err(|e| CacheError::Serialize(e.to_string())))
            .transpose()
    }

    async fn set(&self, key: &str, value: JsonValue, ttl: Duration) -> Result<(), CacheError> {
        let key = self.key(key);
        let payload =
            serde_json::to_string(&value).map_err(|e| CacheError::Serialize(e.to_string()))?;
        let seconds = ttl.as_secs().max(1);
        self.run(move |conn| {
            redis::cmd("SET")
                .arg(&key)
                .arg(payload)
                .arg("EX")
                .arg(seconds)
                .query::<()>(conn)
        })
        .await
    }

    async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        let key = self.key(key);
        let _removed: i64 = self
            .run(move |conn| redis::cmd("DEL").arg(&key).query(conn))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_prefixed() {
        let cache = RedisStatsCache::new("redis://localhost:6379/0")
            .unwrap()
            .with_prefix("test:");
        assert_eq!(cache.key("avg_price_by_category"), "test:avg_price_by_category");
    }

    #[test]
    fn invalid_url_is_rejected() {
        assert!(matches!(
            RedisStatsCache::new("not a url"),
            Err(CacheError::Backend(_))
        ));
    }
}
