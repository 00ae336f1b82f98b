//! Time-bounded caching of market-data results

use crate::config::FinanceToolsConfig;
use cached::{Cached, TimedCache};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Identifies one market-data lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    /// Ticker symbol, already normalized
    pub symbol: String,
    /// Function that produced the value
    pub endpoint: String,
    /// Remaining arguments as a JSON string
    pub params: String,
}

impl CacheKey {
    pub fn new(symbol: impl Into<String>, endpoint: impl Into<String>, params: &Value) -> Self {
        Self {
            symbol: symbol.into(),
            endpoint: endpoint.into(),
            params: params.to_string(),
        }
    }
}

/// Shared cache of tool results with a fixed lifespan
#[derive(Clone)]
pub struct DataCache {
    cache: Arc<RwLock<TimedCache<CacheKey, Value>>>,
}

impl DataCache {
    /// Create a cache whose entries expire after `ttl`
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Arc::new(RwLock::new(TimedCache::with_lifespan(ttl))),
        }
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Value> {
        // TimedCache evicts on read, so even lookups need the write lock
        let mut cache = self.cache.write().await;
        cache.cache_get(key).cloned()
    }

    pub async fn insert(&self, key: CacheKey, value: Value) {
        let mut cache = self.cache.write().await;
        let _ = cache.cache_set(key, value);
    }

    /// Return the cached value or run `fetcher` and cache its success
    ///
    /// Failures are not cached.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: CacheKey, fetcher: F) -> Result<Value, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
    {
        if let Some(value) = self.get(&key).await {
            tracing::debug!(symbol = %key.symbol, endpoint = %key.endpoint, "Cache hit");
            return Ok(value);
        }

        tracing::debug!(symbol = %key.symbol, endpoint = %key.endpoint, "Cache miss");
        let value = fetcher().await?;
        self.insert(key, value.clone()).await;
        Ok(value)
    }

    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        cache.cache_clear();
    }

    pub async fn len(&self) -> usize {
        let cache = self.cache.read().await;
        cache.cache_size()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// One cache per data class, each with its own TTL
#[derive(Clone)]
pub struct CacheTiers {
    /// Prices and history
    pub realtime: DataCache,
    /// Profiles and analyst recommendations
    pub fundamental: DataCache,
    /// News stories
    pub news: DataCache,
}

impl CacheTiers {
    pub fn new(config: &FinanceToolsConfig) -> Self {
        Self {
            realtime: DataCache::new(config.cache_ttl_realtime),
            fundamental: DataCache::new(config.cache_ttl_fundamental),
            news: DataCache::new(config.cache_ttl_news),
        }
    }

    /// Clear all tiers
    pub async fn clear_all(&self) {
        self.realtime.clear().await;
        self.fundamental.clear().await;
        self.news.clear().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cache_key_includes_params() {
        let a = CacheKey::new("NVDA", "history", &json!({"period": "1mo"}));
        let b = CacheKey::new("NVDA", "history", &json!({"period": "1y"}));
        assert_ne!(a, b);
        assert!(a.params.contains("1mo"));
    }

    #[tokio::test]
    async fn test_get_or_fetch_hits_cache() {
        let cache = DataCache::new(Duration::from_secs(60));
        let key = CacheKey::new("NVDA", "price", &json!({}));

        let mut calls = 0;
        let first = cache
            .get_or_fetch(key.clone(), || {
                calls += 1;
                async { Ok::<_, String>(json!("181.2000")) }
            })
            .await
            .unwrap();
        let second = cache
            .get_or_fetch(key, || {
                calls += 1;
                async { Ok::<_, String>(json!("0.0000")) }
            })
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let cache = DataCache::new(Duration::from_secs(60));
        let key = CacheKey::new("NVDA", "news", &json!({"count": 3}));

        let err = cache
            .get_or_fetch(key.clone(), || async { Err::<Value, _>("offline") })
            .await;
        assert!(err.is_err());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_tiers_clear_all() {
        let tiers = CacheTiers::new(&FinanceToolsConfig::default());
        let key = CacheKey::new("NVDA", "info", &json!({}));

        tiers.realtime.insert(key.clone(), json!(1)).await;
        tiers.fundamental.insert(key.clone(), json!(2)).await;
        tiers.news.insert(key, json!(3)).await;
        assert_eq!(tiers.fundamental.len().await, 1);

        tiers.clear_all().await;
        assert!(tiers.realtime.is_empty().await);
        assert!(tiers.news.is_empty().await);
    }
}
