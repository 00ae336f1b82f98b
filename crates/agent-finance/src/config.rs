//! Configuration for the market-data toolkit

use crate::error::{FinanceError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for market-data tools and the Yahoo client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinanceToolsConfig {
    /// Cache TTL for real-time data (quotes, prices)
    pub cache_ttl_realtime: Duration,

    /// Cache TTL for fundamental data (profile, recommendations)
    pub cache_ttl_fundamental: Duration,

    /// Cache TTL for news data
    pub cache_ttl_news: Duration,

    /// Request timeout duration
    pub request_timeout: Duration,

    /// Requests per second allowed against Yahoo
    pub rate_limit_per_second: u32,

    /// Stories returned by the news tool when the model gives no count
    pub default_news_count: usize,
}

impl Default for FinanceToolsConfig {
    fn default() -> Self {
        Self {
            cache_ttl_realtime: Duration::from_secs(60),        // 1 minute
            cache_ttl_fundamental: Duration::from_secs(3600),   // 1 hour
            cache_ttl_news: Duration::from_secs(300),           // 5 minutes
            request_timeout: Duration::from_secs(30),
            rate_limit_per_second: 5,
            default_news_count: 3,
        }
    }
}

impl FinanceToolsConfig {
    /// Create a new configuration builder
    pub fn builder() -> FinanceToolsConfigBuilder {
        FinanceToolsConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.rate_limit_per_second == 0 {
            return Err(FinanceError::ConfigError(
                "rate_limit_per_second must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(FinanceError::ConfigError(
                "request_timeout must be greater than 0".to_string(),
            ));
        }

        if self.default_news_count == 0 {
            return Err(FinanceError::ConfigError(
                "default_news_count must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for FinanceToolsConfig
#[derive(Debug, Default)]
pub struct FinanceToolsConfigBuilder {
    cache_ttl_realtime: Option<Duration>,
    cache_ttl_fundamental: Option<Duration>,
    cache_ttl_news: Option<Duration>,
    request_timeout: Option<Duration>,
    rate_limit_per_second: Option<u32>,
    default_news_count: Option<usize>,
}

impl FinanceToolsConfigBuilder {
    /// Set cache TTL for real-time data
    pub fn cache_ttl_realtime(mut self, duration: Duration) -> Self {
        self.cache_ttl_realtime = Some(duration);
        self
    }

    /// Set cache TTL for fundamental data
    pub fn cache_ttl_fundamental(mut self, duration: Duration) -> Self {
        self.cache_ttl_fundamental = Some(duration);
        self
    }

    /// Set cache TTL for news data
    pub fn cache_ttl_news(mut self, duration: Duration) -> Self {
        self.cache_ttl_news = Some(duration);
        self
    }

    /// Set request timeout
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Set the Yahoo request rate
    pub fn rate_limit_per_second(mut self, per_second: u32) -> Self {
        self.rate_limit_per_second = Some(per_second);
        self
    }

    /// Set the default number of news stories
    pub fn default_news_count(mut self, count: usize) -> Self {
        self.default_news_count = Some(count);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<FinanceToolsConfig> {
        let defaults = FinanceToolsConfig::default();

        let config = FinanceToolsConfig {
            cache_ttl_realtime: self.cache_ttl_realtime.unwrap_or(defaults.cache_ttl_realtime),
            cache_ttl_fundamental: self
                .cache_ttl_fundamental
                .unwrap_or(defaults.cache_ttl_fundamental),
            cache_ttl_news: self.cache_ttl_news.unwrap_or(defaults.cache_ttl_news),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            rate_limit_per_second: self
                .rate_limit_per_second
                .unwrap_or(defaults.rate_limit_per_second),
            default_news_count: self.default_news_count.unwrap_or(defaults.default_news_count),
        };

        config.validate()?;
        Ok(config)
    }
}
