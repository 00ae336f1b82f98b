//! In-memory market-data source that counts its calls
//!
//! Lets scenario tests assert which lookups a run performed.

use agent_finance::api::{CompanyProfile, MarketDataSource, NewsItem, PriceBar, RecommendationTrend};
use agent_finance::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Per-method call counters
#[derive(Debug, Default)]
pub struct CallCounts {
    pub current_price: AtomicUsize,
    pub historical_prices: AtomicUsize,
    pub company_profile: AtomicUsize,
    pub recommendation_trend: AtomicUsize,
    pub news: AtomicUsize,
}

impl CallCounts {
    /// Calls made across every method
    pub fn total(&self) -> usize {
        [
            &self.current_price,
            &self.historical_prices,
            &self.company_profile,
            &self.recommendation_trend,
            &self.news,
        ]
        .iter()
        .map(|c| c.load(Ordering::SeqCst))
        .sum()
    }
}

/// Answers every lookup with fixed data
#[derive(Debug)]
pub struct CountingSource {
    price: f64,
    counts: CallCounts,
}

impl CountingSource {
    /// A source quoting `price` for every symbol
    pub fn new(price: f64) -> Self {
        Self {
            price,
            counts: CallCounts::default(),
        }
    }

    pub fn counts(&self) -> &CallCounts {
        &self.counts
    }
}

impl Default for CountingSource {
    fn default() -> Self {
        Self::new(100.0)
    }
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

#[async_trait]
impl MarketDataSource for CountingSource {
    async fn current_price(&self, _symbol: &str) -> Result<f64> {
        bump(&self.counts.current_price);
        Ok(self.price)
    }

    async fn historical_prices(
        &self,
        _symbol: &str,
        _period: &str,
        _interval: &str,
    ) -> Result<Vec<PriceBar>> {
        bump(&self.counts.historical_prices);
        Ok(vec![PriceBar {
            date: Utc::now(),
            open: self.price,
            high: self.price,
            low: self.price,
            close: self.price,
            adj_close: self.price,
            volume: 1_000,
        }])
    }

    async fn company_profile(&self, symbol: &str) -> Result<CompanyProfile> {
        bump(&self.counts.company_profile);
        Ok(CompanyProfile {
            symbol: symbol.to_string(),
            name: Some(format!("{symbol} Inc.")),
            current_price: Some(self.price),
            ..CompanyProfile::default()
        })
    }

    async fn recommendation_trend(&self, _symbol: &str) -> Result<Vec<RecommendationTrend>> {
        bump(&self.counts.recommendation_trend);
        Ok(vec![RecommendationTrend {
            period: "0m".to_string(),
            buy: 1,
            ..RecommendationTrend::default()
        }])
    }

    async fn news(&self, symbol: &str, count: usize) -> Result<Vec<NewsItem>> {
        bump(&self.counts.news);
        Ok((0..count)
            .map(|i| NewsItem {
                title: format!("{symbol} story {i}"),
                publisher: None,
                link: None,
                published_at: None,
            })
            .collect())
    }
}
