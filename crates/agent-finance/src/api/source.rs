//! The market-data source seam and the records it returns

use crate::error::{FinanceError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Periods accepted for historical prices
pub const VALID_PERIODS: [&str; 11] = [
    "1d", "5d", "1mo", "3mo", "6mo", "1y", "2y", "5y", "10y", "ytd", "max",
];

/// Bar intervals accepted for historical prices
pub const VALID_INTERVALS: [&str; 13] = [
    "1m", "2m", "5m", "15m", "30m", "60m", "90m", "1h", "1d", "5d", "1wk", "1mo", "3mo",
];

/// One OHLCV bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: u64,
}

/// Company profile and headline statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub symbol: String,
    pub name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub current_price: Option<f64>,
    pub currency: Option<String>,
    pub market_cap: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub eps: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub summary: Option<String>,
    pub website: Option<String>,
    pub employees: Option<u64>,
}

/// Analyst rating counts for one period (`0m` is the current month)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationTrend {
    pub period: String,
    pub strong_buy: u32,
    pub buy: u32,
    pub hold: u32,
    pub sell: u32,
    pub strong_sell: u32,
}

/// A news story about a company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub publisher: Option<String>,
    pub link: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Where market-data tools get their data
///
/// Implemented over Yahoo Finance by [`super::YahooFinanceClient`]; tests
/// substitute their own.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Latest traded price
    async fn current_price(&self, symbol: &str) -> Result<f64>;

    /// Bars covering `period` at `interval`, oldest first
    async fn historical_prices(
        &self,
        symbol: &str,
        period: &str,
        interval: &str,
    ) -> Result<Vec<PriceBar>>;

    /// Company profile
    async fn company_profile(&self, symbol: &str) -> Result<CompanyProfile>;

    /// Recommendation trend, most recent period first
    async fn recommendation_trend(&self, symbol: &str) -> Result<Vec<RecommendationTrend>>;

    /// Up to `count` recent stories
    async fn news(&self, symbol: &str, count: usize) -> Result<Vec<NewsItem>>;
}

/// Trim and uppercase a ticker, rejecting anything that cannot be one
pub fn normalize_symbol(symbol: &str) -> Result<String> {
    let symbol = symbol.trim().to_uppercase();
    let valid = !symbol.is_empty()
        && symbol.len() <= 15
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='));

    if valid {
        Ok(symbol)
    } else {
        Err(FinanceError::InvalidSymbol(symbol))
    }
}

/// Check a period/interval pair against the accepted sets
pub fn validate_range(period: &str, interval: &str) -> Result<()> {
    if !VALID_PERIODS.contains(&period) {
        return Err(FinanceError::InvalidArgument(format!(
            "period '{period}' is not one of {}",
            VALID_PERIODS.join(", ")
        )));
    }
    if !VALID_INTERVALS.contains(&interval) {
        return Err(FinanceError::InvalidArgument(format!(
            "interval '{interval}' is not one of {}",
            VALID_INTERVALS.join(", ")
        )));
    }
    Ok(())
}
