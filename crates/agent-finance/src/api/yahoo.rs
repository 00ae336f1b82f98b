//! Yahoo Finance client
//!
//! Quotes and history go through `yahoo_finance_api`. Profile,
//! recommendation and news lookups hit the JSON endpoints directly; the
//! quoteSummary endpoint needs a session cookie and a crumb, fetched once and
//! reused until Yahoo rejects it.

use crate::api::source::{
    CompanyProfile, MarketDataSource, NewsItem, PriceBar, RecommendationTrend, validate_range,
};
use crate::config::FinanceToolsConfig;
use crate::error::{FinanceError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use yahoo_finance_api as yahoo;

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

const COOKIE_URL: &str = "https://fc.yahoo.com";
const CRUMB_URL: &str = "https://query1.finance.yahoo.com/v1/test/getcrumb";
const QUOTE_SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";
const SEARCH_URL: &str = "https://query2.finance.yahoo.com/v1/finance/search";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

const PROFILE_MODULES: &str = "assetProfile,price,summaryDetail,defaultKeyStatistics";
const RECOMMENDATION_MODULES: &str = "recommendationTrend";

/// Yahoo Finance market-data client
pub struct YahooFinanceClient {
    connector: yahoo::YahooConnector,
    http: Client,
    rate_limiter: SharedRateLimiter,
    crumb: Mutex<Option<String>>,
}

impl YahooFinanceClient {
    /// Create a client; no request is sent until the first lookup
    pub fn new(config: &FinanceToolsConfig) -> Result<Self> {
        config.validate()?;

        let connector = yahoo::YahooConnector::new()?;
        let http = Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout)
            .build()?;

        let per_second = NonZeroU32::new(config.rate_limit_per_second).ok_or_else(|| {
            FinanceError::ConfigError("rate_limit_per_second must be greater than 0".to_string())
        })?;
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_second(per_second)));

        Ok(Self {
            connector,
            http,
            rate_limiter,
            crumb: Mutex::new(None),
        })
    }

    async fn crumb(&self) -> Result<String> {
        let mut slot = self.crumb.lock().await;
        if let Some(crumb) = slot.as_ref() {
            return Ok(crumb.clone());
        }

        self.rate_limiter.until_ready().await;
        // The cookie endpoint answers 404 but still sets the session cookie
        let _ = self.http.get(COOKIE_URL).send().await?;

        self.rate_limiter.until_ready().await;
        let response = self.http.get(CRUMB_URL).send().await?;
        let status = response.status();
        let crumb = response.text().await?.trim().to_string();
        if !status.is_success() || crumb.is_empty() || crumb.contains('<') {
            return Err(FinanceError::ApiError(format!(
                "crumb request failed with HTTP {status}"
            )));
        }

        debug!("Obtained Yahoo crumb");
        *slot = Some(crumb.clone());
        Ok(crumb)
    }

    async fn quote_summary(&self, symbol: &str, modules: &str) -> Result<SummaryResult> {
        let mut retried = false;
        loop {
            let crumb = self.crumb().await?;
            self.rate_limiter.until_ready().await;

            let response = self
                .http
                .get(format!("{QUOTE_SUMMARY_URL}/{symbol}"))
                .query(&[("modules", modules), ("crumb", crumb.as_str())])
                .send()
                .await?;

            let status = response.status();
            if status == StatusCode::UNAUTHORIZED && !retried {
                warn!(symbol, "Yahoo rejected the crumb, refreshing");
                *self.crumb.lock().await = None;
                retried = true;
                continue;
            }
            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(FinanceError::ApiError("rate limited by Yahoo (HTTP 429)".to_string()));
            }
            if status == StatusCode::NOT_FOUND {
                return Err(FinanceError::DataUnavailable {
                    symbol: symbol.to_string(),
                    reason: "unknown symbol".to_string(),
                });
            }
            if !status.is_success() {
                return Err(FinanceError::ApiError(format!("quoteSummary returned HTTP {status}")));
            }

            let body: QuoteSummaryResponse = response.json().await?;
            return body
                .quote_summary
                .result
                .and_then(|mut results| results.pop())
                .ok_or_else(|| FinanceError::DataUnavailable {
                    symbol: symbol.to_string(),
                    reason: body
                        .quote_summary
                        .error
                        .and_then(|e| e.description)
                        .unwrap_or_else(|| "empty quoteSummary result".to_string()),
                });
        }
    }
}

#[async_trait]
impl MarketDataSource for YahooFinanceClient {
    #[instrument(skip(self))]
    async fn current_price(&self, symbol: &str) -> Result<f64> {
        self.rate_limiter.until_ready().await;
        let response = self.connector.get_latest_quotes(symbol, "1d").await?;
        let quote = response.last_quote()?;
        Ok(quote.close)
    }

    #[instrument(skip(self))]
    async fn historical_prices(
        &self,
        symbol: &str,
        period: &str,
        interval: &str,
    ) -> Result<Vec<PriceBar>> {
        validate_range(period, interval)?;

        self.rate_limiter.until_ready().await;
        let response = self.connector.get_quote_range(symbol, interval, period).await?;
        let quotes = response.quotes()?;
        if quotes.is_empty() {
            return Err(FinanceError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: format!("no prices for period {period}"),
            });
        }

        Ok(quotes
            .iter()
            .map(|q| PriceBar {
                date: DateTime::from_timestamp(q.timestamp as i64, 0).unwrap_or_else(Utc::now),
                open: q.open,
                high: q.high,
                low: q.low,
                close: q.close,
                adj_close: q.adjclose,
                volume: q.volume,
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn company_profile(&self, symbol: &str) -> Result<CompanyProfile> {
        let summary = self.quote_summary(symbol, PROFILE_MODULES).await?;
        Ok(summary.into_profile(symbol))
    }

    #[instrument(skip(self))]
    async fn recommendation_trend(&self, symbol: &str) -> Result<Vec<RecommendationTrend>> {
        let summary = self.quote_summary(symbol, RECOMMENDATION_MODULES).await?;
        let trend = summary
            .recommendation_trend
            .map(|t| t.trend)
            .unwrap_or_default();
        if trend.is_empty() {
            return Err(FinanceError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: "no analyst coverage".to_string(),
            });
        }
        Ok(trend.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn news(&self, symbol: &str, count: usize) -> Result<Vec<NewsItem>> {
        self.rate_limiter.until_ready().await;
        let count = count.to_string();
        let response = self
            .http
            .get(SEARCH_URL)
            .query(&[("q", symbol), ("newsCount", count.as_str()), ("quotesCount", "0")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FinanceError::ApiError(format!("news search returned HTTP {status}")));
        }

        let body: SearchResponse = response.json().await?;
        Ok(body.news.into_iter().map(Into::into).collect())
    }
}

// quoteSummary wire format. Numbers come wrapped as {"raw": 1.0, "fmt": "1.00"}.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResponse {
    quote_summary: QuoteSummaryBody,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryBody {
    result: Option<Vec<SummaryResult>>,
    error: Option<SummaryError>,
}

#[derive(Debug, Deserialize)]
struct SummaryError {
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryResult {
    asset_profile: Option<AssetProfile>,
    price: Option<PriceModule>,
    summary_detail: Option<SummaryDetail>,
    default_key_statistics: Option<KeyStatistics>,
    recommendation_trend: Option<TrendModule>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
struct Raw {
    raw: Option<f64>,
}

fn raw(value: Option<Raw>) -> Option<f64> {
    value.and_then(|v| v.raw)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetProfile {
    sector: Option<String>,
    industry: Option<String>,
    long_business_summary: Option<String>,
    website: Option<String>,
    full_time_employees: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceModule {
    long_name: Option<String>,
    short_name: Option<String>,
    currency: Option<String>,
    regular_market_price: Option<Raw>,
    market_cap: Option<Raw>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryDetail {
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<Raw>,
    fifty_two_week_low: Option<Raw>,
    fifty_two_week_high: Option<Raw>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyStatistics {
    trailing_eps: Option<Raw>,
}

#[derive(Debug, Default, Deserialize)]
struct TrendModule {
    #[serde(default)]
    trend: Vec<TrendEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct TrendEntry {
    period: String,
    strong_buy: u32,
    buy: u32,
    hold: u32,
    sell: u32,
    strong_sell: u32,
}

impl From<TrendEntry> for RecommendationTrend {
    fn from(e: TrendEntry) -> Self {
        Self {
            period: e.period,
            strong_buy: e.strong_buy,
            buy: e.buy,
            hold: e.hold,
            sell: e.sell,
            strong_sell: e.strong_sell,
        }
    }
}

impl SummaryResult {
    fn into_profile(self, symbol: &str) -> CompanyProfile {
        let profile = self.asset_profile.unwrap_or_default();
        let price = self.price.unwrap_or_default();
        let detail = self.summary_detail.unwrap_or_default();
        let stats = self.default_key_statistics.unwrap_or_default();

        CompanyProfile {
            symbol: symbol.to_string(),
            name: price.long_name.or(price.short_name),
            sector: profile.sector,
            industry: profile.industry,
            current_price: raw(price.regular_market_price),
            currency: price.currency,
            market_cap: raw(price.market_cap),
            pe_ratio: raw(detail.trailing_pe),
            eps: raw(stats.trailing_eps),
            fifty_two_week_low: raw(detail.fifty_two_week_low),
            fifty_two_week_high: raw(detail.fifty_two_week_high),
            summary: profile.long_business_summary,
            website: profile.website,
            employees: profile.full_time_employees,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    news: Vec<SearchNews>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchNews {
    title: String,
    publisher: Option<String>,
    link: Option<String>,
    provider_publish_time: Option<i64>,
}

impl From<SearchNews> for NewsItem {
    fn from(n: SearchNews) -> Self {
        Self {
            title: n.title,
            publisher: n.publisher,
            link: n.link,
            published_at: n
                .provider_publish_time
                .and_then(|ts| DateTime::from_timestamp(ts, 0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_profile_from_quote_summary() {
        let body: QuoteSummaryResponse = serde_json::from_value(json!({
            "quoteSummary": {
                "result": [{
                    "assetProfile": {
                        "sector": "Technology",
                        "industry": "Semiconductors",
                        "website": "https://www.nvidia.com",
                        "fullTimeEmployees": 36000,
                        "longBusinessSummary": "NVIDIA designs GPUs."
                    },
                    "price": {
                        "longName": "NVIDIA Corporation",
                        "currency": "USD",
                        "regularMarketPrice": {"raw": 181.2, "fmt": "181.20"},
                        "marketCap": {"raw": 4.4e12, "fmt": "4.4T"}
                    },
                    "summaryDetail": {
                        "trailingPE": {"raw": 51.3},
                        "fiftyTwoWeekLow": {"raw": 86.62},
                        "fiftyTwoWeekHigh": {}
                    },
                    "defaultKeyStatistics": {"trailingEps": {"raw": 3.53}}
                }],
                "error": null
            }
        }))
        .unwrap();

        let result = body.quote_summary.result.unwrap().pop().unwrap();
        let profile = result.into_profile("NVDA");
        assert_eq!(profile.name.as_deref(), Some("NVIDIA Corporation"));
        assert_eq!(profile.sector.as_deref(), Some("Technology"));
        assert_eq!(profile.current_price, Some(181.2));
        assert_eq!(profile.pe_ratio, Some(51.3));
        assert_eq!(profile.eps, Some(3.53));
        assert_eq!(profile.fifty_two_week_high, None);
        assert_eq!(profile.employees, Some(36000));
    }

    #[test]
    fn test_recommendation_trend_parsing() {
        let result: SummaryResult = serde_json::from_value(json!({
            "recommendationTrend": {
                "trend": [
                    {"period": "0m", "strongBuy": 12, "buy": 46, "hold": 5, "sell": 1, "strongSell": 0},
                    {"period": "-1m", "strongBuy": 11, "buy": 45}
                ]
            }
        }))
        .unwrap();

        let trend: Vec<RecommendationTrend> = result
            .recommendation_trend
            .unwrap()
            .trend
            .into_iter()
            .map(Into::into)
            .collect();
        assert_eq!(trend[0].buy, 46);
        assert_eq!(trend[1].period, "-1m");
        assert_eq!(trend[1].hold, 0);
    }

    #[test]
    fn test_news_parsing() {
        let body: SearchResponse = serde_json::from_value(json!({
            "news": [{
                "uuid": "abc",
                "title": "NVIDIA beats estimates",
                "publisher": "Reuters",
                "link": "https://example.com/nvda",
                "providerPublishTime": 1_700_000_000
            }]
        }))
        .unwrap();

        let items: Vec<NewsItem> = body.news.into_iter().map(Into::into).collect();
        assert_eq!(items[0].publisher.as_deref(), Some("Reuters"));
        assert_eq!(items[0].published_at.unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_missing_summary_result_is_empty() {
        let body: QuoteSummaryResponse = serde_json::from_value(json!({
            "quoteSummary": {"result": null, "error": {"code": "Not Found", "description": "No data found"}}
        }))
        .unwrap();
        assert!(body.quote_summary.result.is_none());
        assert_eq!(
            body.quote_summary.error.unwrap().description.as_deref(),
            Some("No data found")
        );
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_current_price() {
        let client = YahooFinanceClient::new(&FinanceToolsConfig::default()).unwrap();
        let price = client.current_price("NVDA").await.unwrap();
        assert!(price > 0.0);
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_company_profile() {
        let client = YahooFinanceClient::new(&FinanceToolsConfig::default()).unwrap();
        let profile = client.company_profile("NVDA").await.unwrap();
        assert!(profile.name.is_some());
    }
}
