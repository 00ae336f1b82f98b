//! Market-data providers

pub mod source;
pub mod yahoo;

pub use source::{
    CompanyProfile, MarketDataSource, NewsItem, PriceBar, RecommendationTrend, normalize_symbol,
};
pub use yahoo::YahooFinanceClient;
