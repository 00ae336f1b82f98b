//! Market-data capabilities and the flags that enable them

use crate::error::{FinanceError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One data function the market-data toolkit can expose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Latest traded price
    StockPrice,
    /// OHLCV bars over a period
    HistoricalPrices,
    /// Company profile and key statistics
    CompanyInfo,
    /// Analyst recommendation trend
    AnalystRecommendations,
    /// Recent news stories
    CompanyNews,
}

impl Capability {
    /// All capabilities in the order they are offered to the model
    pub const ALL: [Capability; 5] = [
        Capability::StockPrice,
        Capability::HistoricalPrices,
        Capability::CompanyInfo,
        Capability::AnalystRecommendations,
        Capability::CompanyNews,
    ];

    /// Flag name, e.g. `stock_price`
    pub fn name(self) -> &'static str {
        match self {
            Self::StockPrice => "stock_price",
            Self::HistoricalPrices => "historical_prices",
            Self::CompanyInfo => "company_info",
            Self::AnalystRecommendations => "analyst_recommendations",
            Self::CompanyNews => "company_news",
        }
    }

    /// Name of the function the model calls
    pub fn function_name(self) -> &'static str {
        match self {
            Self::StockPrice => "get_current_stock_price",
            Self::HistoricalPrices => "get_historical_stock_prices",
            Self::CompanyInfo => "get_company_info",
            Self::AnalystRecommendations => "get_analyst_recommendations",
            Self::CompanyNews => "get_company_news",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Capability {
    type Err = FinanceError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| FinanceError::ConfigError(format!("Unknown capability: {s}")))
    }
}

/// Which market-data functions are enabled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilityFlags {
    pub stock_price: bool,
    pub historical_prices: bool,
    pub company_info: bool,
    pub analyst_recommendations: bool,
    pub company_news: bool,
}

impl CapabilityFlags {
    /// Every capability enabled
    pub fn all() -> Self {
        Self {
            stock_price: true,
            historical_prices: true,
            company_info: true,
            analyst_recommendations: true,
            company_news: true,
        }
    }

    /// Parse `(name, enabled)` pairs; names not listed stay disabled
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, bool)>,
    {
        let mut flags = Self::default();
        for (name, enabled) in pairs {
            flags.set(name.parse()?, enabled);
        }
        Ok(flags)
    }

    /// Turn one capability on or off
    pub fn set(&mut self, capability: Capability, enabled: bool) {
        match capability {
            Capability::StockPrice => self.stock_price = enabled,
            Capability::HistoricalPrices => self.historical_prices = enabled,
            Capability::CompanyInfo => self.company_info = enabled,
            Capability::AnalystRecommendations => self.analyst_recommendations = enabled,
            Capability::CompanyNews => self.company_news = enabled,
        }
    }

    pub fn is_enabled(&self, capability: Capability) -> bool {
        match capability {
            Capability::StockPrice => self.stock_price,
            Capability::HistoricalPrices => self.historical_prices,
            Capability::CompanyInfo => self.company_info,
            Capability::AnalystRecommendations => self.analyst_recommendations,
            Capability::CompanyNews => self.company_news,
        }
    }

    /// Enabled capabilities in canonical order
    pub fn enabled(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|c| self.is_enabled(*c))
            .collect()
    }
}
