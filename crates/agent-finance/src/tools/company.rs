//! Company fundamentals: profile and analyst recommendations

use agent_core::Result as AgentResult;
use agent_tools::Tool;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::normalize_symbol;
use crate::cache::CacheKey;
use crate::capability::Capability;
use crate::error::{FinanceError, Result};
use crate::tools::ToolContext;

#[derive(Debug, Deserialize)]
struct SymbolParams {
    symbol: String,
}

fn parse(params: Value) -> AgentResult<SymbolParams> {
    serde_json::from_value(params)
        .map_err(|e| agent_core::Error::ProcessingFailed(format!("Invalid parameters: {e}")))
}

fn symbol_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "symbol": {
                "type": "string",
                "description": "Stock ticker symbol (e.g., 'NVDA')"
            }
        },
        "required": ["symbol"]
    })
}

/// Company profile with headline valuation figures
pub struct CompanyInfoTool {
    ctx: ToolContext,
}

impl CompanyInfoTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    async fn fetch(&self, symbol: &str) -> Result<Value> {
        let symbol = normalize_symbol(symbol)?;
        let key = CacheKey::new(&symbol, "company_info", &json!({}));

        self.ctx
            .cache
            .fundamental
            .get_or_fetch(key, || async {
                let profile = self.ctx.source.company_profile(&symbol).await?;
                Ok::<_, FinanceError>(json!({
                    "symbol": profile.symbol,
                    "name": profile.name,
                    "sector": profile.sector,
                    "industry": profile.industry,
                    "current_price": profile.current_price,
                    "currency": profile.currency,
                    "market_cap": profile.market_cap,
                    "pe_ratio": profile.pe_ratio,
                    "eps": profile.eps,
                    "52_week_low": profile.fifty_two_week_low,
                    "52_week_high": profile.fifty_two_week_high,
                    "summary": profile.summary,
                    "website": profile.website,
                    "employees": profile.employees,
                }))
            })
            .await
    }
}

#[async_trait]
impl Tool for CompanyInfoTool {
    async fn execute(&self, params: Value) -> AgentResult<Value> {
        let params = parse(params)?;
        self.fetch(&params.symbol)
            .await
            .map_err(|e| e.into_tool_error(self.name()))
    }

    fn name(&self) -> &'static str {
        Capability::CompanyInfo.function_name()
    }

    fn description(&self) -> &'static str {
        "Get company information and overview for a stock symbol: name, sector, industry, \
         price, market cap, P/E ratio, EPS, 52-week range, business summary, website and \
         employee count."
    }

    fn input_schema(&self) -> Value {
        symbol_schema()
    }
}

/// Analyst buy/hold/sell counts by period
pub struct AnalystRecommendationsTool {
    ctx: ToolContext,
}

impl AnalystRecommendationsTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    async fn fetch(&self, symbol: &str) -> Result<Value> {
        let symbol = normalize_symbol(symbol)?;
        let key = CacheKey::new(&symbol, "analyst_recommendations", &json!({}));

        self.ctx
            .cache
            .fundamental
            .get_or_fetch(key, || async {
                let trend = self.ctx.source.recommendation_trend(&symbol).await?;
                Ok::<_, FinanceError>(json!({
                    "symbol": &symbol,
                    "recommendations": trend,
                }))
            })
            .await
    }
}

#[async_trait]
impl Tool for AnalystRecommendationsTool {
    async fn execute(&self, params: Value) -> AgentResult<Value> {
        let params = parse(params)?;
        self.fetch(&params.symbol)
            .await
            .map_err(|e| e.into_tool_error(self.name()))
    }

    fn name(&self) -> &'static str {
        Capability::AnalystRecommendations.function_name()
    }

    fn description(&self) -> &'static str {
        "Get analyst recommendations for a stock symbol: counts of strong buy, buy, hold, \
         sell and strong sell ratings for the current and previous months."
    }

    fn input_schema(&self) -> Value {
        symbol_schema()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::source::MockMarketDataSource;
    use crate::api::{CompanyProfile, RecommendationTrend};
    use crate::config::FinanceToolsConfig;
    use std::sync::Arc;

    fn ctx(source: MockMarketDataSource) -> ToolContext {
        ToolContext::new(Arc::new(source), &FinanceToolsConfig::default())
    }

    #[tokio::test]
    async fn test_company_info_fields() {
        let mut source = MockMarketDataSource::new();
        source.expect_company_profile().times(1).returning(|symbol| {
            Ok(CompanyProfile {
                symbol: symbol.to_string(),
                name: Some("NVIDIA Corporation".to_string()),
                sector: Some("Technology".to_string()),
                market_cap: Some(4.4e12),
                ..CompanyProfile::default()
            })
        });
        let tool = CompanyInfoTool::new(ctx(source));

        let value = tool.execute(json!({"symbol": "nvda"})).await.unwrap();
        assert_eq!(value["symbol"], "NVDA");
        assert_eq!(value["name"], "NVIDIA Corporation");
        assert_eq!(value["market_cap"], 4.4e12);
        assert!(value["eps"].is_null());

        // Second call is served from the fundamental cache
        tool.execute(json!({"symbol": "NVDA"})).await.unwrap();
    }

    #[tokio::test]
    async fn test_recommendations() {
        let mut source = MockMarketDataSource::new();
        source.expect_recommendation_trend().returning(|_| {
            Ok(vec![RecommendationTrend {
                period: "0m".to_string(),
                strong_buy: 12,
                buy: 46,
                hold: 5,
                sell: 1,
                strong_sell: 0,
            }])
        });
        let tool = AnalystRecommendationsTool::new(ctx(source));

        let value = tool.execute(json!({"symbol": "NVDA"})).await.unwrap();
        assert_eq!(value["recommendations"][0]["period"], "0m");
        assert_eq!(value["recommendations"][0]["buy"], 46);
    }

    #[tokio::test]
    async fn test_no_coverage_is_tool_unavailable() {
        let mut source = MockMarketDataSource::new();
        source.expect_recommendation_trend().returning(|symbol| {
            Err(FinanceError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: "no analyst coverage".to_string(),
            })
        });
        let tool = AnalystRecommendationsTool::new(ctx(source));

        let err = tool.execute(json!({"symbol": "TINY"})).await.unwrap_err();
        assert!(err.to_string().contains("no analyst coverage"));
        assert!(!err.is_fatal());
    }
}
