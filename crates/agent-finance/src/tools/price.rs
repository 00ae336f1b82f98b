//! Price tools: latest price and historical bars

use agent_core::Result as AgentResult;
use agent_tools::Tool;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::normalize_symbol;
use crate::api::source::validate_range;
use crate::cache::CacheKey;
use crate::capability::Capability;
use crate::error::{FinanceError, Result};
use crate::tools::ToolContext;

#[derive(Debug, Deserialize)]
struct SymbolParams {
    symbol: String,
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    symbol: String,
    #[serde(default = "default_period")]
    period: String,
    #[serde(default = "default_interval")]
    interval: String,
}

fn default_period() -> String {
    "1mo".to_string()
}

fn default_interval() -> String {
    "1d".to_string()
}

fn parse<T: serde::de::DeserializeOwned>(params: Value) -> AgentResult<T> {
    serde_json::from_value(params)
        .map_err(|e| agent_core::Error::ProcessingFailed(format!("Invalid parameters: {e}")))
}

/// Latest traded price, formatted to four decimals
pub struct CurrentPriceTool {
    ctx: ToolContext,
}

impl CurrentPriceTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    async fn fetch(&self, params: SymbolParams) -> Result<Value> {
        let symbol = normalize_symbol(&params.symbol)?;
        let key = CacheKey::new(&symbol, "current_price", &json!({}));

        self.ctx
            .cache
            .realtime
            .get_or_fetch(key, || async {
                let price = self.ctx.source.current_price(&symbol).await?;
                if !price.is_finite() {
                    return Err(FinanceError::DataUnavailable {
                        symbol: symbol.clone(),
                        reason: "no current price".to_string(),
                    });
                }
                Ok::<_, FinanceError>(Value::String(format!("{price:.4}")))
            })
            .await
    }
}

#[async_trait]
impl Tool for CurrentPriceTool {
    async fn execute(&self, params: Value) -> AgentResult<Value> {
        let params: SymbolParams = parse(params)?;
        self.fetch(params)
            .await
            .map_err(|e| e.into_tool_error(self.name()))
    }

    fn name(&self) -> &'static str {
        Capability::StockPrice.function_name()
    }

    fn description(&self) -> &'static str {
        "Get the current stock price for a given symbol. Returns the price as a string \
         with four decimal places."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "symbol": {
                    "type": "string",
                    "description": "Stock ticker symbol (e.g., 'NVDA', 'AAPL')"
                }
            },
            "required": ["symbol"]
        })
    }
}

/// OHLCV bars over a period
pub struct HistoricalPricesTool {
    ctx: ToolContext,
}

impl HistoricalPricesTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    async fn fetch(&self, params: HistoryParams) -> Result<Value> {
        let symbol = normalize_symbol(&params.symbol)?;
        validate_range(&params.period, &params.interval)?;
        let key = CacheKey::new(
            &symbol,
            "historical_prices",
            &json!({ "period": &params.period, "interval": &params.interval }),
        );

        self.ctx
            .cache
            .realtime
            .get_or_fetch(key, || async {
                let bars = self
                    .ctx
                    .source
                    .historical_prices(&symbol, &params.period, &params.interval)
                    .await?;

                let rows: Vec<Value> = bars
                    .iter()
                    .map(|bar| {
                        json!({
                            "date": bar.date.format("%Y-%m-%d %H:%M").to_string(),
                            "open": bar.open,
                            "high": bar.high,
                            "low": bar.low,
                            "close": bar.close,
                            "adj_close": bar.adj_close,
                            "volume": bar.volume,
                        })
                    })
                    .collect();

                Ok::<_, FinanceError>(json!({
                    "symbol": &symbol,
                    "period": &params.period,
                    "interval": &params.interval,
                    "prices": rows,
                }))
            })
            .await
    }
}

#[async_trait]
impl Tool for HistoricalPricesTool {
    async fn execute(&self, params: Value) -> AgentResult<Value> {
        let params: HistoryParams = parse(params)?;
        self.fetch(params)
            .await
            .map_err(|e| e.into_tool_error(self.name()))
    }

    fn name(&self) -> &'static str {
        Capability::HistoricalPrices.function_name()
    }

    fn description(&self) -> &'static str {
        "Get historical open, high, low, close and volume data for a stock symbol \
         over a period at a bar interval."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "symbol": {
                    "type": "string",
                    "description": "Stock ticker symbol"
                },
                "period": {
                    "type": "string",
                    "description": "How far back to look (default 1mo)",
                    "enum": ["1d", "5d", "1mo", "3mo", "6mo", "1y", "2y", "5y", "10y", "ytd", "max"]
                },
                "interval": {
                    "type": "string",
                    "description": "Bar size (default 1d)",
                    "enum": ["1m", "2m", "5m", "15m", "30m", "60m", "90m", "1h", "1d", "5d", "1wk", "1mo", "3mo"]
                }
            },
            "required": ["symbol"]
        })
    }
}
