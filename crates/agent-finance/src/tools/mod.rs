//! Market-data tools and toolkit assembly
//!
//! [`build_tools`] is the only way toolkits are produced: the reasoning
//! toolkit always comes first, followed by a market-data toolkit holding just
//! the enabled capabilities in canonical order.

pub mod company;
pub mod news;
pub mod price;

pub use company::{AnalystRecommendationsTool, CompanyInfoTool};
pub use news::CompanyNewsTool;
pub use price::{CurrentPriceTool, HistoricalPricesTool};

use crate::api::MarketDataSource;
use crate::cache::CacheTiers;
use crate::capability::{Capability, CapabilityFlags};
use crate::config::FinanceToolsConfig;
use agent_tools::{ReasoningTools, Tool, ToolDescriptor};
use std::sync::Arc;
use tracing::debug;

/// Name of the market-data toolkit
pub const MARKET_DATA_TOOLKIT: &str = "yfinance_tools";

/// What every market-data tool shares
#[derive(Clone)]
pub struct ToolContext {
    pub source: Arc<dyn MarketDataSource>,
    pub cache: CacheTiers,
    pub config: Arc<FinanceToolsConfig>,
}

impl ToolContext {
    pub fn new(source: Arc<dyn MarketDataSource>, config: &FinanceToolsConfig) -> Self {
        Self {
            source,
            cache: CacheTiers::new(config),
            config: Arc::new(config.clone()),
        }
    }
}

fn tool_for(capability: Capability, ctx: &ToolContext) -> Arc<dyn Tool> {
    let ctx = ctx.clone();
    match capability {
        Capability::StockPrice => Arc::new(CurrentPriceTool::new(ctx)),
        Capability::HistoricalPrices => Arc::new(HistoricalPricesTool::new(ctx)),
        Capability::CompanyInfo => Arc::new(CompanyInfoTool::new(ctx)),
        Capability::AnalystRecommendations => Arc::new(AnalystRecommendationsTool::new(ctx)),
        Capability::CompanyNews => Arc::new(CompanyNewsTool::new(ctx)),
    }
}

/// Build the toolkits offered to the model
///
/// No request is made here; `source` is only called when a tool runs.
pub fn build_tools(
    flags: &CapabilityFlags,
    source: Arc<dyn MarketDataSource>,
    config: &FinanceToolsConfig,
) -> Vec<ToolDescriptor> {
    let mut toolkits = vec![ReasoningTools::new().descriptor()];

    let enabled = flags.enabled();
    if enabled.is_empty() {
        debug!("No market-data capability enabled");
        return toolkits;
    }

    let ctx = ToolContext::new(source, config);
    let tools = enabled.iter().map(|c| tool_for(*c, &ctx)).collect();
    toolkits.push(
        ToolDescriptor::new(MARKET_DATA_TOOLKIT, tools)
            .with_capabilities(enabled.iter().map(|c| c.name())),
    );
    debug!(capabilities = ?enabled, "Built market-data toolkit");
    toolkits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::source::MockMarketDataSource;

    fn names(toolkits: &[ToolDescriptor]) -> Vec<Vec<&str>> {
        toolkits.iter().map(ToolDescriptor::function_names).collect()
    }

    #[test]
    fn test_reasoning_always_first() {
        let source = Arc::new(MockMarketDataSource::new());
        let toolkits = build_tools(&CapabilityFlags::default(), source, &FinanceToolsConfig::default());

        assert_eq!(toolkits.len(), 1);
        assert_eq!(names(&toolkits), vec![vec!["think", "analyze"]]);
    }

    #[test]
    fn test_every_flag_combination_keeps_canonical_order() {
        for mask in 0u8..32 {
            let mut flags = CapabilityFlags::default();
            for (bit, capability) in Capability::ALL.into_iter().enumerate() {
                flags.set(capability, mask & (1 << bit) != 0);
            }

            let source = Arc::new(MockMarketDataSource::new());
            let toolkits = build_tools(&flags, source, &FinanceToolsConfig::default());
            assert_eq!(toolkits[0].function_names(), vec!["think", "analyze"]);

            let expected: Vec<&str> = flags.enabled().into_iter().map(Capability::function_name).collect();
            if expected.is_empty() {
                assert_eq!(toolkits.len(), 1, "mask {mask}");
            } else {
                assert_eq!(toolkits.len(), 2, "mask {mask}");
                assert_eq!(toolkits[1].name(), MARKET_DATA_TOOLKIT);
                assert_eq!(toolkits[1].function_names(), expected, "mask {mask}");
            }
        }
    }

    #[test]
    fn test_toolkit_advertises_enabled_capabilities() {
        let flags = CapabilityFlags {
            stock_price: true,
            company_news: true,
            ..CapabilityFlags::default()
        };
        let source = Arc::new(MockMarketDataSource::new());
        let toolkits = build_tools(&flags, source, &FinanceToolsConfig::default());

        assert!(toolkits[1].has_capability("stock_price"));
        assert!(toolkits[1].has_capability("company_news"));
        assert!(!toolkits[1].has_capability("company_info"));
    }
}
