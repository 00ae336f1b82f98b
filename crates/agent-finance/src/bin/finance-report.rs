//! Financial report generator
//!
//! Streams an analyst report on NVDA, built from live Yahoo Finance data, to
//! stdout. Tool calls and reasoning steps are traced as they happen.
//!
//! # Usage
//!
//! ```bash
//! export GEMINI_API_KEY="..."   # or put it in .env
//! cargo run --bin finance-report -p agent-finance
//! ```

use agent_finance::prompts::{MODEL_ID, PERSONA, REPORT_QUERY, default_flags, instructions};
use agent_finance::{FinanceToolsConfig, YahooFinanceClient, build_tools};
use agent_llm::providers::{GeminiConfig, GeminiProvider};
use agent_runtime::{Dispatcher, Query};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = agent_utils::settings();
    agent_utils::init_tracing(settings.log());
    settings.report();

    // Fail on a missing key before anything else is built
    let gemini = GeminiConfig::from_settings(settings).map_err(agent_core::Error::from)?;
    let provider = Arc::new(GeminiProvider::with_config(gemini).map_err(agent_core::Error::from)?);

    let config = FinanceToolsConfig::default();
    let source = Arc::new(YahooFinanceClient::new(&config)?);
    let toolkits = build_tools(&default_flags(), source, &config);

    let dispatcher = Dispatcher::builder(provider)
        .toolkits(toolkits)
        .instructions(instructions())
        .persona(PERSONA)
        .markdown(true)
        .show_tool_calls(true)
        .model(MODEL_ID)
        .build()?;

    info!(model = MODEL_ID, "Generating report");

    let query = Query::new(REPORT_QUERY)
        .stream(true)
        .show_full_reasoning(true)
        .stream_intermediate_steps(true);

    let output = dispatcher.print_response(&query, std::io::stdout()).await?;
    info!(
        tool_calls = output.tool_calls.len(),
        elapsed_ms = output.elapsed_ms,
        "Report complete"
    );

    Ok(())
}
