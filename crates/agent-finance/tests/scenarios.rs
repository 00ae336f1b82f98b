//! End-to-end runs over a scripted model and an in-memory data source

mod support;

use agent_finance::prompts::{PERSONA, instructions};
use agent_finance::{CapabilityFlags, FinanceToolsConfig, build_tools};
use agent_llm::test_support::{ScriptedProvider, ScriptedTurn, text_turn, tool_turn};
use agent_runtime::{Dispatcher, Query};
use futures::StreamExt;
use serde_json::json;
use std::process::Command;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use support::CountingSource;

fn dispatcher(provider: Arc<ScriptedProvider>, source: Arc<CountingSource>, flags: CapabilityFlags) -> Dispatcher {
    let toolkits = build_tools(&flags, source, &FinanceToolsConfig::default());
    Dispatcher::builder(provider)
        .toolkits(toolkits)
        .instructions(instructions())
        .persona(PERSONA)
        .markdown(true)
        .show_tool_calls(true)
        .build()
        .unwrap()
}

#[tokio::test]
async fn price_only_toolkit_never_touches_news() {
    let flags = CapabilityFlags {
        stock_price: true,
        company_news: false,
        ..CapabilityFlags::default()
    };
    let provider = Arc::new(ScriptedProvider::new([
        tool_turn("call_1", "get_current_stock_price", json!({"symbol": "NVDA"})),
        tool_turn("call_2", "get_company_news", json!({"symbol": "NVDA"})),
        text_turn("| Ticker | Price |\n| NVDA | 181.2000 |"),
    ]));
    let source = Arc::new(CountingSource::new(181.2));
    let dispatcher = dispatcher(Arc::clone(&provider), Arc::clone(&source), flags);

    let functions: Vec<&str> = dispatcher
        .toolkits()
        .iter()
        .flat_map(|t| t.function_names())
        .collect();
    assert_eq!(functions, vec!["think", "analyze", "get_current_stock_price"]);

    let query = Query::new("What is the latest news on NVDA?");
    let output = dispatcher.print_response(&query, Vec::new()).await.unwrap();

    assert_eq!(source.counts().news.load(Ordering::SeqCst), 0);
    assert_eq!(source.counts().current_price.load(Ordering::SeqCst), 1);
    assert!(output.content.contains("181.2000"));

    let news_call = &output.tool_calls[1];
    assert_eq!(news_call.name, "get_company_news");
    assert!(news_call.is_error());

    let offered: Vec<String> = provider.requests()[0]
        .tools
        .iter()
        .flatten()
        .map(|d| d.name.clone())
        .collect();
    assert!(!offered.iter().any(|n| n == "get_company_news"));
}

#[tokio::test]
async fn streamed_report_matches_plain_report() {
    let script = || {
        Arc::new(ScriptedProvider::new([
            tool_turn("call_1", "think", json!({"title": "Plan", "thought": "Fetch data first"})),
            tool_turn("call_2", "get_company_info", json!({"symbol": "NVDA"})),
            text_turn("| Company | NVDA Inc. |"),
        ]))
    };
    let query = Query::new("Write a report on NVDA.");

    let plain_source = Arc::new(CountingSource::default());
    let plain = dispatcher(script(), Arc::clone(&plain_source), CapabilityFlags::all())
        .print_response(&query, Vec::new())
        .await
        .unwrap();

    let streamed_source = Arc::new(CountingSource::default());
    let streamed_query = query
        .clone()
        .stream(true)
        .show_full_reasoning(true)
        .stream_intermediate_steps(true);
    let mut out = Vec::new();
    let streamed = dispatcher(script(), Arc::clone(&streamed_source), CapabilityFlags::all())
        .print_response(&streamed_query, &mut out)
        .await
        .unwrap();

    assert_eq!(plain.content, streamed.content);
    assert_eq!(plain.reasoning_steps, streamed.reasoning_steps);
    assert_eq!(streamed_source.counts().company_profile.load(Ordering::SeqCst), 1);

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Reasoning step 1: Plan"));
    assert!(text.contains("• Running: get_company_info(symbol=NVDA)"));
}

#[tokio::test]
async fn auth_failure_yields_no_data_events() {
    let provider = Arc::new(ScriptedProvider::new([ScriptedTurn::AuthFailure]));
    let source = Arc::new(CountingSource::default());
    let dispatcher = dispatcher(provider, Arc::clone(&source), CapabilityFlags::all());

    let query = Query::new("Write a report on NVDA.")
        .stream(true)
        .stream_intermediate_steps(true);
    let items: Vec<_> = dispatcher.dispatch(&query).collect().await;

    assert_eq!(items.len(), 1);
    assert!(matches!(items[0], Err(agent_core::Error::Backend(_))));
    assert_eq!(source.counts().total(), 0);
}

#[test]
fn binary_exits_nonzero_without_api_key() {
    let dir = std::env::temp_dir().join(format!("finance-report-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_finance-report"))
        .current_dir(&dir)
        .env("GEMINI_API_KEY", "")
        .env_remove("GEMINI_API_BASE")
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("GEMINI_API_KEY"), "stderr: {stderr}");
}

#[cfg(unix)]
#[test]
fn binary_reports_missing_key_despite_non_utf8_environment() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let dir = std::env::temp_dir().join(format!("finance-report-os-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_finance-report"))
        .current_dir(&dir)
        .env("GEMINI_API_KEY", "")
        .env("FINANCE_REPORT_RAW_BYTES", OsStr::from_bytes(b"\xff\xfe"))
        .env_remove("GEMINI_API_BASE")
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert_ne!(output.status.code(), Some(101));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stderr.contains("panicked"), "stderr: {stderr}");
    assert!(stderr.contains("GEMINI_API_KEY"), "stderr: {stderr}");
}
