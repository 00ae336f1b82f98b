//! Market-data toolkit and financial report agent
//!
//! This crate gives the agent runtime its market-data functions:
//!
//! - Latest and historical prices through `yahoo_finance_api`
//! - Company profile, analyst recommendations and news from Yahoo's JSON endpoints
//! - Per-class result caching and client-side rate limiting
//! - [`build_tools`], which pairs the reasoning toolkit with the enabled
//!   market-data capabilities
//!
//! The `finance-report` binary wires these to a Gemini-backed dispatcher and
//! streams a report on NVDA to stdout.
//!
//! # Example
//!
//! ```rust,ignore
//! use agent_finance::{CapabilityFlags, FinanceToolsConfig, YahooFinanceClient, build_tools};
//! use std::sync::Arc;
//!
//! let config = FinanceToolsConfig::default();
//! let source = Arc::new(YahooFinanceClient::new(&config)?);
//! let toolkits = build_tools(&CapabilityFlags::all(), source, &config);
//! assert_eq!(toolkits[0].name(), "reasoning_tools");
//! ```

pub mod api;
pub mod cache;
pub mod capability;
pub mod config;
pub mod error;
pub mod prompts;
pub mod tools;

pub use api::{MarketDataSource, YahooFinanceClient};
pub use capability::{Capability, CapabilityFlags};
pub use config::FinanceToolsConfig;
pub use error::{FinanceError, Result};
pub use tools::{MARKET_DATA_TOOLKIT, build_tools};
