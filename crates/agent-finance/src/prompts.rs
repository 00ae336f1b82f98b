//! Analyst persona, report formatting rules and the default query

use crate::capability::CapabilityFlags;
use agent_runtime::InstructionSet;

/// Gemini model the report is generated with
pub const MODEL_ID: &str = "gemini-2.5-flash-preview-05-20";

/// The analyst persona
pub const PERSONA: &str = "You are a professional financial analyst. Your purpose is to analyze \
the stock market for specific companies and provide a comprehensive report based on your \
analysis. You have access to tools that can fetch financial data. You must use these tools to \
gather information before providing your final answer.";

/// Report formatting rules, in prompt order
pub const INSTRUCTIONS: [&str; 2] = [
    "Use only tables to display the data.",
    "Only output the report, no other text.",
];

/// The query the report binary answers
pub const REPORT_QUERY: &str = "Write a report on NVDA.";

/// Formatting rules as an [`InstructionSet`]
pub fn instructions() -> InstructionSet {
    InstructionSet::new(INSTRUCTIONS)
}

/// Capabilities the report binary enables
pub fn default_flags() -> CapabilityFlags {
    CapabilityFlags::all()
}
