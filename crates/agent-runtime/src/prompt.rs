//! System prompt assembly

use agent_tools::ToolDescriptor;
use std::fmt::Write as _;

const MARKDOWN_HINT: &str = "Use markdown to format your answers.";

/// Ordered, immutable list of formatting directives
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstructionSet(Vec<String>);

impl InstructionSet {
    /// Create from any list of directives
    pub fn new<I, S>(instructions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(instructions.into_iter().map(Into::into).collect())
    }

    /// Directives in order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of directives
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no directives
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Compose the system prompt
///
/// Layout: persona, `<instructions>` bullets, `<additional_information>`
/// (markdown hint), then each toolkit's own instructions in toolkit order.
/// Empty sections are left out.
pub fn build_system_prompt(
    persona: &str,
    instructions: &InstructionSet,
    markdown: bool,
    toolkits: &[ToolDescriptor],
) -> String {
    let mut prompt = String::new();

    if !persona.trim().is_empty() {
        prompt.push_str(persona.trim());
        prompt.push_str("\n\n");
    }

    if !instructions.is_empty() {
        prompt.push_str("<instructions>\n");
        for line in instructions.iter() {
            let _ = writeln!(prompt, "- {line}");
        }
        prompt.push_str("</instructions>\n\n");
    }

    if markdown {
        let _ = writeln!(
            prompt,
            "<additional_information>\n- {MARKDOWN_HINT}\n</additional_information>\n"
        );
    }

    for toolkit in toolkits {
        if let Some(text) = toolkit.instructions() {
            prompt.push_str(text.trim());
            prompt.push_str("\n\n");
        }
    }

    prompt.trim_end().to_string()
}
