//! Prompt construction from an assembled context and the user's query.

use serde::Serialize;

use super::context_builder::Context;

pub const HOTEL_INSTRUCTIONS: &str = "You are a helpful hotel recommendation assistant. \
Using only the provided hotel information, recommend options matching the request. \
Answer the question as truthfully as possible using the context below. \
When you rely on a hotel record, cite its id in square brackets, for example [hotel_123]. \
If no information is relevant, say so plainly instead of guessing.";

pub const NO_RECORDS_NOTICE: &str =
    "No matching hotel records were found for this request. Tell the user that no grounded information is available.";

/// Immutable generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    pub instructions: String,
    pub context: Context,
    pub query: String,
}

impl Prompt {
    /// Render into the single text blob sent to the model.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(
            self.instructions.len() + self.context.size() + self.query.len() + 64,
        );
        out.push_str(&self.instructions);
        out.push_str("\n\nContext:\n");

        if self.context.is_empty() {
            out.push_str(NO_RECORDS_NOTICE);
            out.push('\n');
        } else {
            for fragment in self.context.fragments() {
                out.push('[');
                out.push_str(&fragment.id);
                out.push_str("] ");
                out.push_str(&fragment.text);
                out.push('\n');
            }
        }

        out.push_str("\nQuestion: ");
        out.push_str(&self.query);
        out
    }
}

#[derive(Debug, Clone)]
pub struct PromptBuilder {
    instructions: String,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::with_instructions(HOTEL_INSTRUCTIONS)
    }

    pub fn with_instructions(instructions: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
        }
    }

    /// Combine instructions, context and query. Performs no truncation.
    pub fn build(&self, context: &Context, query: &str) -> Prompt {
        Prompt {
            instructions: self.instructions.clone(),
            context: context.clone(),
            query: query.to_string(),
        }
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}
