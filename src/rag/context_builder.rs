//! Context assembly.
//!
//! Turns ranked records into a bounded context by:
//! 1. Walking records in rank order (never reordering)
//! 2. Skipping ids already included
//! 3. Admitting fragments while the character budget allows, truncating the
//!    first fragment that does not fit and stopping there
//!
//! Size is measured in characters (Unicode scalar values) of fragment text.
//! The id annotation is not counted against the budget.

use std::collections::HashSet;

use serde::Serialize;

use super::store::Record;

/// One record's contribution to the context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextFragment {
    /// Id of the source record.
    pub id: String,
    pub text: String,
    /// Whether `text` was cut to fit the budget.
    pub truncated: bool,
}

impl ContextFragment {
    pub fn size(&self) -> usize {
        self.text.chars().count()
    }
}

/// Ordered, budget-bounded record fragments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Context {
    fragments: Vec<ContextFragment>,
    budget: usize,
}

impl Context {
    pub fn empty(budget: usize) -> Self {
        Self {
            fragments: Vec::new(),
            budget,
        }
    }

    pub fn fragments(&self) -> &[ContextFragment] {
        &self.fragments
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Total characters used by fragment text.
    pub fn size(&self) -> usize {
        self.fragments.iter().map(ContextFragment::size).sum()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.fragments.iter().map(|f| f.id.as_str())
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.fragments.iter().any(|f| f.id == id)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ContextAssembler;

impl ContextAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Build a context from rank-ordered `records` within `budget` characters.
    pub fn assemble(&self, records: &[Record], budget: usize) -> Context {
        let mut context = Context::empty(budget);
        let mut seen: HashSet<&str> = HashSet::new();
        let mut used = 0usize;

        for record in records {
            if !seen.insert(record.id.as_str()) {
                tracing::debug!("Skipping duplicate record '{}'", record.id);
                continue;
            }

            let remaining = budget.saturating_sub(used);
            if remaining == 0 {
                break;
            }

            let size = record.text.chars().count();
            if size <= remaining {
                context.fragments.push(ContextFragment {
                    id: record.id.clone(),
                    text: record.text.clone(),
                    truncated: false,
                });
                used += size;
                continue;
            }

            context.fragments.push(ContextFragment {
                id: record.id.clone(),
                text: truncate_chars(&record.text, remaining).to_string(),
                truncated: true,
            });
            break;
        }

        context
    }
}

/// Longest prefix of `text` holding at most `max_chars` characters.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
