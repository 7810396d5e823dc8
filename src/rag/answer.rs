use std::collections::BTreeSet;

use serde::Serialize;

/// Reply given when retrieval produced no usable hotel records.
pub const NO_GROUNDED_MATCH: &str =
    "I could not find any hotels in our records that match this request, so I have no grounded recommendation to offer.";

/// Final output of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    pub text: String,
    /// Ids of context records the text refers to. Best effort.
    pub supporting_ids: BTreeSet<String>,
    /// False when the context was empty and `text` is the no-match reply.
    pub grounded: bool,
}

impl Answer {
    pub fn no_grounded_match() -> Self {
        Self {
            text: NO_GROUNDED_MATCH.to_string(),
            supporting_ids: BTreeSet::new(),
            grounded: false,
        }
    }
}
