//! Best-effort mapping of generated text back to context record ids.
//!
//! Bracketed markers (`[hotel_12]`, `[hotel_12, hotel_40]`) are matched first.
//! When the model cites nothing in brackets, bare occurrences of an id are
//! accepted as long as they are not embedded in a longer word.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

use super::context_builder::Context;

fn marker_regex() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(r"\[([^\[\]\n]{1,256})\]").expect("static marker regex"))
}

/// Ids from `context` referenced by `generated`. Always a subset of the context ids.
pub fn supporting_ids(generated: &str, context: &Context) -> BTreeSet<String> {
    let known: BTreeSet<&str> = context.ids().collect();
    let mut found = BTreeSet::new();

    for caps in marker_regex().captures_iter(generated) {
        for candidate in caps[1].split(',') {
            let candidate = candidate.trim().trim_start_matches("Source:").trim();
            if known.contains(candidate) {
                found.insert(candidate.to_string());
            }
        }
    }

    if found.is_empty() {
        for id in &known {
            if mentions_bare(generated, id) {
                found.insert(id.to_string());
            }
        }
    }

    found
}

fn mentions_bare(text: &str, id: &str) -> bool {
    if id.is_empty() {
        return false;
    }
    text.match_indices(id).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + id.len()..].chars().next();
        !before.is_some_and(is_id_char) && !after.is_some_and(is_id_char)
    })
}

fn is_id_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}
