//! Ranked retrieval on top of a [`VectorStore`].
//!
//! The store's own ordering is not trusted: results are re-sorted by
//! descending score with the record id as a stable tie-break, filtered, and
//! cut to `top_k`.

use std::cmp::Ordering;
use std::sync::Arc;

use super::store::{Record, VectorStore};
use crate::core::errors::ProviderError;

/// Caller-supplied predicate deciding which records are kept.
pub type RecordFilter = dyn Fn(&Record) -> bool + Send + Sync;

#[derive(Clone)]
pub struct VectorRetriever {
    store: Arc<dyn VectorStore>,
    min_score: Option<f32>,
}

impl VectorRetriever {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self {
            store,
            min_score: None,
        }
    }

    /// Drop records scoring below `min_score`.
    pub fn with_min_score(mut self, min_score: Option<f32>) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn store_name(&self) -> &str {
        self.store.name()
    }

    /// Issue one similarity search and return at most `top_k` ranked records.
    ///
    /// Fewer matches than `top_k` is not an error.
    pub async fn retrieve(
        &self,
        query_vector: &[f32],
        top_k: usize,
        filter: Option<&RecordFilter>,
    ) -> Result<Vec<Record>, ProviderError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let candidates = self.store.similarity_search(query_vector, top_k).await?;
        let fetched = candidates.len();

        let mut records: Vec<Record> = candidates
            .into_iter()
            .filter(|r| !r.score.is_nan())
            .filter(|r| self.min_score.map_or(true, |min| r.score >= min))
            .filter(|r| filter.map_or(true, |keep| keep(r)))
            .collect();

        records.sort_by(rank_order);
        records.truncate(top_k);

        tracing::debug!(
            "{} returned {} candidate(s), kept {} (top_k={})",
            self.store.name(),
            fetched,
            records.len(),
            top_k
        );
        Ok(records)
    }
}

/// Descending score, then ascending id.
pub fn rank_order(a: &Record, b: &Record) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.id.cmp(&b.id))
}
