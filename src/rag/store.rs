//! VectorStore trait: the similarity-search boundary of the pipeline.
//!
//! The store is a black box: it receives a query vector and a result limit and
//! answers with scored hotel records. The primary implementation is
//! `CouchbaseVectorStore` in the `couchbase` module.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::ProviderError;

/// A scalar metadata value attached to a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Scalar {
    /// Convert a JSON value, rejecting arrays, objects and null.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(Scalar::Bool(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(Scalar::Number),
            serde_json::Value::String(s) => Some(Scalar::Text(s.clone())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Number(n) => write!(f, "{}", n),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

/// One hotel document returned by a similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Unique document identifier.
    pub id: String,
    /// Text used to build the prompt context.
    pub text: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, Scalar>,
    /// Similarity score (higher = better), comparable only within one response.
    pub score: f32,
}

impl Record {
    pub fn new(id: impl Into<String>, text: impl Into<String>, score: f32) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: BTreeMap::new(),
            score,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Scalar) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Abstract similarity-search backend.
///
/// Implementations must be safe to share between concurrent requests.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    /// Return up to `limit` records closest to `query_vector`.
    ///
    /// Ordering of the returned records is not relied upon.
    async fn similarity_search(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<Record>, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_from_json() {
        assert_eq!(Scalar::from_json(&json!("Malibu")), Some(Scalar::Text("Malibu".into())));
        assert_eq!(Scalar::from_json(&json!(4.5)), Some(Scalar::Number(4.5)));
        assert_eq!(Scalar::from_json(&json!(true)), Some(Scalar::Bool(true)));
        assert_eq!(Scalar::from_json(&json!(null)), None);
        assert_eq!(Scalar::from_json(&json!(["a"])), None);
        assert_eq!(Scalar::from_json(&json!({"a": 1})), None);
    }

    #[test]
    fn test_record_metadata_serializes_untagged() {
        let record = Record::new("hotel_1", "Ocean view rooms.", 0.9)
            .with_metadata("city", Scalar::Text("San Diego".into()))
            .with_metadata("price", Scalar::Number(180.0));

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["metadata"]["city"], "San Diego");
        assert_eq!(value["metadata"]["price"], 180.0);
    }
}
