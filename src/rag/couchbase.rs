//! Couchbase Search (FTS) vector store client.
//!
//! Issues `knn` queries against a scoped vector search index over the Search
//! service REST API. Hits carry their stored fields, which are mapped to
//! [`Record`]s: the configured text field becomes the record text and every
//! other scalar field becomes metadata (`metadata.` prefixes stripped).

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::store::{Record, Scalar, VectorStore};
use crate::core::config::CouchbaseSettings;
use crate::core::errors::ProviderError;

const PROVIDER: &str = "couchbase";
const METADATA_PREFIX: &str = "metadata.";

#[derive(Clone)]
pub struct CouchbaseVectorStore {
    search_endpoint: String,
    username: String,
    password: String,
    bucket: String,
    scope: String,
    collection: String,
    index: String,
    text_field: String,
    embedding_field: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: String,
    score: f64,
    #[serde(default)]
    fields: serde_json::Map<String, Value>,
}

impl CouchbaseVectorStore {
    pub fn new(settings: &CouchbaseSettings, request_timeout: Duration) -> Result<Self, ProviderError> {
        let search_endpoint = search_endpoint(&settings.connection_string)?;
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(request_timeout.min(Duration::from_secs(5)))
            .build()
            .map_err(|e| ProviderError::rejected(PROVIDER, e.to_string()))?;

        Ok(Self {
            search_endpoint,
            username: settings.username.clone(),
            password: settings.password.clone(),
            bucket: settings.bucket.clone(),
            scope: settings.scope.clone(),
            collection: settings.collection.clone(),
            index: settings.search_index.clone(),
            text_field: settings.text_field.clone(),
            embedding_field: settings.embedding_field.clone(),
            client,
        })
    }

    pub fn search_endpoint(&self) -> &str {
        &self.search_endpoint
    }

    fn query_url(&self) -> String {
        format!(
            "{}/api/bucket/{}/scope/{}/index/{}/query",
            self.search_endpoint, self.bucket, self.scope, self.index
        )
    }

    fn query_body(&self, query_vector: &[f32], limit: usize) -> Value {
        json!({
            "fields": ["*"],
            "query": { "match_none": {} },
            "knn": [{
                "field": self.embedding_field,
                "vector": query_vector,
                "k": limit,
            }],
            "size": limit,
            "collections": [self.collection],
        })
    }

    /// Check that the Search service answers, bounded by `timeout`.
    pub async fn ping(&self, timeout: Duration) -> Result<(), ProviderError> {
        let url = format!("{}/api/ping", self.search_endpoint);
        let res = self
            .client
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(PROVIDER, status.as_u16(), &body));
        }
        Ok(())
    }

    fn hit_to_record(&self, hit: SearchHit) -> Record {
        let mut text = String::new();
        let mut metadata = BTreeMap::new();

        for (key, value) in hit.fields {
            if key == self.text_field {
                text = match value {
                    Value::String(s) => s,
                    Value::Array(items) => items
                        .iter()
                        .filter_map(Value::as_str)
                        .collect::<Vec<_>>()
                        .join("\n"),
                    other => other.to_string(),
                };
                continue;
            }
            if key == self.embedding_field {
                continue;
            }
            if let Some(scalar) = Scalar::from_json(&value) {
                let name = key.strip_prefix(METADATA_PREFIX).unwrap_or(&key).to_string();
                metadata.insert(name, scalar);
            }
        }

        Record {
            id: hit.id,
            text,
            metadata,
            score: hit.score as f32,
        }
    }

    fn parse_response(&self, payload: &str) -> Result<Vec<Record>, ProviderError> {
        let response: SearchResponse = serde_json::from_str(payload)
            .map_err(|e| ProviderError::malformed(PROVIDER, format!("search response: {}", e)))?;
        Ok(response
            .hits
            .into_iter()
            .map(|hit| self.hit_to_record(hit))
            .collect())
    }
}

#[async_trait]
impl VectorStore for CouchbaseVectorStore {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn similarity_search(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<Record>, ProviderError> {
        let res = self
            .client
            .post(self.query_url())
            .basic_auth(&self.username, Some(&self.password))
            .json(&self.query_body(query_vector, limit))
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))?;

        let status = res.status();
        let payload = res
            .text()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))?;

        if !status.is_success() {
            return Err(ProviderError::from_status(PROVIDER, status.as_u16(), &payload));
        }
        self.parse_response(&payload)
    }
}

/// Derive the Search service base URL from a cluster connection string.
///
/// `couchbase://host` → `http://host:8094`, `couchbases://host` →
/// `https://host:18094`; `http(s)://` URLs are used as given. Only the first
/// host of a multi-host connection string is used.
pub fn search_endpoint(connection_string: &str) -> Result<String, ProviderError> {
    let trimmed = connection_string.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return Ok(trimmed.to_string());
    }

    let (scheme, port, rest) = if let Some(rest) = trimmed.strip_prefix("couchbases://") {
        ("https", 18094, rest)
    } else if let Some(rest) = trimmed.strip_prefix("couchbase://") {
        ("http", 8094, rest)
    } else {
        return Err(ProviderError::rejected(
            PROVIDER,
            format!("unsupported connection string '{}'", connection_string),
        ));
    };

    let first = rest
        .split(['/', '?'])
        .next()
        .and_then(|hosts| hosts.split(',').next())
        .unwrap_or_default();

    // IPv6 literals keep their brackets; the port follows the closing one.
    let host = match first.strip_prefix('[') {
        Some(inner) => match inner.find(']') {
            Some(end) if end > 0 => &first[..end + 2],
            _ => {
                return Err(ProviderError::rejected(
                    PROVIDER,
                    format!("malformed IPv6 host in '{}'", connection_string),
                ))
            }
        },
        None => first.split(':').next().unwrap_or(first),
    };
    if host.is_empty() {
        return Err(ProviderError::rejected(
            PROVIDER,
            format!("no host in '{}'", connection_string),
        ));
    }

    Ok(format!("{}://{}:{}", scheme, host, port))
}
