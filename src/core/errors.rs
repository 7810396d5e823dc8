use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::pipeline::PipelineStage;

// ---------------------------------------------------------------------------
// Startup / request errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required configuration: {}", join_keys(.missing))]
    Missing { missing: BTreeSet<String> },

    #[error("invalid configuration value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

impl ConfigError {
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Keys that were absent or empty. Empty for `Invalid`.
    pub fn missing_keys(&self) -> Vec<&str> {
        match self {
            Self::Missing { missing } => missing.iter().map(String::as_str).collect(),
            Self::Invalid { .. } => Vec::new(),
        }
    }
}

fn join_keys(keys: &BTreeSet<String>) -> String {
    keys.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("query text is empty")]
    EmptyQuery,
    #[error("top_k must be at least 1, got {0}")]
    InvalidTopK(usize),
    #[error("query is {len} characters long, the limit is {max}")]
    QueryTooLong { len: usize, max: usize },
}

// ---------------------------------------------------------------------------
// Outbound calls
// ---------------------------------------------------------------------------

/// How an outbound call failed. Drives the retry decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Network hiccup, 5xx, rate limiting.
    Transient,
    Timeout,
    /// Credentials refused or lacking permission.
    Unauthorized,
    /// The request itself was refused (unknown index, bad model name).
    Rejected,
    /// The provider answered with something we could not use.
    Malformed,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::Transient => "transient",
            FailureKind::Timeout => "timeout",
            FailureKind::Unauthorized => "unauthorized",
            FailureKind::Rejected => "rejected",
            FailureKind::Malformed => "malformed",
        };
        f.write_str(label)
    }
}

/// Failure of an embedding, vector-store or generation call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{provider} {kind} failure: {message}")]
pub struct ProviderError {
    pub provider: String,
    pub kind: FailureKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(provider: impl Into<String>, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn transient(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(provider, FailureKind::Transient, message)
    }

    pub fn timeout(provider: impl Into<String>, after: Duration) -> Self {
        Self::new(
            provider,
            FailureKind::Timeout,
            format!("no response within {}ms", after.as_millis()),
        )
    }

    pub fn unauthorized(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(provider, FailureKind::Unauthorized, message)
    }

    pub fn rejected(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(provider, FailureKind::Rejected, message)
    }

    pub fn malformed(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(provider, FailureKind::Malformed, message)
    }

    /// Classify an HTTP status returned by a provider.
    pub fn from_status(provider: impl Into<String>, status: u16, body: &str) -> Self {
        let message = format!("HTTP {}: {}", status, body.trim());
        let kind = match status {
            401 | 403 => FailureKind::Unauthorized,
            408 => FailureKind::Timeout,
            429 | 500..=599 => FailureKind::Transient,
            _ => FailureKind::Rejected,
        };
        Self::new(provider, kind, message)
    }

    /// Classify a transport-level `reqwest` failure.
    pub fn from_reqwest(provider: impl Into<String>, err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            FailureKind::Timeout
        } else if err.is_builder() {
            // The request could not be built, usually an unusable URL.
            FailureKind::Rejected
        } else if err.is_decode() {
            FailureKind::Malformed
        } else if let Some(status) = err.status() {
            return Self::from_status(provider, status.as_u16(), &err.to_string());
        } else {
            FailureKind::Transient
        };
        Self::new(provider, kind, err.to_string())
    }

    /// Whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, FailureKind::Transient | FailureKind::Timeout)
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    #[error("invalid query: {0}")]
    Validation(#[from] ValidationError),

    #[error("embedding failed after {attempts} attempt(s): {source}")]
    Embedding {
        #[source]
        source: ProviderError,
        attempts: u32,
    },

    #[error("retrieval failed after {attempts} attempt(s): {source}")]
    Retrieval {
        #[source]
        source: ProviderError,
        attempts: u32,
    },

    #[error("generation failed after {attempts} attempt(s): {source}")]
    Generation {
        #[source]
        source: ProviderError,
        attempts: u32,
    },
}

impl PipelineError {
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            PipelineError::Validation(_) => None,
            PipelineError::Embedding { source, .. }
            | PipelineError::Retrieval { source, .. }
            | PipelineError::Generation { source, .. } => Some(source),
        }
    }

    /// Whether the caller may sensibly resubmit the same query later.
    pub fn is_retryable(&self) -> bool {
        self.provider_error()
            .map(ProviderError::is_retryable)
            .unwrap_or(false)
    }
}

/// A request that ended in `FAILED`.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{error} (failed in {failed_stage}, last completed {last_completed})")]
pub struct PipelineFailure {
    #[source]
    pub error: PipelineError,
    pub failed_stage: PipelineStage,
    pub last_completed: PipelineStage,
}

impl PipelineFailure {
    /// Short machine-readable label the presentation layer can branch on.
    pub fn outcome(&self) -> &'static str {
        match &self.error {
            PipelineError::Validation(_) => "invalid_query",
            e if e.is_retryable() => "retry",
            _ => "upstream_failed",
        }
    }
}

impl IntoResponse for PipelineFailure {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.error {
            PipelineError::Validation(_) => StatusCode::BAD_REQUEST,
            e if e.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_GATEWAY,
        };

        let body = Json(json!({
            "error": self.error.to_string(),
            "kind": self.outcome(),
            "stage": self.failed_stage,
            "last_completed": self.last_completed,
            "retryable": self.error.is_retryable(),
        }));
        (status, body).into_response()
    }
}

// ---------------------------------------------------------------------------
// HTTP surface
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Pipeline(#[from] PipelineFailure),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::Pipeline(failure) => failure.into_response(),
            ApiError::BadRequest(msg) => {
                let body = Json(json!({
                    "error": msg,
                    "kind": "invalid_query",
                    "retryable": false,
                }));
                (StatusCode::BAD_REQUEST, body).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_are_listed_in_message() {
        let err = ConfigError::Missing {
            missing: ["COUCHBASE_PASSWORD", "COUCHBASE_SEARCH_INDEX"]
                .into_iter()
                .map(String::from)
                .collect(),
        };
        assert_eq!(
            err.to_string(),
            "missing required configuration: COUCHBASE_PASSWORD, COUCHBASE_SEARCH_INDEX"
        );
        assert_eq!(
            err.missing_keys(),
            vec!["COUCHBASE_PASSWORD", "COUCHBASE_SEARCH_INDEX"]
        );
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(
            ProviderError::from_status("couchbase", 401, "").kind,
            FailureKind::Unauthorized
        );
        assert_eq!(
            ProviderError::from_status("couchbase", 403, "").kind,
            FailureKind::Unauthorized
        );
        assert_eq!(
            ProviderError::from_status("openai", 429, "slow down").kind,
            FailureKind::Transient
        );
        assert_eq!(
            ProviderError::from_status("openai", 503, "").kind,
            FailureKind::Transient
        );
        assert_eq!(
            ProviderError::from_status("couchbase", 404, "index not found").kind,
            FailureKind::Rejected
        );
        assert_eq!(
            ProviderError::from_status("openai", 408, "").kind,
            FailureKind::Timeout
        );
    }

    #[test]
    fn test_request_build_failure_is_not_retryable() {
        let err = reqwest::Client::new()
            .get("localhost:1234/v1/embeddings")
            .build()
            .unwrap_err();
        assert!(err.is_builder());

        let err = ProviderError::from_reqwest("openai", err);
        assert_eq!(err.kind, FailureKind::Rejected);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_retryable_split() {
        assert!(ProviderError::transient("x", "reset").is_retryable());
        assert!(ProviderError::timeout("x", Duration::from_secs(1)).is_retryable());
        assert!(!ProviderError::unauthorized("x", "bad password").is_retryable());
        assert!(!ProviderError::rejected("x", "no index").is_retryable());
        assert!(!ProviderError::malformed("x", "garbage").is_retryable());
    }

    #[test]
    fn test_failure_outcome_labels() {
        let retry = PipelineFailure {
            error: PipelineError::Generation {
                source: ProviderError::timeout("openai", Duration::from_secs(60)),
                attempts: 3,
            },
            failed_stage: PipelineStage::Generating,
            last_completed: PipelineStage::Assembling,
        };
        assert_eq!(retry.outcome(), "retry");

        let auth = PipelineFailure {
            error: PipelineError::Retrieval {
                source: ProviderError::unauthorized("couchbase", "HTTP 401"),
                attempts: 1,
            },
            failed_stage: PipelineStage::Retrieving,
            last_completed: PipelineStage::Embedding,
        };
        assert_eq!(auth.outcome(), "upstream_failed");

        let invalid = PipelineFailure {
            error: ValidationError::EmptyQuery.into(),
            failed_stage: PipelineStage::Init,
            last_completed: PipelineStage::Init,
        };
        assert_eq!(invalid.outcome(), "invalid_query");
    }
}
