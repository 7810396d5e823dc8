use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use super::defaults::*;
use crate::core::errors::ConfigError;
use crate::pipeline::RetryPolicy;
use crate::rag::couchbase::search_endpoint;

const REDACT_PLACEHOLDER: &str = "****";

/// Connection and collection identifiers for the Couchbase search service.
#[derive(Clone, PartialEq)]
pub struct CouchbaseSettings {
    pub connection_string: String,
    pub username: String,
    pub password: String,
    pub bucket: String,
    pub scope: String,
    pub collection: String,
    pub search_index: String,
    pub text_field: String,
    pub embedding_field: String,
}

impl fmt::Debug for CouchbaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CouchbaseSettings")
            .field("connection_string", &self.connection_string)
            .field("username", &self.username)
            .field("password", &REDACT_PLACEHOLDER)
            .field("bucket", &self.bucket)
            .field("scope", &self.scope)
            .field("collection", &self.collection)
            .field("search_index", &self.search_index)
            .field("text_field", &self.text_field)
            .field("embedding_field", &self.embedding_field)
            .finish()
    }
}

#[derive(Clone, PartialEq)]
pub struct OpenAiSettings {
    pub api_key: String,
    pub base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
    pub temperature: f32,
    /// Dimension of the vectors stored in the index, when known.
    pub embedding_dimension: Option<usize>,
}

impl fmt::Debug for OpenAiSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiSettings")
            .field("api_key", &REDACT_PLACEHOLDER)
            .field("base_url", &self.base_url)
            .field("embedding_model", &self.embedding_model)
            .field("chat_model", &self.chat_model)
            .field("temperature", &self.temperature)
            .field("embedding_dimension", &self.embedding_dimension)
            .finish()
    }
}

/// Tunables of the answer pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct RagSettings {
    pub default_top_k: usize,
    pub context_budget: usize,
    pub min_score: Option<f32>,
    pub max_query_chars: usize,
    pub embed_timeout: Duration,
    pub search_timeout: Duration,
    pub generate_timeout: Duration,
    pub retry: RetryPolicy,
    pub retry_embedding: bool,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            default_top_k: DEFAULT_TOP_K,
            context_budget: DEFAULT_CONTEXT_BUDGET,
            min_score: None,
            max_query_chars: DEFAULT_MAX_QUERY_CHARS,
            embed_timeout: Duration::from_secs(DEFAULT_EMBED_TIMEOUT_SECS),
            search_timeout: Duration::from_secs(DEFAULT_SEARCH_TIMEOUT_SECS),
            generate_timeout: Duration::from_secs(DEFAULT_GENERATE_TIMEOUT_SECS),
            retry: RetryPolicy {
                max_attempts: DEFAULT_MAX_ATTEMPTS,
                initial_backoff: Duration::from_millis(DEFAULT_BACKOFF_MS),
                ..RetryPolicy::default()
            },
            retry_embedding: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerSettings {
    pub bind_addr: String,
    pub log_dir: PathBuf,
}

/// Fully validated, immutable application configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub couchbase: CouchbaseSettings,
    pub openai: OpenAiSettings,
    pub rag: RagSettings,
    pub server: ServerSettings,
}

/// Check raw parameters and turn them into an [`AppConfig`].
///
/// Every required key that is absent or blank is reported in one
/// `ConfigError::Missing`. Optional keys are parsed afterwards; the first
/// unparsable one is reported as `ConfigError::Invalid`.
pub fn validate(params: &BTreeMap<String, String>) -> Result<AppConfig, ConfigError> {
    let missing: BTreeSet<String> = REQUIRED_KEYS
        .iter()
        .filter(|key| lookup(params, key).is_none())
        .map(|key| key.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ConfigError::Missing { missing });
    }

    let required = |key: &str| lookup(params, key).unwrap_or_default().to_string();

    let couchbase = CouchbaseSettings {
        connection_string: required(COUCHBASE_CONNECTION_STRING),
        username: required(COUCHBASE_USERNAME),
        password: required(COUCHBASE_PASSWORD),
        bucket: required(COUCHBASE_BUCKET),
        scope: required(COUCHBASE_SCOPE),
        collection: required(COUCHBASE_COLLECTION),
        search_index: required(COUCHBASE_SEARCH_INDEX),
        text_field: string_or(params, COUCHBASE_TEXT_FIELD, DEFAULT_TEXT_FIELD),
        embedding_field: string_or(params, COUCHBASE_EMBEDDING_FIELD, DEFAULT_EMBEDDING_FIELD),
    };

    let temperature: f32 = parse_or(params, CHAT_TEMPERATURE, DEFAULT_CHAT_TEMPERATURE)?;
    if !(0.0..=2.0).contains(&temperature) {
        return Err(ConfigError::invalid(CHAT_TEMPERATURE, "must be between 0 and 2"));
    }
    if let Err(e) = search_endpoint(&couchbase.connection_string) {
        return Err(ConfigError::invalid(COUCHBASE_CONNECTION_STRING, e.message));
    }

    let base_url = string_or(params, OPENAI_BASE_URL, DEFAULT_OPENAI_BASE_URL)
        .trim_end_matches('/')
        .to_string();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(ConfigError::invalid(
            OPENAI_BASE_URL,
            format!("'{}' must start with http:// or https://", base_url),
        ));
    }

    let openai = OpenAiSettings {
        api_key: required(OPENAI_API_KEY),
        base_url,
        embedding_model: string_or(params, EMBEDDING_MODEL, DEFAULT_EMBEDDING_MODEL),
        chat_model: string_or(params, CHAT_MODEL, DEFAULT_CHAT_MODEL),
        temperature,
        embedding_dimension: parse_optional_positive(params, EMBEDDING_DIMENSION)?,
    };

    let min_score = parse_optional::<f32>(params, RAG_MIN_SCORE)?;
    if min_score.is_some_and(|s| !s.is_finite()) {
        return Err(ConfigError::invalid(RAG_MIN_SCORE, "must be a finite number"));
    }

    let rag = RagSettings {
        default_top_k: parse_positive_or(params, RAG_DEFAULT_TOP_K, DEFAULT_TOP_K)?,
        context_budget: parse_positive_or(params, RAG_CONTEXT_BUDGET, DEFAULT_CONTEXT_BUDGET)?,
        min_score,
        max_query_chars: parse_positive_or(params, RAG_MAX_QUERY_CHARS, DEFAULT_MAX_QUERY_CHARS)?,
        embed_timeout: secs(params, RAG_EMBED_TIMEOUT_SECS, DEFAULT_EMBED_TIMEOUT_SECS)?,
        search_timeout: secs(params, RAG_SEARCH_TIMEOUT_SECS, DEFAULT_SEARCH_TIMEOUT_SECS)?,
        generate_timeout: secs(params, RAG_GENERATE_TIMEOUT_SECS, DEFAULT_GENERATE_TIMEOUT_SECS)?,
        retry: RetryPolicy {
            max_attempts: parse_positive_or(params, RAG_MAX_ATTEMPTS, DEFAULT_MAX_ATTEMPTS)?,
            initial_backoff: Duration::from_millis(parse_or(params, RAG_BACKOFF_MS, DEFAULT_BACKOFF_MS)?),
            ..RetryPolicy::default()
        },
        retry_embedding: parse_or(params, RAG_RETRY_EMBEDDING, false)?,
    };

    let server = ServerSettings {
        bind_addr: string_or(params, HOTEL_RAG_BIND, DEFAULT_BIND),
        log_dir: PathBuf::from(string_or(params, HOTEL_RAG_LOG_DIR, DEFAULT_LOG_DIR)),
    };

    Ok(AppConfig {
        couchbase,
        openai,
        rag,
        server,
    })
}

fn lookup<'a>(params: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn string_or(params: &BTreeMap<String, String>, key: &str, default: &str) -> String {
    lookup(params, key).unwrap_or(default).to_string()
}

fn parse_optional<T: FromStr>(
    params: &BTreeMap<String, String>,
    key: &str,
) -> Result<Option<T>, ConfigError>
where
    T::Err: fmt::Display,
{
    match lookup(params, key) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::invalid(key, format!("'{}': {}", raw, e))),
        None => Ok(None),
    }
}

fn parse_or<T: FromStr>(
    params: &BTreeMap<String, String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    Ok(parse_optional(params, key)?.unwrap_or(default))
}

/// Parse an unsigned integer that must be at least 1. Values out of range
/// for `T` are reported, not truncated.
fn parse_optional_positive<T>(
    params: &BTreeMap<String, String>,
    key: &str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr + PartialEq + From<u8>,
    T::Err: fmt::Display,
{
    match parse_optional::<T>(params, key)? {
        Some(v) if v == T::from(0) => Err(ConfigError::invalid(key, "must be at least 1")),
        other => Ok(other),
    }
}

fn parse_positive_or<T>(params: &BTreeMap<String, String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialEq + From<u8>,
    T::Err: fmt::Display,
{
    Ok(parse_optional_positive(params, key)?.unwrap_or(default))
}

fn secs(params: &BTreeMap<String, String>, key: &str, default: u64) -> Result<Duration, ConfigError> {
    Ok(Duration::from_secs(parse_positive_or(params, key, default)?))
}

#[cfg(test)]
pub(crate) fn complete_params() -> BTreeMap<String, String> {
    [
        (COUCHBASE_CONNECTION_STRING, "couchbases://cb.example.cloud"),
        (COUCHBASE_USERNAME, "hotel_reader"),
        (COUCHBASE_PASSWORD, "s3cret"),
        (COUCHBASE_BUCKET, "travel-sample"),
        (COUCHBASE_SCOPE, "inventory"),
        (COUCHBASE_COLLECTION, "hotel"),
        (COUCHBASE_SEARCH_INDEX, "hotel-vector-index"),
        (OPENAI_API_KEY, "sk-test"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_config_uses_defaults() {
        let config = validate(&complete_params()).unwrap();

        assert_eq!(config.couchbase.bucket, "travel-sample");
        assert_eq!(config.couchbase.text_field, "review");
        assert_eq!(config.openai.embedding_model, "text-embedding-3-small");
        assert_eq!(config.openai.chat_model, "gpt-4-1106-preview");
        assert_eq!(config.openai.temperature, 0.0);
        assert_eq!(config.rag.default_top_k, 4);
        assert_eq!(config.rag.context_budget, 4000);
        assert_eq!(config.rag.retry.max_attempts, 3);
        assert!(!config.rag.retry_embedding);
        assert_eq!(config.server.bind_addr, "127.0.0.1:8080");
    }

    #[test]
    fn test_missing_credentials_and_index_are_reported_together() {
        let mut params = complete_params();
        params.remove(COUCHBASE_PASSWORD);
        params.remove(COUCHBASE_SEARCH_INDEX);

        let err = validate(&params).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Missing {
                missing: [COUCHBASE_PASSWORD, COUCHBASE_SEARCH_INDEX]
                    .into_iter()
                    .map(String::from)
                    .collect()
            }
        );
    }

    #[test]
    fn test_blank_values_count_as_missing() {
        let mut params = complete_params();
        params.insert(COUCHBASE_BUCKET.to_string(), "   ".to_string());

        let err = validate(&params).unwrap_err();
        assert_eq!(err.missing_keys(), vec![COUCHBASE_BUCKET]);
    }

    #[test]
    fn test_empty_config_lists_every_required_key() {
        let err = validate(&BTreeMap::new()).unwrap_err();
        assert_eq!(err.missing_keys().len(), REQUIRED_KEYS.len());
    }

    #[test]
    fn test_optional_overrides_are_parsed() {
        let mut params = complete_params();
        params.insert(RAG_CONTEXT_BUDGET.to_string(), "1200".to_string());
        params.insert(RAG_MIN_SCORE.to_string(), "0.35".to_string());
        params.insert(RAG_RETRY_EMBEDDING.to_string(), "true".to_string());
        params.insert(EMBEDDING_DIMENSION.to_string(), "1536".to_string());
        params.insert(OPENAI_BASE_URL.to_string(), "http://localhost:1234/".to_string());

        let config = validate(&params).unwrap();
        assert_eq!(config.rag.context_budget, 1200);
        assert_eq!(config.rag.min_score, Some(0.35));
        assert!(config.rag.retry_embedding);
        assert_eq!(config.openai.embedding_dimension, Some(1536));
        assert_eq!(config.openai.base_url, "http://localhost:1234");
    }

    #[test]
    fn test_unparsable_optional_value_is_invalid() {
        let mut params = complete_params();
        params.insert(RAG_DEFAULT_TOP_K.to_string(), "several".to_string());

        match validate(&params).unwrap_err() {
            ConfigError::Invalid { key, .. } => assert_eq!(key, RAG_DEFAULT_TOP_K),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_zero_top_k_is_invalid() {
        let mut params = complete_params();
        params.insert(RAG_DEFAULT_TOP_K.to_string(), "0".to_string());
        assert!(matches!(
            validate(&params),
            Err(ConfigError::Invalid { .. })
        ));
    }

    fn invalid_key(params: &BTreeMap<String, String>) -> String {
        match validate(params).unwrap_err() {
            ConfigError::Invalid { key, .. } => key,
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_base_url_without_scheme_is_invalid() {
        let mut params = complete_params();
        params.insert(OPENAI_BASE_URL.to_string(), "localhost:1234".to_string());
        assert_eq!(invalid_key(&params), OPENAI_BASE_URL);
    }

    #[test]
    fn test_unusable_connection_string_is_invalid() {
        for bad in ["mongodb://cb.example.cloud", "couchbase://", "couchbase://[::1"] {
            let mut params = complete_params();
            params.insert(COUCHBASE_CONNECTION_STRING.to_string(), bad.to_string());
            assert_eq!(invalid_key(&params), COUCHBASE_CONNECTION_STRING, "{}", bad);
        }
    }

    #[test]
    fn test_out_of_range_attempts_are_invalid() {
        let mut params = complete_params();
        params.insert(RAG_MAX_ATTEMPTS.to_string(), "4294967296".to_string());
        assert_eq!(invalid_key(&params), RAG_MAX_ATTEMPTS);

        params.insert(RAG_MAX_ATTEMPTS.to_string(), "5".to_string());
        assert_eq!(validate(&params).unwrap().rag.retry.max_attempts, 5);
    }

    #[test]
    fn test_debug_output_redacts_secrets() {
        let config = validate(&complete_params()).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("s3cret"));
        assert!(!rendered.contains("sk-test"));
        assert!(rendered.contains("****"));
    }
}
