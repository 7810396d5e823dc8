//! Configuration key names and their fallback values.

pub const COUCHBASE_CONNECTION_STRING: &str = "COUCHBASE_CONNECTION_STRING";
pub const COUCHBASE_USERNAME: &str = "COUCHBASE_USERNAME";
pub const COUCHBASE_PASSWORD: &str = "COUCHBASE_PASSWORD";
pub const COUCHBASE_BUCKET: &str = "COUCHBASE_BUCKET";
pub const COUCHBASE_SCOPE: &str = "COUCHBASE_SCOPE";
pub const COUCHBASE_COLLECTION: &str = "COUCHBASE_COLLECTION";
pub const COUCHBASE_SEARCH_INDEX: &str = "COUCHBASE_SEARCH_INDEX";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";

/// Keys without which no pipeline call may be attempted.
pub const REQUIRED_KEYS: [&str; 8] = [
    COUCHBASE_CONNECTION_STRING,
    COUCHBASE_USERNAME,
    COUCHBASE_PASSWORD,
    COUCHBASE_BUCKET,
    COUCHBASE_SCOPE,
    COUCHBASE_COLLECTION,
    COUCHBASE_SEARCH_INDEX,
    OPENAI_API_KEY,
];

pub const OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
pub const EMBEDDING_MODEL: &str = "EMBEDDING_MODEL";
pub const CHAT_MODEL: &str = "CHAT_MODEL";
pub const CHAT_TEMPERATURE: &str = "CHAT_TEMPERATURE";
pub const EMBEDDING_DIMENSION: &str = "EMBEDDING_DIMENSION";
pub const COUCHBASE_TEXT_FIELD: &str = "COUCHBASE_TEXT_FIELD";
pub const COUCHBASE_EMBEDDING_FIELD: &str = "COUCHBASE_EMBEDDING_FIELD";
pub const RAG_DEFAULT_TOP_K: &str = "RAG_DEFAULT_TOP_K";
pub const RAG_CONTEXT_BUDGET: &str = "RAG_CONTEXT_BUDGET";
pub const RAG_MIN_SCORE: &str = "RAG_MIN_SCORE";
pub const RAG_MAX_QUERY_CHARS: &str = "RAG_MAX_QUERY_CHARS";
pub const RAG_EMBED_TIMEOUT_SECS: &str = "RAG_EMBED_TIMEOUT_SECS";
pub const RAG_SEARCH_TIMEOUT_SECS: &str = "RAG_SEARCH_TIMEOUT_SECS";
pub const RAG_GENERATE_TIMEOUT_SECS: &str = "RAG_GENERATE_TIMEOUT_SECS";
pub const RAG_MAX_ATTEMPTS: &str = "RAG_MAX_ATTEMPTS";
pub const RAG_BACKOFF_MS: &str = "RAG_BACKOFF_MS";
pub const RAG_RETRY_EMBEDDING: &str = "RAG_RETRY_EMBEDDING";
pub const HOTEL_RAG_BIND: &str = "HOTEL_RAG_BIND";
pub const HOTEL_RAG_LOG_DIR: &str = "HOTEL_RAG_LOG_DIR";

pub const OPTIONAL_KEYS: [&str; 19] = [
    OPENAI_BASE_URL,
    EMBEDDING_MODEL,
    CHAT_MODEL,
    CHAT_TEMPERATURE,
    EMBEDDING_DIMENSION,
    COUCHBASE_TEXT_FIELD,
    COUCHBASE_EMBEDDING_FIELD,
    RAG_DEFAULT_TOP_K,
    RAG_CONTEXT_BUDGET,
    RAG_MIN_SCORE,
    RAG_MAX_QUERY_CHARS,
    RAG_EMBED_TIMEOUT_SECS,
    RAG_SEARCH_TIMEOUT_SECS,
    RAG_GENERATE_TIMEOUT_SECS,
    RAG_MAX_ATTEMPTS,
    RAG_BACKOFF_MS,
    RAG_RETRY_EMBEDDING,
    HOTEL_RAG_BIND,
    HOTEL_RAG_LOG_DIR,
];

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4-1106-preview";
pub const DEFAULT_CHAT_TEMPERATURE: f32 = 0.0;
pub const DEFAULT_TEXT_FIELD: &str = "review";
pub const DEFAULT_EMBEDDING_FIELD: &str = "embedding";
pub const DEFAULT_TOP_K: usize = 4;
/// Characters of record text admitted into one prompt.
pub const DEFAULT_CONTEXT_BUDGET: usize = 4000;
pub const DEFAULT_MAX_QUERY_CHARS: usize = 2000;
pub const DEFAULT_EMBED_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_SEARCH_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_GENERATE_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF_MS: u64 = 250;
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
pub const DEFAULT_LOG_DIR: &str = "logs";
