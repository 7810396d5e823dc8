use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::Value;

use super::defaults::{OPTIONAL_KEYS, REQUIRED_KEYS};
use super::validation::{validate, AppConfig};
use crate::core::errors::ConfigError;

const CONFIG_PATH_ENV: &str = "HOTEL_RAG_CONFIG_PATH";
const DEFAULT_CONFIG_FILE: &str = "config.yml";

/// Collects startup parameters from `.env`, an optional YAML file and the
/// process environment, in increasing order of precedence.
#[derive(Debug, Clone)]
pub struct ConfigService {
    config_path: PathBuf,
}

impl ConfigService {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    /// Load `.env` into the environment and pick the YAML path.
    ///
    /// A missing `.env` is fine; an unreadable or malformed one is an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        check_dotenv(dotenvy::dotenv())?;
        let path = env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Ok(Self::new(path))
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Raw parameters, file values overridden by environment variables.
    pub fn load_params(&self) -> Result<BTreeMap<String, String>, ConfigError> {
        collect_params(Some(&self.config_path), env::vars())
    }

    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let params = self.load_params()?;
        validate(&params)
    }
}

fn check_dotenv<T>(result: Result<T, dotenvy::Error>) -> Result<(), ConfigError> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(ConfigError::invalid(".env", e.to_string())),
    }
}

/// Merge known keys from a flat YAML file and an environment snapshot.
pub fn collect_params<I>(file: Option<&Path>, env_vars: I) -> Result<BTreeMap<String, String>, ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut params = match file {
        Some(path) => load_yaml_file(path)?,
        None => BTreeMap::new(),
    };

    for (key, value) in env_vars {
        if is_known_key(&key) {
            params.insert(key, value);
        }
    }

    Ok(params)
}

fn is_known_key(key: &str) -> bool {
    REQUIRED_KEYS.contains(&key) || OPTIONAL_KEYS.contains(&key)
}

fn load_yaml_file(path: &Path) -> Result<BTreeMap<String, String>, ConfigError> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }

    let source = path.display().to_string();
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::invalid(&source, e.to_string()))?;
    let value: Value =
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::invalid(&source, e.to_string()))?;

    let mapping = match value {
        Value::Mapping(mapping) => mapping,
        Value::Null => return Ok(BTreeMap::new()),
        _ => return Err(ConfigError::invalid(&source, "expected a mapping of KEY: value")),
    };

    let mut params = BTreeMap::new();
    for (key, value) in mapping {
        let Some(key) = key.as_str().map(str::to_string) else {
            continue;
        };
        if !is_known_key(&key) {
            tracing::warn!("Ignoring unknown configuration key '{}' in {}", key, source);
            continue;
        }
        let text = match value {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => continue,
            _ => return Err(ConfigError::invalid(&key, "expected a scalar value")),
        };
        params.insert(key, text);
    }

    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env_pairs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_environment_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "COUCHBASE_BUCKET: from-file").unwrap();
        writeln!(file, "COUCHBASE_SCOPE: inventory").unwrap();
        writeln!(file, "RAG_CONTEXT_BUDGET: 2500").unwrap();

        let params = collect_params(
            Some(file.path()),
            env_pairs(&[("COUCHBASE_BUCKET", "from-env"), ("PATH", "/usr/bin")]),
        )
        .unwrap();

        assert_eq!(params["COUCHBASE_BUCKET"], "from-env");
        assert_eq!(params["COUCHBASE_SCOPE"], "inventory");
        assert_eq!(params["RAG_CONTEXT_BUDGET"], "2500");
        assert!(!params.contains_key("PATH"));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let params = collect_params(Some(&dir.path().join("absent.yml")), Vec::new()).unwrap();
        assert!(params.is_empty());
    }

    #[test]
    fn test_non_mapping_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "- just").unwrap();
        writeln!(file, "- a list").unwrap();

        let err = collect_params(Some(file.path()), Vec::new()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_malformed_dotenv_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "this line has no equals sign").unwrap();

        let err = check_dotenv(dotenvy::from_path(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == ".env"));
    }

    #[test]
    fn test_absent_dotenv_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_dotenv(dotenvy::from_path(dir.path().join(".env"))).is_ok());
    }

    #[test]
    fn test_load_reports_missing_keys_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "COUCHBASE_CONNECTION_STRING: couchbase://localhost").unwrap();

        let params = collect_params(Some(file.path()), Vec::new()).unwrap();
        let err = validate(&params).unwrap_err();
        let missing = err.missing_keys();
        assert_eq!(missing.len(), REQUIRED_KEYS.len() - 1);
        assert!(!missing.contains(&"COUCHBASE_CONNECTION_STRING"));
    }
}
