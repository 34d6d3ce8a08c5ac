use stacksearch_api::{ClientOptions, RetryConfig, STACKEXCHANGE_API_BASE};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

use crate::{Error, Result};

/// Workflow configuration
///
/// Alfred hands every setting to the script as an environment variable,
/// and passes unset ones as empty strings, so empty means "use the default".
#[derive(Debug, Clone)]
pub struct Config {
    /// Seconds a cached search stays usable
    pub cache_max_age: u64,
    pub ignore_meta_sites: bool,
    /// Questions requested per search
    pub result_count: u32,
    pub site_id: String,
    pub site_name: String,
    pub api_key: Option<String>,
    pub client_id: Option<String>,
    pub proxy: Option<String>,
    pub cache_dir: PathBuf,
    pub api_url: String,
}

fn default_cache_max_age() -> u64 {
    3600
}

fn default_result_count() -> u32 {
    20
}

fn default_site_id() -> String {
    "stackoverflow".to_string()
}

fn default_site_name() -> String {
    "Stack Overflow".to_string()
}

impl Config {
    /// Load from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key lookup; the environment in production, a map in tests
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let cache_max_age = match get("cache_max_age") {
            Some(v) => parse_number(&v, "cache_max_age")?,
            None => default_cache_max_age(),
        };

        let result_count: u32 = match get("result_count") {
            Some(v) => parse_number(&v, "result_count")?,
            None => default_result_count(),
        };
        if !(1..=100).contains(&result_count) {
            return Err(Error::ConfigError(format!(
                "result_count must be between 1 and 100, got {}",
                result_count
            )));
        }

        let ignore_meta_sites = match get("ignore_meta_sites") {
            Some(v) => parse_flag(&v, "ignore_meta_sites")?,
            None => true,
        };

        let cache_dir = match get("alfred_workflow_cache") {
            Some(dir) => expand_home(&dir),
            None => dirs::cache_dir()
                .ok_or_else(|| Error::ConfigError("Could not find cache directory".into()))?
                .join("stacksearch"),
        };

        let config = Self {
            cache_max_age,
            ignore_meta_sites,
            result_count,
            site_id: get("site_id").unwrap_or_else(default_site_id),
            site_name: get("site_name").unwrap_or_else(default_site_name),
            api_key: get("api_key"),
            client_id: get("client_id"),
            proxy: get("proxy"),
            cache_dir,
            api_url: get("stacksearch_api_url").unwrap_or_else(|| STACKEXCHANGE_API_BASE.to_string()),
        };

        debug!(
            "Loaded config: site_id={:?}, result_count={}, cache_max_age={}s, cache_dir={}",
            config.site_id,
            config.result_count,
            config.cache_max_age,
            config.cache_dir.display()
        );

        Ok(config)
    }

    pub fn cache_max_age(&self) -> Duration {
        Duration::from_secs(self.cache_max_age)
    }

    /// API client settings; `retry` depends on the step
    pub fn client_options(&self, retry: RetryConfig) -> ClientOptions {
        ClientOptions {
            base_url: self.api_url.clone(),
            api_key: self.api_key.clone(),
            client_id: self.client_id.clone(),
            proxy: self.proxy.clone(),
            retry,
        }
    }
}

/// Whether `alfred_debug` asks for verbose logs; read before the rest of the
/// config so that config errors get logged too. An unreadable value means no.
pub fn debug_requested<F>(lookup: F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup("alfred_debug")
        .and_then(|v| parse_flag(&v, "alfred_debug").ok())
        .unwrap_or(false)
}

fn parse_number<T: std::str::FromStr>(value: &str, key: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::ConfigError(format!("{} must be a non-negative integer, got {:?}", key, value)))
}

fn parse_flag(value: &str, key: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(Error::ConfigError(format!("{} must be 0 or 1, got {:?}", key, value))),
    }
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[("alfred_workflow_cache", "/tmp/sx")])).unwrap();

        assert_eq!(config.cache_max_age, 3600);
        assert_eq!(config.result_count, 20);
        assert!(config.ignore_meta_sites);
        assert_eq!(config.site_id, "stackoverflow");
        assert_eq!(config.api_url, STACKEXCHANGE_API_BASE);
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/sx"));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_empty_strings_mean_unset() {
        let config = Config::from_lookup(lookup(&[
            ("alfred_workflow_cache", "/tmp/sx"),
            ("api_key", ""),
            ("client_id", "  "),
            ("proxy", ""),
            ("cache_max_age", ""),
        ]))
        .unwrap();

        assert!(config.api_key.is_none());
        assert!(config.client_id.is_none());
        assert!(config.proxy.is_none());
        assert_eq!(config.cache_max_age, 3600);
    }

    #[test]
    fn test_reads_workflow_variables() {
        let config = Config::from_lookup(lookup(&[
            ("alfred_workflow_cache", "/tmp/sx"),
            ("cache_max_age", "60"),
            ("ignore_meta_sites", "0"),
            ("result_count", "50"),
            ("site_id", "superuser"),
            ("site_name", "Super User"),
            ("api_key", "abc"),
            ("proxy", "http://127.0.0.1:8080"),
            ("alfred_debug", "1"),
        ]))
        .unwrap();

        assert_eq!(config.cache_max_age(), Duration::from_secs(60));
        assert!(!config.ignore_meta_sites);
        assert_eq!(config.result_count, 50);
        assert_eq!(config.site_id, "superuser");
        assert_eq!(config.site_name, "Super User");
        assert_eq!(config.api_key.as_deref(), Some("abc"));

        let options = config.client_options(RetryConfig::none());
        assert_eq!(options.proxy.as_deref(), Some("http://127.0.0.1:8080"));
        assert_eq!(options.retry.max_retries, 0);
    }

    #[test]
    fn test_rejects_bad_numbers() {
        let err = Config::from_lookup(lookup(&[
            ("alfred_workflow_cache", "/tmp/sx"),
            ("cache_max_age", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));

        let err = Config::from_lookup(lookup(&[
            ("alfred_workflow_cache", "/tmp/sx"),
            ("result_count", "500"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn test_rejects_bad_flags() {
        let err = Config::from_lookup(lookup(&[
            ("alfred_workflow_cache", "/tmp/sx"),
            ("ignore_meta_sites", "maybe"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn test_debug_requested() {
        assert!(debug_requested(lookup(&[("alfred_debug", "1")])));
        assert!(!debug_requested(lookup(&[("alfred_debug", "0")])));
        assert!(!debug_requested(lookup(&[])));
        assert!(debug_requested(lookup(&[("alfred_debug", " yes ")])));
        assert!(debug_requested(lookup(&[("alfred_debug", "TRUE")])));
    }

    #[test]
    fn test_malformed_debug_flag_is_ignored() {
        let vars = [("alfred_workflow_cache", "/tmp/sx"), ("alfred_debug", "verbose")];

        assert!(!debug_requested(lookup(&vars)));
        assert!(Config::from_lookup(lookup(&vars)).is_ok());
    }
}
