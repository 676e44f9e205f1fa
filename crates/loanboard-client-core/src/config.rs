use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_STATE_PATH: &str = ".loanboard/state.json";
pub const DEFAULT_NOTIFICATION_TTL_MS: u64 = 3_000;
pub const DEFAULT_LOG_FILTER: &str = "info";

pub const ENV_API_BASE_URL: &str = "LOANBOARD_API_BASE_URL";
pub const ENV_STATE_PATH: &str = "LOANBOARD_STATE_PATH";
pub const ENV_NOTIFICATION_TTL_MS: &str = "LOANBOARD_NOTIFICATION_TTL_MS";
pub const ENV_LOG_FILTER: &str = "LOANBOARD_LOG_FILTER";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("base url must not be empty")]
    EmptyBaseUrl,
    #[error("base url must use http:// or https:// and include a host")]
    InvalidBaseUrl,
    #[error("invalid {key} value '{value}': expected a positive integer")]
    InvalidNumber { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub state_path: PathBuf,
    pub notification_ttl: Duration,
    pub log_filter: String,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
            notification_ttl: Duration::from_millis(DEFAULT_NOTIFICATION_TTL_MS),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url =
            env_non_empty(ENV_API_BASE_URL).unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let mut config = Self::new(&base_url)?;

        if let Some(path) = env_non_empty(ENV_STATE_PATH) {
            config.state_path = PathBuf::from(path);
        }
        if let Some(raw) = env_non_empty(ENV_NOTIFICATION_TTL_MS) {
            config.notification_ttl =
                Duration::from_millis(parse_positive(ENV_NOTIFICATION_TTL_MS, &raw)?);
        }
        if let Some(filter) = env_non_empty(ENV_LOG_FILTER) {
            config.log_filter = filter;
        }
        Ok(config)
    }

    #[must_use]
    pub fn with_state_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_path = path.into();
        self
    }

    #[must_use]
    pub fn with_notification_ttl(mut self, ttl: Duration) -> Self {
        self.notification_ttl = ttl;
        self
    }
}

pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyBaseUrl);
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidBaseUrl);
    }
    let Some((_, remainder)) = trimmed.split_once("://") else {
        return Err(ConfigError::InvalidBaseUrl);
    };
    if remainder.trim().is_empty() || remainder.starts_with('/') {
        return Err(ConfigError::InvalidBaseUrl);
    }
    Ok(trimmed.to_string())
}

fn parse_positive(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::InvalidNumber {
            key,
            value: raw.to_string(),
        }),
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    const KEYS: [&str; 4] = [
        ENV_API_BASE_URL,
        ENV_STATE_PATH,
        ENV_NOTIFICATION_TTL_MS,
        ENV_LOG_FILTER,
    ];

    fn with_env<T>(values: &[(&str, &str)], test: impl FnOnce() -> T) -> T {
        let lock = ENV_LOCK.get_or_init(|| Mutex::new(()));
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let previous: Vec<(&str, Option<String>)> = KEYS
            .iter()
            .map(|key| (*key, std::env::var(key).ok()))
            .collect();
        for key in KEYS {
            unsafe { std::env::remove_var(key) };
        }
        for (key, value) in values {
            unsafe { std::env::set_var(key, value) };
        }

        let result = test();

        for (key, value) in previous {
            match value {
                Some(value) => unsafe { std::env::set_var(key, value) },
                None => unsafe { std::env::remove_var(key) },
            }
        }
        result
    }

    #[test]
    fn normalize_base_url_trims_and_drops_trailing_slash() {
        let normalized = normalize_base_url(" https://loans.example.com/ ").expect("valid url");
        assert_eq!(normalized, "https://loans.example.com");
    }

    #[test]
    fn normalize_base_url_requires_http_scheme_and_host() {
        assert_eq!(
            normalize_base_url("loans.example.com"),
            Err(ConfigError::InvalidBaseUrl)
        );
        assert_eq!(normalize_base_url("https:///api"), Err(ConfigError::InvalidBaseUrl));
        assert_eq!(normalize_base_url("   "), Err(ConfigError::EmptyBaseUrl));
    }

    #[test]
    fn from_env_uses_defaults() {
        with_env(&[], || {
            let config = ClientConfig::from_env().expect("default config");
            assert_eq!(config.base_url, DEFAULT_API_BASE_URL);
            assert_eq!(config.state_path, PathBuf::from(DEFAULT_STATE_PATH));
            assert_eq!(config.notification_ttl, Duration::from_secs(3));
            assert_eq!(config.log_filter, "info");
        });
    }

    #[test]
    fn from_env_reads_overrides() {
        with_env(
            &[
                (ENV_API_BASE_URL, "https://api.loans.example.com/"),
                (ENV_STATE_PATH, "/tmp/loanboard.json"),
                (ENV_NOTIFICATION_TTL_MS, "1500"),
                (ENV_LOG_FILTER, "loanboard_client_core=debug"),
            ],
            || {
                let config = ClientConfig::from_env().expect("env config");
                assert_eq!(config.base_url, "https://api.loans.example.com");
                assert_eq!(config.state_path, PathBuf::from("/tmp/loanboard.json"));
                assert_eq!(config.notification_ttl, Duration::from_millis(1500));
                assert_eq!(config.log_filter, "loanboard_client_core=debug");
            },
        );
    }

    #[test]
    fn from_env_rejects_zero_ttl() {
        with_env(&[(ENV_NOTIFICATION_TTL_MS, "0")], || {
            let error = ClientConfig::from_env().expect_err("zero ttl rejected");
            assert_eq!(
                error,
                ConfigError::InvalidNumber {
                    key: ENV_NOTIFICATION_TTL_MS,
                    value: "0".to_string(),
                }
            );
        });
    }
}
