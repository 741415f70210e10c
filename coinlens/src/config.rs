//! Configuration management for the client core

use std::time::Duration;

use reqwest::Url;

use crate::error::{LensError, Result};

/// Client configuration
///
/// Built once at startup and shared read-only by every view.
#[derive(Debug, Clone)]
pub struct Config {
    /// Environment (production, staging, development)
    pub environment: String,

    /// Log level
    pub log_level: String,

    /// API root, always ending in `/api/`
    pub api_base_url: String,

    /// Forward cookies on every request (the session lives in a cookie)
    pub with_credentials: bool,

    /// How long an Authenticated verdict may be reused. Zero re-checks on
    /// every protected navigation.
    pub session_cache_ttl: Duration,

    /// Where a successful login lands when no return path was recorded
    pub default_landing: String,

    /// Where logout lands
    pub public_landing: String,

    /// Login view path used by the session gate redirect
    pub login_path: String,

    /// Dashboard rows per page
    pub page_size: usize,

    /// Refresh interval of the single-coin analysis view
    pub analysis_poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        let config = Self::from_lookup(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from any key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            environment: lookup("COINLENS_ENVIRONMENT").unwrap_or_else(|| "production".to_string()),

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),

            api_base_url: api_root(
                &lookup("COINLENS_API_URL").unwrap_or_else(|| "http://localhost:8000".to_string()),
            ),

            with_credentials: lookup("COINLENS_WITH_CREDENTIALS")
                .map(|v| v.to_lowercase() != "false")
                .unwrap_or(true),

            session_cache_ttl: Duration::from_secs(
                lookup("COINLENS_SESSION_CACHE_TTL_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0),
            ),

            default_landing: lookup("COINLENS_DEFAULT_LANDING").unwrap_or_else(|| "/dashboard".to_string()),

            public_landing: lookup("COINLENS_PUBLIC_LANDING").unwrap_or_else(|| "/".to_string()),

            login_path: lookup("COINLENS_LOGIN_PATH").unwrap_or_else(|| "/login".to_string()),

            page_size: lookup("COINLENS_PAGE_SIZE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),

            analysis_poll_interval: Duration::from_secs(
                lookup("COINLENS_ANALYSIS_POLL_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.api_base_url)
            .map_err(|e| LensError::Config(format!("api_base_url is not a valid URL: {e}")))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(LensError::Config("api_base_url must be http or https".into()));
        }
        if self.page_size == 0 {
            return Err(LensError::Config("page_size must be positive".into()));
        }
        if self.analysis_poll_interval.is_zero() {
            return Err(LensError::Config("analysis_poll_interval must be positive".into()));
        }
        for (name, path) in [
            ("default_landing", &self.default_landing),
            ("public_landing", &self.public_landing),
            ("login_path", &self.login_path),
        ] {
            if !path.starts_with('/') {
                return Err(LensError::Config(format!("{name} must start with '/'")));
            }
        }
        Ok(())
    }

    /// Whether a cached Authenticated verdict can ever be reused
    pub fn caches_session(&self) -> bool {
        !self.session_cache_ttl.is_zero()
    }
}

/// Normalise a server origin into the `/api/` root the endpoints hang off.
fn api_root(origin: &str) -> String {
    let trimmed = origin.trim_end_matches('/');
    if trimmed.ends_with("/api") {
        format!("{trimmed}/")
    } else {
        format!("{trimmed}/api/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.api_base_url, "http://localhost:8000/api/");
        assert!(config.with_credentials);
        assert!(config.session_cache_ttl.is_zero());
        assert!(!config.caches_session());
        assert_eq!(config.default_landing, "/dashboard");
        assert_eq!(config.login_path, "/login");
        assert_eq!(config.page_size, 10);
        assert_eq!(config.analysis_poll_interval, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("COINLENS_API_URL", "https://markets.example.com/"),
            ("COINLENS_SESSION_CACHE_TTL_SECS", "60"),
            ("COINLENS_WITH_CREDENTIALS", "FALSE"),
            ("COINLENS_PAGE_SIZE", "not-a-number"),
        ]));
        assert_eq!(config.api_base_url, "https://markets.example.com/api/");
        assert_eq!(config.session_cache_ttl, Duration::from_secs(60));
        assert!(!config.with_credentials);
        // Unparseable values fall back to the default
        assert_eq!(config.page_size, 10);
    }

    #[test]
    fn test_api_root_is_not_doubled() {
        assert_eq!(api_root("http://host/api"), "http://host/api/");
        assert_eq!(api_root("http://host/api/"), "http://host/api/");
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.login_path = "login".to_string();
        assert!(matches!(config.validate(), Err(LensError::Config(_))));

        let mut config = Config::default();
        config.page_size = 0;
        assert!(config.validate().is_err());

        let config = Config::from_lookup(lookup_from(&[("COINLENS_API_URL", "ftp://files")]));
        assert!(config.validate().is_err());
    }
}
