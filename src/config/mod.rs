//! Configuration management for govnews
//!
//! This module handles loading and validating configuration from environment
//! variables and TOML files. Every environment variable that the browser build
//! read with a `VITE_` prefix is also accepted under that name.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::cache::CacheConfig;
use crate::error::{AppError, Result};
use crate::utils::retry::RetryConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application-level settings
    pub api: ApiConfig,

    /// Session cache configuration
    pub cache: CacheConfig,

    /// Interceptor configuration
    pub http: HttpConfig,

    /// Per-source endpoints and credentials
    pub sources: SourcesConfig,

    /// Generative-AI configuration
    pub gemini: GeminiConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Application-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL reported as the ambient `url` of error contexts
    pub base_url: String,

    /// Debug mode registers the console error reporter
    pub debug_mode: bool,

    /// User agent string
    pub user_agent: String,

    /// Optional collector receiving error reports as JSON
    pub error_webhook: Option<String>,
}

/// Interceptor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-attempt timeout in milliseconds
    pub timeout_ms: u64,

    /// Retries after the first attempt
    pub retries: u32,

    /// Base backoff delay in milliseconds
    pub retry_delay_ms: u64,

    /// Backoff cap in milliseconds
    pub max_delay_ms: u64,

    /// Client-side rate limit (requests per second)
    pub rate_limit: u32,

    /// CORS proxy prefix; the target URL is appended percent-encoded
    pub cors_proxy: Option<String>,
}

/// Per-source endpoints and credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub worldbank_url: String,
    pub gdelt_url: String,
    pub ucdp_url: String,
    pub ucdp_version: String,
    pub ucdp_token: Option<String>,
    pub noaa_url: String,
    pub noaa_token: Option<String>,
    pub factbook_url: String,
    pub reliefweb_url: String,
    pub overpass_url: String,
}

/// Generative-AI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// API key; must start with `AIza` and be 35 to 50 characters
    pub api_key: Option<String>,

    /// REST endpoint root
    pub base_url: String,

    /// Model name
    pub model: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("https://api.example.com"),
            debug_mode: false,
            user_agent: format!("govnews/{}", env!("CARGO_PKG_VERSION")),
            error_webhook: None,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            retries: 3,
            retry_delay_ms: 1_000,
            max_delay_ms: 10_000,
            rate_limit: 10,
            cors_proxy: None,
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            worldbank_url: String::from("https://api.worldbank.org"),
            gdelt_url: String::from("https://api.gdeltproject.org"),
            ucdp_url: String::from("https://ucdpapi.pcr.uu.se"),
            ucdp_version: String::from("24.1"),
            ucdp_token: None,
            noaa_url: String::from("https://www.ncei.noaa.gov"),
            noaa_token: None,
            factbook_url: String::from("https://www.cia.gov/the-world-factbook/countries"),
            reliefweb_url: String::from("https://reliefweb.int"),
            overpass_url: String::from("https://overpass-api.de"),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: String::from("https://generativelanguage.googleapis.com/v1beta"),
            model: String::from("gemini-2.0-flash"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

/// First set, non-empty variable among `names`
fn env_any(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env_any(&[name]).and_then(|v| v.parse::<T>().ok())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let api = ApiConfig {
            base_url: env_any(&["API_BASE_URL", "VITE_API_BASE_URL"])
                .unwrap_or(defaults.api.base_url),
            debug_mode: env_any(&["DEBUG_MODE", "VITE_DEBUG_MODE"])
                .map(|v| v == "true")
                .unwrap_or(false),
            user_agent: env_any(&["GOVNEWS_USER_AGENT"]).unwrap_or(defaults.api.user_agent),
            error_webhook: env_any(&["GOVNEWS_ERROR_WEBHOOK"]),
        };

        let cache = CacheConfig {
            prefix: env_any(&["GOVNEWS_CACHE_PREFIX"]).unwrap_or(defaults.cache.prefix),
            ttl_secs: env_parse("GOVNEWS_CACHE_TTL"),
            quota_bytes: env_parse("GOVNEWS_CACHE_QUOTA"),
        };

        let http = HttpConfig {
            timeout_ms: env_parse("GOVNEWS_HTTP_TIMEOUT_MS").unwrap_or(defaults.http.timeout_ms),
            retries: env_parse("GOVNEWS_HTTP_RETRIES").unwrap_or(defaults.http.retries),
            retry_delay_ms: env_parse("GOVNEWS_HTTP_RETRY_DELAY_MS")
                .unwrap_or(defaults.http.retry_delay_ms),
            max_delay_ms: env_parse("GOVNEWS_HTTP_MAX_DELAY_MS")
                .unwrap_or(defaults.http.max_delay_ms),
            rate_limit: env_parse("GOVNEWS_RATE_LIMIT").unwrap_or(defaults.http.rate_limit),
            cors_proxy: env_any(&["GOVNEWS_CORS_PROXY"]),
        };

        let d = defaults.sources;
        let sources = SourcesConfig {
            worldbank_url: env_any(&["GOVNEWS_WORLDBANK_URL"]).unwrap_or(d.worldbank_url),
            gdelt_url: env_any(&["GOVNEWS_GDELT_URL"]).unwrap_or(d.gdelt_url),
            ucdp_url: env_any(&["GOVNEWS_UCDP_URL"]).unwrap_or(d.ucdp_url),
            ucdp_version: env_any(&["GOVNEWS_UCDP_VERSION"]).unwrap_or(d.ucdp_version),
            ucdp_token: env_any(&["GOVNEWS_UCDP_TOKEN"]),
            noaa_url: env_any(&["GOVNEWS_NOAA_URL"]).unwrap_or(d.noaa_url),
            noaa_token: env_any(&["GOVNEWS_NOAA_TOKEN", "NOAA_TOKEN"]),
            factbook_url: env_any(&["GOVNEWS_FACTBOOK_URL"]).unwrap_or(d.factbook_url),
            reliefweb_url: env_any(&["GOVNEWS_RELIEFWEB_URL"]).unwrap_or(d.reliefweb_url),
            overpass_url: env_any(&["GOVNEWS_OVERPASS_URL"]).unwrap_or(d.overpass_url),
        };

        let gemini = GeminiConfig {
            api_key: env_any(&["GEMINI_API_KEY", "VITE_GEMINI_API_KEY"]),
            base_url: env_any(&["GOVNEWS_GEMINI_URL"]).unwrap_or(defaults.gemini.base_url),
            model: env_any(&["GOVNEWS_GEMINI_MODEL"]).unwrap_or(defaults.gemini.model),
        };

        let logging = LoggingConfig {
            level: env_any(&["GOVNEWS_LOG_LEVEL"]).unwrap_or(defaults.logging.level),
            format: env_any(&["GOVNEWS_LOG_FORMAT"]).unwrap_or(defaults.logging.format),
        };

        Ok(Self {
            api,
            cache,
            http,
            sources,
            gemini,
            logging,
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::configuration(
                None,
                format!("Failed to read config file {}: {e}", path.display()),
            )
            .with_source(e)
        })?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| AppError::from(e).with_context("path", path.display().to_string()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if let Some(key) = &self.gemini.api_key {
            let len = key.chars().count();
            if !key.starts_with("AIza") || !(35..=50).contains(&len) {
                return Err(AppError::configuration(
                    Some("GEMINI_API_KEY"),
                    "API key must start with 'AIza' and be 35-50 characters long",
                ));
            }
        }

        require_http_url("API_BASE_URL", &self.api.base_url)?;
        if let Some(proxy) = &self.http.cors_proxy {
            require_http_url("GOVNEWS_CORS_PROXY", proxy)?;
        }
        if let Some(webhook) = &self.api.error_webhook {
            require_http_url("GOVNEWS_ERROR_WEBHOOK", webhook)?;
        }

        if self.http.timeout_ms == 0 {
            return Err(AppError::configuration(
                Some("GOVNEWS_HTTP_TIMEOUT_MS"),
                "timeout must be greater than 0",
            ));
        }

        if self.http.rate_limit == 0 {
            return Err(AppError::configuration(
                Some("GOVNEWS_RATE_LIMIT"),
                "rate_limit must be positive",
            ));
        }

        if self.http.max_delay_ms < self.http.retry_delay_ms {
            return Err(AppError::configuration(
                Some("GOVNEWS_HTTP_MAX_DELAY_MS"),
                "max delay must not be smaller than the base retry delay",
            ));
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            return Err(AppError::configuration(
                Some("GOVNEWS_LOG_FORMAT"),
                format!("unknown log format '{}'", self.logging.format),
            ));
        }

        Ok(())
    }

    /// Validate at startup: fatal outside debug mode, logged in debug mode
    pub fn validate_for_startup(&self) -> Result<()> {
        match self.validate() {
            Ok(()) => Ok(()),
            Err(e) if self.api.debug_mode => {
                tracing::warn!(error = %e, "Configuration invalid, continuing in debug mode");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.http.timeout_ms)
    }

    /// Backoff settings of the interceptor
    #[must_use]
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::with_delays(
            self.http.retries,
            self.http.retry_delay_ms,
            self.http.max_delay_ms,
        )
    }
}

fn require_http_url(key: &str, value: &str) -> Result<()> {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => Err(AppError::configuration(
            Some(key),
            format!("'{value}' is not an http(s) URL"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_gemini_key_shape() {
        let mut config = Config::default();
        config.gemini.api_key = Some(format!("AIza{}", "x".repeat(35)));
        assert!(config.validate().is_ok());

        config.gemini.api_key = Some("sk-not-a-gemini-key-at-all-000000000000".into());
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::Configuration { key: Some(k), .. } if k == "GEMINI_API_KEY"
        ));

        config.gemini.api_key = Some("AIzaShort".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_base_url() {
        let mut config = Config::default();
        config.api.base_url = "ftp://example.com".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_mode_tolerates_invalid_config() {
        let mut config = Config::default();
        config.http.rate_limit = 0;
        assert!(config.validate_for_startup().is_err());

        config.api.debug_mode = true;
        assert!(config.validate_for_startup().is_ok());
    }

    #[test]
    fn test_request_timeout_conversion() {
        let config = Config::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.retry_config().max_retries, 3);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [http]
            retries = 5

            [cache]
            prefix = "test-cache"
            ttl_secs = 600
            "#,
        )
        .unwrap();

        assert_eq!(config.http.retries, 5);
        assert_eq!(config.http.timeout_ms, 30_000);
        assert_eq!(config.cache.ttl_secs, Some(600));
        assert_eq!(config.sources.ucdp_version, "24.1");
    }
}
