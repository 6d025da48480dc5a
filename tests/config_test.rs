//! Tests for config module

use govnews::config::Config;
use govnews::error::ErrorKind;
use serial_test::serial;
use std::io::Write;

const ENV_VARS: &[&str] = &[
    "GEMINI_API_KEY",
    "VITE_GEMINI_API_KEY",
    "API_BASE_URL",
    "VITE_API_BASE_URL",
    "DEBUG_MODE",
    "VITE_DEBUG_MODE",
    "GOVNEWS_CACHE_TTL",
    "GOVNEWS_HTTP_RETRIES",
    "GOVNEWS_CORS_PROXY",
    "GOVNEWS_WORLDBANK_URL",
];

fn clear_env() {
    for name in ENV_VARS {
        std::env::remove_var(name);
    }
}

#[test]
#[serial]
fn test_from_env_defaults() {
    clear_env();

    let config = Config::from_env().unwrap();
    assert_eq!(config.api.base_url, "https://api.example.com");
    assert!(!config.api.debug_mode);
    assert!(config.gemini.api_key.is_none());
    assert_eq!(config.http.retries, 3);
    assert_eq!(config.cache.prefix, "govnews-cache");
    assert!(config.cache.ttl_secs.is_none());
}

#[test]
#[serial]
fn test_from_env_accepts_vite_names() {
    clear_env();
    std::env::set_var("VITE_API_BASE_URL", "https://mirror.example.org");
    std::env::set_var("VITE_DEBUG_MODE", "true");
    std::env::set_var("VITE_GEMINI_API_KEY", "AIzaSyA1234567890abcdefghijklmnopqrstu");

    let config = Config::from_env().unwrap();
    assert_eq!(config.api.base_url, "https://mirror.example.org");
    assert!(config.api.debug_mode);
    assert!(config.gemini.api_key.is_some());
    assert!(config.validate().is_ok());

    clear_env();
}

#[test]
#[serial]
fn test_unprefixed_name_wins() {
    clear_env();
    std::env::set_var("API_BASE_URL", "https://primary.example.org");
    std::env::set_var("VITE_API_BASE_URL", "https://secondary.example.org");

    let config = Config::from_env().unwrap();
    assert_eq!(config.api.base_url, "https://primary.example.org");

    clear_env();
}

#[test]
#[serial]
fn test_from_env_numeric_overrides() {
    clear_env();
    std::env::set_var("GOVNEWS_CACHE_TTL", "3600");
    std::env::set_var("GOVNEWS_HTTP_RETRIES", "not-a-number");
    std::env::set_var("GOVNEWS_WORLDBANK_URL", "http://127.0.0.1:9000");

    let config = Config::from_env().unwrap();
    assert_eq!(config.cache.ttl_secs, Some(3600));
    assert_eq!(config.http.retries, 3);
    assert_eq!(config.sources.worldbank_url, "http://127.0.0.1:9000");

    clear_env();
}

#[test]
#[serial]
fn test_invalid_key_is_fatal_outside_debug() {
    clear_env();
    std::env::set_var("GEMINI_API_KEY", "invalid");

    let config = Config::from_env().unwrap();
    let err = config.validate_for_startup().unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Configuration { .. }));

    std::env::set_var("DEBUG_MODE", "true");
    let config = Config::from_env().unwrap();
    assert!(config.validate_for_startup().is_ok());

    clear_env();
}

#[test]
fn test_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[api]
base_url = "https://gov.example.net"
debug_mode = true

[http]
timeout_ms = 5000
cors_proxy = "https://proxy.example.net/?url="

[sources]
ucdp_version = "23.1"

[logging]
format = "json"
"#
    )
    .unwrap();

    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.api.base_url, "https://gov.example.net");
    assert_eq!(config.http.timeout_ms, 5000);
    assert_eq!(config.http.retries, 3);
    assert_eq!(
        config.http.cors_proxy.as_deref(),
        Some("https://proxy.example.net/?url=")
    );
    assert_eq!(config.sources.ucdp_version, "23.1");
    assert_eq!(config.logging.format, "json");
    assert!(config.validate().is_ok());
}

#[test]
fn test_from_file_errors() {
    let missing = Config::from_file(std::path::Path::new("/nonexistent/govnews.toml"));
    assert!(matches!(
        missing.unwrap_err().kind(),
        ErrorKind::Configuration { .. }
    ));

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[http\nretries = ").unwrap();
    let broken = Config::from_file(file.path()).unwrap_err();
    assert!(matches!(broken.kind(), ErrorKind::Configuration { .. }));
    assert!(broken.context().contains_key("path"));
}
