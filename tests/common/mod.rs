//! Common test utilities

use std::sync::Arc;

use govnews::config::Config;
use govnews::context::AppContext;
use govnews::error::MemoryReporter;

/// Configuration with every source pointed at a mock server and short delays
pub fn test_config(base: &str) -> Config {
    let mut config = Config::default();
    config.http.timeout_ms = 2_000;
    config.http.retries = 2;
    config.http.retry_delay_ms = 10;
    config.http.max_delay_ms = 50;
    config.http.rate_limit = 1_000;

    config.sources.worldbank_url = base.to_string();
    config.sources.gdelt_url = base.to_string();
    config.sources.ucdp_url = base.to_string();
    config.sources.noaa_url = base.to_string();
    config.sources.factbook_url = format!("{base}/the-world-factbook/countries");
    config.sources.reliefweb_url = base.to_string();
    config.sources.overpass_url = base.to_string();
    config.gemini.base_url = format!("{base}/v1beta");
    config
}

/// Context against a mock server, with a memory reporter attached
pub fn test_context(base: &str) -> (AppContext, Arc<MemoryReporter>) {
    context_from(test_config(base))
}

#[allow(dead_code)]
pub fn context_from(config: Config) -> (AppContext, Arc<MemoryReporter>) {
    let ctx = AppContext::new(config).expect("test context");
    let reporter = Arc::new(MemoryReporter::new());
    ctx.errors().add_reporter(reporter.clone());
    (ctx, reporter)
}

/// A Gemini-shaped API key that passes validation
#[allow(dead_code)]
pub fn fake_gemini_key() -> String {
    format!("AIza{}", "x".repeat(35))
}
