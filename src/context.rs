//! Application context
//!
//! Everything that would otherwise be process-wide state (storage area,
//! cache store, TTL cache, error manager, call log, HTTP client, country
//! mappings) is built once here and shared by `Arc`.

use std::sync::Arc;
use std::time::Duration;

use crate::async_data::TtlCache;
use crate::cache::{CacheStore, SessionStorage};
use crate::config::Config;
use crate::countries::CountryMappings;
use crate::error::{AppError, ErrorManager, Result, WebhookReporter};
use crate::http::ApiClient;
use crate::metrics;
use crate::monitor::CallLog;

/// Shared application state
pub struct AppContext {
    config: Config,
    storage: Arc<SessionStorage>,
    cache: CacheStore,
    ttl_cache: Arc<TtlCache>,
    errors: Arc<ErrorManager>,
    call_log: Arc<CallLog>,
    client: ApiClient,
    countries: CountryMappings,
}

impl AppContext {
    /// Build the context from configuration
    ///
    /// # Errors
    ///
    /// Returns `AppError::Configuration` if the HTTP client or a configured
    /// reporter cannot be created, `AppError::DataProcessing` if the country
    /// table is invalid.
    pub fn new(config: Config) -> Result<Self> {
        if let Err(e) = metrics::init_metrics() {
            tracing::warn!(error = %e, "Metrics initialization failed, continuing without metrics");
        }

        let storage = Arc::new(match config.cache.quota_bytes {
            Some(quota) => SessionStorage::with_quota(quota),
            None => SessionStorage::new(),
        });
        let cache = CacheStore::new(storage.clone(), config.cache.clone());

        let errors = Arc::new(
            ErrorManager::new(config.api.debug_mode)
                .with_base_url(config.api.base_url.clone())
                .with_user_agent(config.api.user_agent.clone()),
        );
        if let Some(url) = &config.api.error_webhook {
            let reporter = WebhookReporter::new(url.clone(), Duration::from_secs(10)).map_err(|e| {
                AppError::configuration(Some("GOVNEWS_ERROR_WEBHOOK"), e.to_string())
            })?;
            errors.add_reporter(Arc::new(reporter));
        }

        let call_log = Arc::new(CallLog::default());
        let client = ApiClient::new(&config, errors.clone(), call_log.clone())?;
        let countries = CountryMappings::build()?;

        tracing::debug!(
            debug_mode = config.api.debug_mode,
            reporters = errors.reporter_count(),
            countries = countries.len(),
            "Application context ready"
        );

        Ok(Self {
            config,
            storage,
            cache,
            ttl_cache: Arc::new(TtlCache::new()),
            errors,
            call_log,
            client,
            countries,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn storage(&self) -> &Arc<SessionStorage> {
        &self.storage
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn ttl_cache(&self) -> Arc<TtlCache> {
        Arc::clone(&self.ttl_cache)
    }

    pub fn errors(&self) -> &Arc<ErrorManager> {
        &self.errors
    }

    pub fn call_log(&self) -> &Arc<CallLog> {
        &self.call_log
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn countries(&self) -> &CountryMappings {
        &self.countries
    }
}
