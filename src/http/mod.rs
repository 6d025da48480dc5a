//! API fetch interceptor
//!
//! Every outbound request of the crate goes through [`ApiClient`]. It adds:
//! - Per-attempt timeouts (an elapsed attempt becomes a timeout error)
//! - Exponential backoff retry on `{408, 429, 500, 502, 503, 504}` and on
//!   transport failures
//! - Client-side rate limiting with governor
//! - Optional CORS proxy routing
//! - Classification into [`AppError`] and reporting through the
//!   [`ErrorManager`] once an error is final
//! - Call log and metrics recording for every attempt

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, ACCEPT},
    Client, Method, StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::error::{AppError, ErrorFactory, ErrorKind, ErrorManager, PartialContext, Result};
use crate::metrics;
use crate::monitor::{ApiCallLog, CallLog};
use crate::utils::retry::RetryConfig;
use crate::utils::{extract_host, percent_encode, truncate_text};

/// Statuses that trigger another attempt while attempts remain
pub const RETRYABLE_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Determine if a status code should trigger a retry
pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_STATUSES.contains(&status)
}

/// Request body variants
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// Serialized as JSON with `Content-Type: application/json`
    Json(serde_json::Value),
    /// `application/x-www-form-urlencoded`
    Form(Vec<(String, String)>),
    Text(String),
}

/// Per-request options
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<RequestBody>,
    /// Time budget of a single attempt
    pub timeout: Duration,
    /// Retries after the first attempt
    pub retries: u32,
    /// Base backoff delay
    pub retry_delay: Duration,
    /// Do not hand the final error to the error manager
    pub skip_error_reporting: bool,
    /// Service label for logs and metrics; defaults to the URL host
    pub service: Option<String>,
    /// Bypass the CORS proxy
    pub direct: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
            timeout: Duration::from_millis(30_000),
            retries: 3,
            retry_delay: Duration::from_millis(1_000),
            skip_error_reporting: false,
            service: None,
            direct: false,
        }
    }
}

impl FetchOptions {
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    #[must_use]
    pub fn form(mut self, pairs: Vec<(String, String)>) -> Self {
        self.body = Some(RequestBody::Form(pairs));
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    #[must_use]
    pub fn retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    #[must_use]
    pub fn skip_error_reporting(mut self) -> Self {
        self.skip_error_reporting = true;
        self
    }

    #[must_use]
    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    #[must_use]
    pub fn direct(mut self) -> Self {
        self.direct = true;
        self
    }
}

/// A successful response
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub data: T,
    pub status: u16,
    pub headers: HeaderMap,
    /// URL as requested by the caller, before proxy rewriting
    pub url: String,
    /// Attempts used, including the successful one
    pub attempts: u32,
}

impl<T> ApiResponse<T> {
    fn map<U>(self, data: U) -> ApiResponse<U> {
        ApiResponse {
            data,
            status: self.status,
            headers: self.headers,
            url: self.url,
            attempts: self.attempts,
        }
    }
}

/// Shared HTTP client with retry, timeout, rate limiting and error reporting
pub struct ApiClient {
    /// HTTP client with configured compression and user agent
    client: Client,

    /// Rate limiter to control request frequency
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,

    errors: Arc<ErrorManager>,

    call_log: Arc<CallLog>,

    /// Prefix the percent-encoded target URL is appended to
    cors_proxy: Option<String>,

    /// Backoff cap
    max_delay: Duration,

    /// Options seeded from configuration
    defaults: FetchOptions,
}

impl ApiClient {
    /// Create a client from configuration
    ///
    /// # Errors
    ///
    /// Returns `AppError::Configuration` if the HTTP client cannot be created
    pub fn new(config: &Config, errors: Arc<ErrorManager>, call_log: Arc<CallLog>) -> Result<Self> {
        let client = Client::builder()
            .gzip(true)
            .user_agent(config.api.user_agent.clone())
            .build()
            .map_err(|e| {
                AppError::configuration(None, format!("Failed to build HTTP client: {e}"))
                    .with_source(e)
            })?;

        let rate = NonZeroU32::new(config.http.rate_limit).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(rate));

        let defaults = FetchOptions {
            timeout: config.request_timeout(),
            retries: config.http.retries,
            retry_delay: Duration::from_millis(config.http.retry_delay_ms),
            ..Default::default()
        };

        Ok(Self {
            client,
            rate_limiter,
            errors,
            call_log,
            cors_proxy: config.http.cors_proxy.clone(),
            max_delay: Duration::from_millis(config.http.max_delay_ms),
            defaults,
        })
    }

    /// Options carrying the configured timeout and retry policy
    pub fn options(&self) -> FetchOptions {
        self.defaults.clone()
    }

    pub fn call_log(&self) -> &Arc<CallLog> {
        &self.call_log
    }

    pub fn error_manager(&self) -> &Arc<ErrorManager> {
        &self.errors
    }

    /// URL actually requested: the proxy prefix plus the encoded target, or
    /// the target itself
    pub fn proxied_url(&self, url: &str, options: &FetchOptions) -> String {
        match (&self.cors_proxy, options.direct) {
            (Some(proxy), false) => format!("{proxy}{}", percent_encode(url)),
            _ => url.to_string(),
        }
    }

    /// Fetch and deserialize a JSON response
    ///
    /// # Errors
    ///
    /// Returns the classified error once retries are exhausted or the failure
    /// is not retryable; an undecodable body is a `DataProcessing` error.
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        url: &str,
        options: FetchOptions,
    ) -> Result<ApiResponse<T>> {
        let mut options = options;
        if !options.headers.contains_key(ACCEPT) {
            options
                .headers
                .insert(ACCEPT, HeaderValue::from_static("application/json"));
        }

        let response = self.fetch_text(url, options.clone()).await?;
        match serde_json::from_str::<T>(&response.data) {
            Ok(data) => Ok(response.map(data)),
            Err(e) => {
                let error = AppError::data_processing(format!("Invalid JSON from {url}: {e}"))
                    .with_context("endpoint", url)
                    .with_context("body", truncate_text(&response.data, 200))
                    .with_source(e);
                Err(self.fail(error, url, &options).await)
            }
        }
    }

    /// Fetch a response body as text
    ///
    /// # Errors
    ///
    /// Returns the classified error once retries are exhausted or the failure
    /// is not retryable.
    pub async fn fetch_text(&self, url: &str, options: FetchOptions) -> Result<ApiResponse<String>> {
        let target = self.proxied_url(url, &options);
        let service = options
            .service
            .clone()
            .or_else(|| extract_host(url))
            .unwrap_or_else(|| "unknown".to_string());
        let backoff = RetryConfig {
            max_retries: options.retries,
            base_delay_ms: options.retry_delay.as_millis() as u64,
            max_delay_ms: self.max_delay.as_millis() as u64,
            ..Default::default()
        };

        let mut last_error = None;

        for attempt in 0..=options.retries {
            if attempt > 0 {
                let delay = backoff.delay_with_jitter(attempt);
                tracing::debug!(
                    service = %service,
                    attempt = attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying request"
                );
                metrics::record_retry(&service);
                tokio::time::sleep(delay).await;
            }

            self.rate_limiter.until_ready().await;

            let started = Instant::now();
            let request = self.build_request(&target, &options);
            let outcome = tokio::time::timeout(options.timeout, async {
                let response = request.send().await?;
                let status = response.status();
                let headers = response.headers().clone();
                let body = response.text().await?;
                Ok::<_, reqwest::Error>((status, headers, body))
            })
            .await;
            let elapsed = started.elapsed();
            let log = ApiCallLog::new(service.as_str(), options.method.as_str(), url)
                .with_duration_ms(elapsed.as_millis() as u64);

            let (error, retryable) = match outcome {
                Ok(Ok((status, headers, body))) if status.is_success() => {
                    self.call_log.record(log.with_status(status.as_u16()));
                    metrics::record_http_request(&service, "success", elapsed.as_secs_f64());
                    tracing::debug!(service = %service, url = %url, status = status.as_u16(), "Request succeeded");

                    return Ok(ApiResponse {
                        data: body,
                        status: status.as_u16(),
                        headers,
                        url: url.to_string(),
                        attempts: attempt + 1,
                    });
                }
                Ok(Ok((status, headers, _body))) => {
                    let message = status_message(status);
                    self.call_log
                        .record(log.with_status(status.as_u16()).with_error(message.as_str()));
                    metrics::record_http_request(&service, "http_error", elapsed.as_secs_f64());

                    let error = ErrorFactory::from_response(status.as_u16(), &headers, message, Some(url));
                    (error, is_retryable_status(status.as_u16()))
                }
                Ok(Err(e)) => {
                    let error = ErrorFactory::from_transport_error(e, Some(url));
                    self.call_log.record(log.with_error(error.to_string()));
                    metrics::record_http_request(&service, "transport_error", elapsed.as_secs_f64());

                    let retryable = matches!(
                        error.kind(),
                        ErrorKind::Network { .. } | ErrorKind::Timeout { .. }
                    );
                    (error, retryable)
                }
                Err(_elapsed) => {
                    let timeout_ms = options.timeout.as_millis() as u64;
                    let error = AppError::timeout(Some(timeout_ms), Some(url.to_string()))
                        .with_context("endpoint", url);
                    self.call_log.record(log.with_error(error.to_string()));
                    metrics::record_http_request(&service, "timeout", elapsed.as_secs_f64());
                    (error, true)
                }
            };

            if retryable && attempt < options.retries {
                tracing::warn!(
                    service = %service,
                    url = %url,
                    attempt = attempt + 1,
                    max_attempts = options.retries + 1,
                    error = %error,
                    "Request failed, will retry"
                );
                last_error = Some(error);
                continue;
            }

            return Err(self.fail(error, url, &options).await);
        }

        let error = last_error.unwrap_or_else(|| {
            AppError::api(0, "Request failed without any attempt", Some(url.to_string()))
        });
        Err(self.fail(error, url, &options).await)
    }

    /// GET and deserialize JSON
    pub async fn get<T: DeserializeOwned>(&self, url: &str, options: FetchOptions) -> Result<T> {
        Ok(self
            .fetch_json(url, options.method(Method::GET))
            .await?
            .data)
    }

    /// POST a JSON body and deserialize the JSON answer
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
        options: FetchOptions,
    ) -> Result<T> {
        self.send_json(Method::POST, url, body, options).await
    }

    /// PUT a JSON body and deserialize the JSON answer
    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
        options: FetchOptions,
    ) -> Result<T> {
        self.send_json(Method::PUT, url, body, options).await
    }

    /// PATCH a JSON body and deserialize the JSON answer
    pub async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
        options: FetchOptions,
    ) -> Result<T> {
        self.send_json(Method::PATCH, url, body, options).await
    }

    /// DELETE and deserialize the JSON answer
    pub async fn delete<T: DeserializeOwned>(&self, url: &str, options: FetchOptions) -> Result<T> {
        Ok(self
            .fetch_json(url, options.method(Method::DELETE))
            .await?
            .data)
    }

    async fn send_json<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        url: &str,
        body: &B,
        options: FetchOptions,
    ) -> Result<T> {
        let body = serde_json::to_value(body).map_err(|e| {
            AppError::validation(Some("body"), format!("Request body is not serializable: {e}"))
        })?;

        Ok(self
            .fetch_json(url, options.method(method).json(body))
            .await?
            .data)
    }

    fn build_request(&self, target: &str, options: &FetchOptions) -> reqwest::RequestBuilder {
        let request = self
            .client
            .request(options.method.clone(), target)
            .headers(options.headers.clone());

        match &options.body {
            Some(RequestBody::Json(value)) => request.json(value),
            Some(RequestBody::Form(pairs)) => request.form(pairs),
            Some(RequestBody::Text(text)) => request.body(text.clone()),
            None => request,
        }
    }

    /// Report a final error unless suppressed, then hand it back
    async fn fail(&self, error: AppError, url: &str, options: &FetchOptions) -> AppError {
        if !options.skip_error_reporting {
            let mut partial = PartialContext::new()
                .with_url(url)
                .with_tag("method", options.method.as_str());
            if let Some(service) = &options.service {
                partial = partial.with_tag("service", service.as_str());
            }
            self.errors.handle_error(&error, partial).await;
        }
        error
    }
}

fn status_message(status: StatusCode) -> String {
    format!(
        "HTTP {}: {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown Status")
    )
}
