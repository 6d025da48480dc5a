//! Error reporters: sinks the [`ErrorManager`](super::ErrorManager) fans out to
//!
//! - [`ConsoleReporter`] - structured log output, registered in debug mode
//! - [`MemoryReporter`] - keeps reports in memory for diagnostics and tests
//! - [`WebhookReporter`] - POSTs each report as JSON to a collector URL

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;

use super::manager::{ErrorContext, ErrorSeverity};
use super::AppError;

/// Result type for reporter operations
pub type ReporterResult<T> = Result<T, ReporterError>;

/// Errors that can occur while reporting
#[derive(Debug, thiserror::Error)]
pub enum ReporterError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid reporter configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Sink temporarily unavailable
    #[error("Reporter temporarily unavailable: {0}")]
    Unavailable(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Trait for error sinks
#[async_trait]
pub trait ErrorReporter: Send + Sync {
    /// Reporter name used in logs
    fn name(&self) -> &str;

    /// Deliver one error report
    async fn report(&self, error: &AppError, context: &ErrorContext) -> ReporterResult<()>;
}

/// Writes reports through `tracing`
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ErrorReporter for ConsoleReporter {
    fn name(&self) -> &str {
        "console"
    }

    async fn report(&self, error: &AppError, context: &ErrorContext) -> ReporterResult<()> {
        match context.severity {
            ErrorSeverity::High | ErrorSeverity::Critical => tracing::error!(
                code = %error.code(),
                status = error.status_code(),
                severity = %context.severity,
                url = ?context.url,
                context = %serde_json::Value::Object(error.context().clone()),
                "{error}"
            ),
            ErrorSeverity::Low | ErrorSeverity::Medium => tracing::warn!(
                code = %error.code(),
                status = error.status_code(),
                severity = %context.severity,
                url = ?context.url,
                "{error}"
            ),
        }
        Ok(())
    }
}

/// A report captured by [`MemoryReporter`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportedError {
    pub code: String,
    pub status_code: u16,
    pub message: String,
    pub user_message: String,
    pub context: ErrorContext,
}

/// Keeps every report in memory
#[derive(Debug, Default)]
pub struct MemoryReporter {
    reports: Mutex<Vec<ReportedError>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the reports received so far
    pub fn reports(&self) -> Vec<ReportedError> {
        self.reports
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.reports.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ErrorReporter for MemoryReporter {
    fn name(&self) -> &str {
        "memory"
    }

    async fn report(&self, error: &AppError, context: &ErrorContext) -> ReporterResult<()> {
        let entry = ReportedError {
            code: error.code().as_str().to_string(),
            status_code: error.status_code(),
            message: error.to_string(),
            user_message: error.user_message(),
            context: context.clone(),
        };

        self.reports
            .lock()
            .map_err(|_| ReporterError::Unavailable("report buffer poisoned".into()))?
            .push(entry);
        Ok(())
    }
}

/// POSTs reports as JSON to a collector endpoint
///
/// Uses its own client so that reporting never re-enters the API
/// interceptor.
///
/// # Payload Format
///
/// ```json
/// {
///   "error": { "code": "API_ERROR", "statusCode": 503, "message": "...", ... },
///   "context": { "timestamp": "...", "severity": "HIGH", "url": "..." }
/// }
/// ```
pub struct WebhookReporter {
    url: String,
    client: Client,
}

impl WebhookReporter {
    /// Create a webhook reporter
    pub fn new(url: impl Into<String>, timeout: Duration) -> ReporterResult<Self> {
        let url = url.into();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ReporterError::InvalidConfig(
                "Webhook URL must start with http:// or https://".to_string(),
            ));
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { url, client })
    }

    /// Get the webhook URL
    pub fn url(&self) -> &str {
        &self.url
    }

    fn build_payload(error: &AppError, context: &ErrorContext) -> ReporterResult<serde_json::Value> {
        Ok(serde_json::json!({
            "error": error.to_json(),
            "context": serde_json::to_value(context)?,
        }))
    }
}

#[async_trait]
impl ErrorReporter for WebhookReporter {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn report(&self, error: &AppError, context: &ErrorContext) -> ReporterResult<()> {
        let payload = Self::build_payload(error, context)?;
        let response = self.client.post(&self.url).json(&payload).send().await?;

        if !response.status().is_success() {
            return Err(ReporterError::Unavailable(format!(
                "collector answered {}",
                response.status()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn context(severity: ErrorSeverity) -> ErrorContext {
        ErrorContext {
            timestamp: Utc::now(),
            severity,
            user_agent: None,
            url: Some("https://api.example.com".into()),
            tags: Default::default(),
            extra: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_memory_reporter_collects() {
        let reporter = MemoryReporter::new();
        assert!(reporter.is_empty());

        let error = AppError::validation(Some("query"), "empty");
        reporter
            .report(&error, &context(ErrorSeverity::Low))
            .await
            .unwrap();

        let reports = reporter.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].status_code, 400);
        assert_eq!(reports[0].context.severity, ErrorSeverity::Low);
    }

    #[tokio::test]
    async fn test_console_reporter_never_fails() {
        let reporter = ConsoleReporter::new();
        let error = AppError::api(503, "down", None);
        assert!(reporter
            .report(&error, &context(ErrorSeverity::High))
            .await
            .is_ok());
    }

    #[test]
    fn test_webhook_rejects_bad_url() {
        let result = WebhookReporter::new("ftp://collector", Duration::from_secs(5));
        assert!(matches!(result, Err(ReporterError::InvalidConfig(_))));
    }

    #[test]
    fn test_webhook_payload_shape() {
        let error = AppError::timeout(Some(30_000), Some("/doc".into()));
        let payload =
            WebhookReporter::build_payload(&error, &context(ErrorSeverity::Medium)).unwrap();

        assert_eq!(payload["error"]["code"], "TIMEOUT_ERROR");
        assert_eq!(payload["context"]["severity"], "MEDIUM");
    }
}
