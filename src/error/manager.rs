//! Error manager: severity computation and reporter fan-out
//!
//! The manager is constructed once by the application context and shared by
//! `Arc`; there is no process-wide instance. Reporters are append-only.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use super::factory::ErrorFactory;
use super::reporters::{ConsoleReporter, ErrorReporter};
use super::{AppError, ErrorKind};
use crate::i18n::t;

/// How urgently an error needs attention
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    /// Get localized description
    pub fn localized_desc(&self) -> String {
        match self {
            Self::Low => t!("severity.low").to_string(),
            Self::Medium => t!("severity.medium").to_string(),
            Self::High => t!("severity.high").to_string(),
            Self::Critical => t!("severity.critical").to_string(),
        }
    }
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Context attached to an error at report time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    pub timestamp: DateTime<Utc>,
    pub severity: ErrorSeverity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

/// Caller-supplied part of an [`ErrorContext`]
#[derive(Debug, Clone, Default)]
pub struct PartialContext {
    pub severity: Option<ErrorSeverity>,
    pub url: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub extra: Map<String, Value>,
}

impl PartialContext {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = Some(severity);
        self
    }

    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Receives errors, attaches severity and ambient context, fans out to reporters
pub struct ErrorManager {
    reporters: RwLock<Vec<Arc<dyn ErrorReporter>>>,
    user_agent: String,
    base_url: Option<String>,
}

impl ErrorManager {
    /// Create a manager; the console reporter is registered only in debug mode
    pub fn new(debug: bool) -> Self {
        let mut reporters: Vec<Arc<dyn ErrorReporter>> = Vec::new();
        if debug {
            reporters.push(Arc::new(ConsoleReporter::new()));
        }

        Self {
            reporters: RwLock::new(reporters),
            user_agent: format!("govnews/{}", env!("CARGO_PKG_VERSION")),
            base_url: None,
        }
    }

    /// Set the fallback URL used when a report carries none
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Override the user agent recorded in contexts
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Register an additional reporter
    pub fn add_reporter(&self, reporter: Arc<dyn ErrorReporter>) {
        match self.reporters.write() {
            Ok(mut reporters) => reporters.push(reporter),
            Err(poisoned) => poisoned.into_inner().push(reporter),
        }
    }

    /// Number of registered reporters
    pub fn reporter_count(&self) -> usize {
        self.snapshot().len()
    }

    /// Severity for an error, fixed by its variant
    pub fn severity_for(error: &AppError) -> ErrorSeverity {
        match error.kind() {
            ErrorKind::Configuration { .. } => ErrorSeverity::Critical,
            ErrorKind::Authentication { .. } | ErrorKind::Authorization { .. } => {
                ErrorSeverity::High
            }
            ErrorKind::Api { status, .. } if *status >= 500 => ErrorSeverity::High,
            ErrorKind::Api { .. } => ErrorSeverity::Medium,
            ErrorKind::Network { .. } | ErrorKind::Timeout { .. } => ErrorSeverity::Medium,
            ErrorKind::Validation { .. } | ErrorKind::RateLimit { .. } => ErrorSeverity::Low,
            ErrorKind::DataProcessing { .. } => ErrorSeverity::Medium,
        }
    }

    /// Report an error to every registered reporter
    ///
    /// Reporters run concurrently; a failing reporter is logged and does not
    /// affect the others. Never fails.
    pub async fn handle_error(&self, error: &AppError, partial: PartialContext) -> ErrorContext {
        let context = ErrorContext {
            timestamp: Utc::now(),
            severity: partial
                .severity
                .unwrap_or_else(|| Self::severity_for(error)),
            user_agent: Some(self.user_agent.clone()),
            url: partial
                .url
                .or_else(|| error.endpoint().map(str::to_string))
                .or_else(|| self.base_url.clone()),
            tags: partial.tags,
            extra: partial.extra,
        };

        let reporters = self.snapshot();
        let results = join_all(
            reporters
                .iter()
                .map(|reporter| reporter.report(error, &context)),
        )
        .await;

        for (reporter, result) in reporters.iter().zip(results) {
            if let Err(e) = result {
                tracing::error!(reporter = reporter.name(), error = %e, "Error reporter failed");
            }
        }

        context
    }

    /// Report an error from outside the taxonomy, coerced to `DataProcessing`
    pub async fn handle_foreign(
        &self,
        error: &(dyn std::error::Error + 'static),
        partial: PartialContext,
    ) -> (AppError, ErrorContext) {
        let app_error = ErrorFactory::from_unknown(error);
        let context = self.handle_error(&app_error, partial).await;
        (app_error, context)
    }

    fn snapshot(&self) -> Vec<Arc<dyn ErrorReporter>> {
        match self.reporters.read() {
            Ok(reporters) => reporters.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Default for ErrorManager {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::reporters::{MemoryReporter, ReporterError};
    use crate::error::NetworkCause;
    use async_trait::async_trait;

    struct FailingReporter;

    #[async_trait]
    impl ErrorReporter for FailingReporter {
        fn name(&self) -> &str {
            "failing"
        }

        async fn report(&self, _: &AppError, _: &ErrorContext) -> Result<(), ReporterError> {
            Err(ReporterError::Unavailable("sink offline".into()))
        }
    }

    #[test]
    fn test_severity_mapping() {
        let cases = [
            (AppError::configuration(None, "x"), ErrorSeverity::Critical),
            (AppError::authentication("x"), ErrorSeverity::High),
            (AppError::authorization("x"), ErrorSeverity::High),
            (AppError::api(503, "x", None), ErrorSeverity::High),
            (AppError::api(404, "x", None), ErrorSeverity::Medium),
            (
                AppError::network(NetworkCause::Connect, "x", None),
                ErrorSeverity::Medium,
            ),
            (AppError::timeout(None, None), ErrorSeverity::Medium),
            (AppError::validation(None, "x"), ErrorSeverity::Low),
            (AppError::rate_limit("x", None, None), ErrorSeverity::Low),
            (AppError::data_processing("x"), ErrorSeverity::Medium),
        ];

        for (error, expected) in cases {
            assert_eq!(ErrorManager::severity_for(&error), expected, "{error}");
        }
    }

    #[test]
    fn test_console_reporter_only_in_debug() {
        assert_eq!(ErrorManager::new(true).reporter_count(), 1);
        assert_eq!(ErrorManager::new(false).reporter_count(), 0);
    }

    #[tokio::test]
    async fn test_handle_error_fans_out_and_survives_failures() {
        let manager = ErrorManager::new(false).with_base_url("https://api.example.com");
        let memory = Arc::new(MemoryReporter::new());
        manager.add_reporter(Arc::new(FailingReporter));
        manager.add_reporter(memory.clone());

        let error = AppError::configuration(Some("GEMINI_API_KEY"), "missing");
        let context = manager
            .handle_error(&error, PartialContext::new().with_tag("panel", "chat"))
            .await;

        assert_eq!(context.severity, ErrorSeverity::Critical);
        assert_eq!(context.url.as_deref(), Some("https://api.example.com"));
        assert_eq!(context.tags["panel"], "chat");

        let reports = memory.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].code, "CONFIGURATION_ERROR");
    }

    #[tokio::test]
    async fn test_foreign_errors_are_coerced() {
        let manager = ErrorManager::new(false);
        let io = std::io::Error::other("unexpected");
        let (error, context) = manager.handle_foreign(&io, PartialContext::new()).await;

        assert_eq!(error.code(), crate::error::ErrorCode::DataProcessingError);
        assert_eq!(context.severity, ErrorSeverity::Medium);
    }
}
