//! Unified error handling for the govnews crate
//!
//! Every failure in the fetch pipeline is represented as an [`AppError`],
//! whose [`ErrorKind`] names exactly one variant of the taxonomy. Errors are
//! constructed at the failure site (usually through [`ErrorFactory`]), handed
//! to the [`ErrorManager`] for reporting, and surfaced to callers either as a
//! typed `Err` or as a localized message.
//!
//! # Architecture
//!
//! - [`GovnewsErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Coarse classification used for handling strategies
//! - [`ErrorCode`] - Machine-readable discriminant of an [`AppError`]
//! - [`ErrorFactory`] - Maps HTTP statuses and transport failures to errors
//! - [`ErrorManager`] - Severity computation and reporter fan-out
//!
//! # Usage
//!
//! ```rust,ignore
//! use govnews::error::{AppError, GovnewsErrorTrait};
//!
//! fn show(err: &AppError) {
//!     if err.is_recoverable() {
//!         println!("Retrying: {}", err.user_message());
//!     } else {
//!         eprintln!("Fatal error: {err}");
//!     }
//! }
//! ```

mod factory;
pub mod manager;
pub mod reporters;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

use crate::i18n::t;

pub use factory::{retry_after_from_headers, ErrorFactory};
pub use manager::{ErrorContext, ErrorManager, ErrorSeverity, PartialContext};
pub use reporters::{ConsoleReporter, ErrorReporter, MemoryReporter, ReporterError, WebhookReporter};

/// Boxed cause carried by an [`AppError`]
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Common trait for all govnews error types
pub trait GovnewsErrorTrait: std::error::Error {
    /// Check if this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Get localized description for user-facing messages
    fn localized_desc(&self) -> String;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Transport failures, timeouts
    Network,
    /// Upstream API rejected or failed the request
    Api,
    /// Input did not pass validation
    Validation,
    /// Missing or invalid configuration
    Config,
    /// Authentication and authorization failures
    Auth,
    /// Response could not be shaped into the expected data
    Data,
}

impl ErrorCategory {
    /// Get localized description for the category
    pub fn localized_desc(&self) -> String {
        match self {
            Self::Network => t!("errors.category.network").to_string(),
            Self::Api => t!("errors.category.api").to_string(),
            Self::Validation => t!("errors.category.validation").to_string(),
            Self::Config => t!("errors.category.config").to_string(),
            Self::Auth => t!("errors.category.auth").to_string(),
            Self::Data => t!("errors.category.data").to_string(),
        }
    }
}

/// Machine-readable error code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ApiError,
    NetworkError,
    ValidationError,
    ConfigurationError,
    AuthenticationError,
    AuthorizationError,
    DataProcessingError,
    TimeoutError,
    RateLimitError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApiError => "API_ERROR",
            Self::NetworkError => "NETWORK_ERROR",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::ConfigurationError => "CONFIGURATION_ERROR",
            Self::AuthenticationError => "AUTHENTICATION_ERROR",
            Self::AuthorizationError => "AUTHORIZATION_ERROR",
            Self::DataProcessingError => "DATA_PROCESSING_ERROR",
            Self::TimeoutError => "TIMEOUT_ERROR",
            Self::RateLimitError => "RATE_LIMIT_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured cause of a transport-level failure
///
/// Derived from the HTTP client's typed error predicates rather than from
/// message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkCause {
    /// Connection could not be established (refused, DNS, TLS)
    Connect,
    /// Request could not be built or sent
    Request,
    /// Response body could not be read
    Body,
    /// Response body could not be decoded
    Decode,
    /// Too many redirects or a redirect loop
    Redirect,
    /// Anything else the transport reported
    Other,
}

/// The variant of an [`AppError`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorKind {
    /// Upstream API answered with a non-success status
    #[error("API error {status}: {message}")]
    Api {
        status: u16,
        message: String,
        endpoint: Option<String>,
    },

    /// Transport failure before a response was received
    #[error("Network error ({cause:?}): {message}")]
    Network {
        cause: NetworkCause,
        message: String,
        endpoint: Option<String>,
    },

    /// Input validation failure
    #[error("Validation error: {message}")]
    Validation {
        field: Option<String>,
        message: String,
    },

    /// Missing or invalid configuration
    #[error("Configuration error: {message}")]
    Configuration { key: Option<String>, message: String },

    /// Caller is not authenticated
    #[error("Authentication error: {message}")]
    Authentication { message: String },

    /// Caller is not allowed to perform the action
    #[error("Authorization error: {message}")]
    Authorization { message: String },

    /// Response could not be processed into the expected shape
    #[error("Data processing error: {message}")]
    DataProcessing { message: String },

    /// Request exceeded its time budget
    #[error("Request timed out{}", timeout_suffix(.timeout_ms))]
    Timeout {
        timeout_ms: Option<u64>,
        endpoint: Option<String>,
    },

    /// Upstream API rate limit; a specialised API error
    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        message: String,
        retry_after: Option<u64>,
        endpoint: Option<String>,
    },
}

fn timeout_suffix(timeout_ms: &Option<u64>) -> String {
    timeout_ms
        .map(|ms| format!(" after {ms}ms"))
        .unwrap_or_default()
}

/// Application error: a taxonomy variant plus context and cause
#[derive(Error, Debug)]
#[error("{kind}")]
pub struct AppError {
    kind: ErrorKind,
    context: Map<String, Value>,
    timestamp: DateTime<Utc>,
    #[source]
    source: Option<BoxError>,
}

impl AppError {
    /// Create an error from a kind with empty context
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: Map::new(),
            timestamp: Utc::now(),
            source: None,
        }
    }

    pub fn api(status: u16, message: impl Into<String>, endpoint: Option<String>) -> Self {
        Self::new(ErrorKind::Api {
            status,
            message: message.into(),
            endpoint,
        })
    }

    pub fn network(cause: NetworkCause, message: impl Into<String>, endpoint: Option<String>) -> Self {
        Self::new(ErrorKind::Network {
            cause,
            message: message.into(),
            endpoint,
        })
    }

    pub fn validation(field: Option<&str>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation {
            field: field.map(str::to_string),
            message: message.into(),
        })
    }

    pub fn configuration(key: Option<&str>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration {
            key: key.map(str::to_string),
            message: message.into(),
        })
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication {
            message: message.into(),
        })
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authorization {
            message: message.into(),
        })
    }

    pub fn data_processing(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DataProcessing {
            message: message.into(),
        })
    }

    pub fn timeout(timeout_ms: Option<u64>, endpoint: Option<String>) -> Self {
        Self::new(ErrorKind::Timeout {
            timeout_ms,
            endpoint,
        })
    }

    pub fn rate_limit(
        message: impl Into<String>,
        retry_after: Option<u64>,
        endpoint: Option<String>,
    ) -> Self {
        Self::new(ErrorKind::RateLimit {
            message: message.into(),
            retry_after,
            endpoint,
        })
    }

    /// Attach a context entry
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Attach the underlying cause
    #[must_use]
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn context(&self) -> &Map<String, Value> {
        &self.context
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Machine-readable discriminant
    pub fn code(&self) -> ErrorCode {
        match self.kind {
            ErrorKind::Api { .. } => ErrorCode::ApiError,
            ErrorKind::Network { .. } => ErrorCode::NetworkError,
            ErrorKind::Validation { .. } => ErrorCode::ValidationError,
            ErrorKind::Configuration { .. } => ErrorCode::ConfigurationError,
            ErrorKind::Authentication { .. } => ErrorCode::AuthenticationError,
            ErrorKind::Authorization { .. } => ErrorCode::AuthorizationError,
            ErrorKind::DataProcessing { .. } => ErrorCode::DataProcessingError,
            ErrorKind::Timeout { .. } => ErrorCode::TimeoutError,
            ErrorKind::RateLimit { .. } => ErrorCode::RateLimitError,
        }
    }

    /// HTTP-like status code associated with the error
    pub fn status_code(&self) -> u16 {
        match self.kind {
            ErrorKind::Api { status, .. } => status,
            ErrorKind::Network { .. } => 0,
            ErrorKind::Validation { .. } => 400,
            ErrorKind::Configuration { .. } => 500,
            ErrorKind::Authentication { .. } => 401,
            ErrorKind::Authorization { .. } => 403,
            ErrorKind::DataProcessing { .. } => 422,
            ErrorKind::Timeout { .. } => 408,
            ErrorKind::RateLimit { .. } => 429,
        }
    }

    /// True for plain API errors and their rate-limit specialisation
    pub fn is_api_error(&self) -> bool {
        matches!(self.kind, ErrorKind::Api { .. } | ErrorKind::RateLimit { .. })
    }

    /// Seconds to wait before retrying, when the upstream said so
    pub fn retry_after(&self) -> Option<u64> {
        match self.kind {
            ErrorKind::RateLimit { retry_after, .. } => retry_after,
            _ => None,
        }
    }

    /// Endpoint the failing request targeted, if known
    pub fn endpoint(&self) -> Option<&str> {
        match &self.kind {
            ErrorKind::Api { endpoint, .. }
            | ErrorKind::Network { endpoint, .. }
            | ErrorKind::Timeout { endpoint, .. }
            | ErrorKind::RateLimit { endpoint, .. } => endpoint.as_deref(),
            _ => None,
        }
    }

    /// Localized message for the active locale
    pub fn user_message(&self) -> String {
        self.user_message_in(&*rust_i18n::locale())
    }

    /// Localized message for an explicit locale
    pub fn user_message_in(&self, locale: &str) -> String {
        match &self.kind {
            ErrorKind::Api { status, .. } => match *status {
                400 => t!("errors.api.bad_request", locale = locale).to_string(),
                404 => t!("errors.api.not_found", locale = locale).to_string(),
                500..=599 => t!("errors.api.server", locale = locale).to_string(),
                other => t!("errors.api.generic", locale = locale, status = other).to_string(),
            },
            ErrorKind::Network { .. } => t!("errors.network", locale = locale).to_string(),
            ErrorKind::Validation { field, message } => match field {
                Some(field) => t!(
                    "errors.validation",
                    locale = locale,
                    field = field,
                    message = message
                )
                .to_string(),
                None => {
                    t!("errors.validation_generic", locale = locale, message = message).to_string()
                }
            },
            ErrorKind::Configuration { .. } => {
                t!("errors.configuration", locale = locale).to_string()
            }
            ErrorKind::Authentication { .. } => {
                t!("errors.authentication", locale = locale).to_string()
            }
            ErrorKind::Authorization { .. } => {
                t!("errors.authorization", locale = locale).to_string()
            }
            ErrorKind::DataProcessing { .. } => {
                t!("errors.data_processing", locale = locale).to_string()
            }
            ErrorKind::Timeout { .. } => t!("errors.timeout", locale = locale).to_string(),
            ErrorKind::RateLimit { retry_after, .. } => match retry_after {
                Some(seconds) => {
                    t!("errors.rate_limit_retry", locale = locale, seconds = seconds).to_string()
                }
                None => t!("errors.rate_limit", locale = locale).to_string(),
            },
        }
    }

    /// JSON form handed to reporters
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "name": self.code().as_str(),
            "code": self.code(),
            "message": self.to_string(),
            "statusCode": self.status_code(),
            "context": self.context,
            "timestamp": self.timestamp.to_rfc3339(),
            "cause": self.source.as_ref().map(|s| s.to_string()),
        })
    }
}

impl GovnewsErrorTrait for AppError {
    fn is_recoverable(&self) -> bool {
        match &self.kind {
            ErrorKind::Network { .. } | ErrorKind::Timeout { .. } | ErrorKind::RateLimit { .. } => {
                true
            }
            ErrorKind::Api { status, .. } => *status >= 500 || *status == 408,
            _ => false,
        }
    }

    fn localized_desc(&self) -> String {
        self.user_message()
    }

    fn category(&self) -> ErrorCategory {
        match self.kind {
            ErrorKind::Network { .. } | ErrorKind::Timeout { .. } => ErrorCategory::Network,
            ErrorKind::Api { .. } | ErrorKind::RateLimit { .. } => ErrorCategory::Api,
            ErrorKind::Validation { .. } => ErrorCategory::Validation,
            ErrorKind::Configuration { .. } => ErrorCategory::Config,
            ErrorKind::Authentication { .. } | ErrorKind::Authorization { .. } => {
                ErrorCategory::Auth
            }
            ErrorKind::DataProcessing { .. } => ErrorCategory::Data,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::data_processing(format!("invalid JSON: {err}")).with_source(err)
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::configuration(None, format!("invalid TOML: {err}")).with_source(err)
    }
}

/// Result type alias using [`AppError`]
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_per_variant() {
        assert_eq!(AppError::network(NetworkCause::Connect, "refused", None).status_code(), 0);
        assert_eq!(AppError::validation(Some("cca3"), "too short").status_code(), 400);
        assert_eq!(AppError::configuration(None, "missing").status_code(), 500);
        assert_eq!(AppError::authentication("expired").status_code(), 401);
        assert_eq!(AppError::authorization("denied").status_code(), 403);
        assert_eq!(AppError::data_processing("bad shape").status_code(), 422);
        assert_eq!(AppError::timeout(Some(100), None).status_code(), 408);
        assert_eq!(AppError::rate_limit("slow down", None, None).status_code(), 429);
        assert_eq!(AppError::api(502, "bad gateway", None).status_code(), 502);
    }

    #[test]
    fn test_rate_limit_is_api_error() {
        let err = AppError::rate_limit("slow down", Some(30), None);
        assert!(err.is_api_error());
        assert_eq!(err.code(), ErrorCode::RateLimitError);
        assert_eq!(err.retry_after(), Some(30));
    }

    #[test]
    fn test_user_message_by_status() {
        let not_found = AppError::api(404, "missing", None);
        assert!(not_found.user_message_in("en").contains("not found"));

        let server = AppError::api(503, "down", None);
        assert!(server.user_message_in("en").contains("try again later"));

        let teapot = AppError::api(418, "teapot", None);
        assert!(teapot.user_message_in("en").contains("418"));
    }

    #[test]
    fn test_rate_limit_message_mentions_retry_after() {
        let err = AppError::rate_limit("slow down", Some(30), None);
        let en = err.user_message_in("en");
        assert!(en.contains("try again"));
        assert!(en.contains("30"));

        let tr = err.user_message_in("tr");
        assert!(tr.contains("30 saniye"));
    }

    #[test]
    fn test_recoverable_and_category() {
        assert!(AppError::timeout(None, None).is_recoverable());
        assert!(AppError::api(500, "boom", None).is_recoverable());
        assert!(!AppError::api(404, "missing", None).is_recoverable());
        assert!(!AppError::configuration(None, "missing").is_recoverable());

        assert_eq!(
            AppError::authorization("denied").category(),
            ErrorCategory::Auth
        );
        assert_eq!(AppError::timeout(None, None).category(), ErrorCategory::Network);
    }

    #[test]
    fn test_context_and_json() {
        let err = AppError::api(500, "boom", Some("/v2/data".into()))
            .with_context("source", "worldbank")
            .with_source(std::io::Error::other("socket closed"));

        let json = err.to_json();
        assert_eq!(json["code"], "API_ERROR");
        assert_eq!(json["statusCode"], 500);
        assert_eq!(json["context"]["source"], "worldbank");
        assert_eq!(json["cause"], "socket closed");
        assert_eq!(err.endpoint(), Some("/v2/data"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
