//! Construction of [`AppError`]s from HTTP statuses and transport failures

use reqwest::header::{HeaderMap, RETRY_AFTER};

use super::{AppError, BoxError, NetworkCause};

/// Maps raw failure signals onto the error taxonomy
pub struct ErrorFactory;

impl ErrorFactory {
    /// Map an HTTP status to the most specific error variant
    ///
    /// 401 → Authentication, 403 → Authorization, 408 → Timeout,
    /// 422 → DataProcessing, 429 → RateLimit, anything else → Api.
    pub fn from_http_status(
        status: u16,
        message: impl Into<String>,
        endpoint: Option<&str>,
        cause: Option<BoxError>,
    ) -> AppError {
        let message = message.into();
        let endpoint_owned = endpoint.map(str::to_string);

        let err = match status {
            401 => AppError::authentication(message),
            403 => AppError::authorization(message),
            408 => AppError::timeout(None, endpoint_owned),
            422 => AppError::data_processing(message),
            429 => AppError::rate_limit(message, None, endpoint_owned),
            _ => AppError::api(status, message, endpoint_owned),
        };

        let err = match endpoint {
            Some(endpoint) => err.with_context("endpoint", endpoint),
            None => err,
        };

        match cause {
            Some(cause) => err.with_source(cause),
            None => err,
        }
    }

    /// Build the error for a non-success response, honouring `Retry-After`
    pub fn from_response(
        status: u16,
        headers: &HeaderMap,
        message: impl Into<String>,
        endpoint: Option<&str>,
    ) -> AppError {
        if status == 429 {
            let retry_after = retry_after_from_headers(headers);
            let err = AppError::rate_limit(message, retry_after, endpoint.map(str::to_string));
            return match endpoint {
                Some(endpoint) => err.with_context("endpoint", endpoint),
                None => err,
            };
        }

        Self::from_http_status(status, message, endpoint, None)
    }

    /// Classify a transport error using the client's structured predicates
    pub fn from_transport_error(err: reqwest::Error, endpoint: Option<&str>) -> AppError {
        let endpoint_owned = endpoint.map(str::to_string);

        if err.is_timeout() {
            return AppError::timeout(None, endpoint_owned).with_source(err);
        }

        if let Some(status) = err.status() {
            let message = err.to_string();
            return Self::from_http_status(status.as_u16(), message, endpoint, Some(Box::new(err)));
        }

        let cause = if err.is_connect() {
            NetworkCause::Connect
        } else if err.is_redirect() {
            NetworkCause::Redirect
        } else if err.is_decode() {
            NetworkCause::Decode
        } else if err.is_body() {
            NetworkCause::Body
        } else if err.is_request() || err.is_builder() {
            NetworkCause::Request
        } else {
            NetworkCause::Other
        };

        AppError::network(cause, err.to_string(), endpoint_owned).with_source(err)
    }

    /// Coerce an error from outside the taxonomy into `DataProcessing`
    pub fn from_unknown(err: &(dyn std::error::Error + 'static)) -> AppError {
        AppError::data_processing(err.to_string())
            .with_context("originalError", err.to_string())
    }
}

/// Parse a `Retry-After` header given in seconds
///
/// HTTP-date values are ignored; the upstream APIs used here send seconds.
pub fn retry_after_from_headers(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorCode, ErrorKind};
    use reqwest::header::HeaderValue;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (401, ErrorCode::AuthenticationError),
            (403, ErrorCode::AuthorizationError),
            (408, ErrorCode::TimeoutError),
            (422, ErrorCode::DataProcessingError),
            (429, ErrorCode::RateLimitError),
            (404, ErrorCode::ApiError),
            (500, ErrorCode::ApiError),
        ];

        for (status, expected) in cases {
            let err = ErrorFactory::from_http_status(status, "msg", None, None);
            assert_eq!(err.code(), expected, "status {status}");
        }
    }

    #[test]
    fn test_unlisted_status_keeps_code() {
        let err = ErrorFactory::from_http_status(418, "teapot", Some("/brew"), None);
        assert!(matches!(err.kind(), ErrorKind::Api { status: 418, .. }));
        assert_eq!(err.status_code(), 418);
        assert_eq!(err.context()["endpoint"], "/brew");
    }

    #[test]
    fn test_from_response_reads_retry_after() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("30"));

        let err = ErrorFactory::from_response(429, &headers, "slow down", Some("/x"));
        assert_eq!(err.code(), ErrorCode::RateLimitError);
        assert_eq!(err.retry_after(), Some(30));
    }

    #[test]
    fn test_retry_after_ignores_dates() {
        let mut headers = HeaderMap::new();
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(retry_after_from_headers(&headers), None);
    }

    #[test]
    fn test_from_unknown_is_data_processing() {
        let io = std::io::Error::other("disk on fire");
        let err = ErrorFactory::from_unknown(&io);
        assert_eq!(err.code(), ErrorCode::DataProcessingError);
        assert_eq!(err.context()["originalError"], "disk on fire");
    }

    #[tokio::test]
    async fn test_connection_refused_is_network() {
        let client = reqwest::Client::new();
        let err = client
            .get("http://127.0.0.1:1/unreachable")
            .send()
            .await
            .expect_err("nothing listens on port 1");

        let app = ErrorFactory::from_transport_error(err, Some("/unreachable"));
        assert_eq!(app.code(), ErrorCode::NetworkError);
        assert!(matches!(
            app.kind(),
            ErrorKind::Network {
                cause: NetworkCause::Connect,
                ..
            }
        ));
    }
}
