//! API call log, service status and key inventory
//!
//! The interceptor records every attempt into a bounded [`CallLog`]. Service
//! health is derived from the log per service name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use uuid::Uuid;

use crate::config::Config;
use crate::utils::mask_secret;

/// Default number of retained call records
pub const DEFAULT_CAPACITY: usize = 500;

/// Success rate at or above which a service is operational
const OPERATIONAL_THRESHOLD: f64 = 0.95;

/// Success rate at or above which a failing service is only degraded
const DEGRADED_THRESHOLD: f64 = 0.5;

/// One outbound request attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCallLog {
    pub id: Uuid,
    pub service: String,
    pub method: String,
    pub url: String,
    /// HTTP status; `None` when no response arrived
    pub status: Option<u16>,
    pub duration_ms: u64,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    pub error: Option<String>,
}

impl ApiCallLog {
    pub fn new(
        service: impl Into<String>,
        method: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            service: service.into(),
            method: method.into(),
            url: url.into(),
            status: None,
            duration_ms: 0,
            success: false,
            timestamp: Utc::now(),
            error: None,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self.success = (200..300).contains(&status);
        self
    }

    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self.success = false;
        self
    }
}

/// Bounded in-memory log of API calls, oldest dropped first
#[derive(Debug)]
pub struct CallLog {
    entries: Mutex<VecDeque<ApiCallLog>>,
    capacity: usize,
}

impl Default for CallLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl CallLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY))),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&self, entry: ApiCallLog) {
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// All entries, oldest first
    pub fn entries(&self) -> Vec<ApiCallLog> {
        self.entries
            .lock()
            .map(|e| e.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// The `n` most recent entries, newest first
    pub fn recent(&self, n: usize) -> Vec<ApiCallLog> {
        self.entries
            .lock()
            .map(|e| e.iter().rev().take(n).cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    /// Health of every service that appears in the log, sorted by name
    pub fn service_statuses(&self) -> Vec<ApiServiceStatus> {
        let entries = self.entries();
        let mut by_service: BTreeMap<&str, Vec<&ApiCallLog>> = BTreeMap::new();
        for entry in &entries {
            by_service.entry(entry.service.as_str()).or_default().push(entry);
        }

        by_service
            .into_iter()
            .map(|(service, calls)| ApiServiceStatus::from_calls(service, &calls))
            .collect()
    }
}

/// Coarse health of an upstream service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceHealth {
    Operational,
    Degraded,
    Down,
}

impl ServiceHealth {
    fn from_success_rate(rate: f64) -> Self {
        if rate >= OPERATIONAL_THRESHOLD {
            Self::Operational
        } else if rate >= DEGRADED_THRESHOLD {
            Self::Degraded
        } else {
            Self::Down
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Operational => "operational",
            Self::Degraded => "degraded",
            Self::Down => "down",
        }
    }
}

impl std::fmt::Display for ServiceHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregated status of one service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiServiceStatus {
    pub service: String,
    pub status: ServiceHealth,
    /// Fraction of successful calls (0.0 - 1.0)
    pub success_rate: f64,
    pub average_response_ms: u64,
    pub last_checked: Option<DateTime<Utc>>,
    pub total_calls: usize,
}

impl ApiServiceStatus {
    fn from_calls(service: &str, calls: &[&ApiCallLog]) -> Self {
        let total = calls.len();
        let successes = calls.iter().filter(|c| c.success).count();
        let success_rate = if total == 0 {
            1.0
        } else {
            successes as f64 / total as f64
        };
        let average_response_ms = if total == 0 {
            0
        } else {
            calls.iter().map(|c| c.duration_ms).sum::<u64>() / total as u64
        };

        Self {
            service: service.to_string(),
            status: ServiceHealth::from_success_rate(success_rate),
            success_rate,
            average_response_ms,
            last_checked: calls.iter().map(|c| c.timestamp).max(),
            total_calls: total,
        }
    }
}

/// A configured credential, safe to display
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    pub name: String,
    pub service: String,
    pub masked_value: Option<String>,
    pub configured: bool,
}

impl ApiKey {
    fn new(name: &str, service: &str, secret: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            service: service.to_string(),
            masked_value: secret.map(mask_secret),
            configured: secret.is_some(),
        }
    }

    /// Inventory of the credentials the sources use
    pub fn from_config(config: &Config) -> Vec<Self> {
        vec![
            Self::new(
                "GEMINI_API_KEY",
                "gemini",
                config.gemini.api_key.as_deref(),
            ),
            Self::new(
                "GOVNEWS_NOAA_TOKEN",
                "noaa",
                config.sources.noaa_token.as_deref(),
            ),
            Self::new(
                "GOVNEWS_UCDP_TOKEN",
                "ucdp",
                config.sources.ucdp_token.as_deref(),
            ),
        ]
    }
}
