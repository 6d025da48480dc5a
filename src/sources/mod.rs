//! Per-source fetchers
//!
//! Every adapter follows the same shape: check the cache store, request
//! through the [`ApiClient`](crate::http::ApiClient), shape the response,
//! cache successes. Read paths never fail: they return
//! [`SourceOutcome::Unavailable`] carrying a displayable message instead.
//!
//! - [`worldbank`] - economic and social indicators
//! - [`gdelt`] - news articles
//! - [`ucdp`] - georeferenced conflict events
//! - [`noaa`] - monthly climate summaries
//! - [`factbook`] - scraped country profile
//! - [`reliefweb`] - humanitarian updates (RSS)
//! - [`osm`] - infrastructure counts from the Overpass API
//! - [`population`] - population pyramid
//! - [`gemini`] - generative-AI answers

pub mod factbook;
pub mod gdelt;
pub mod gemini;
pub mod noaa;
pub mod osm;
pub mod population;
pub mod reliefweb;
pub mod ucdp;
pub mod worldbank;

use serde::{Deserialize, Serialize};

use crate::context::AppContext;
use crate::countries::Country;
use crate::error::{AppError, Result};
use crate::i18n::t;
use crate::metrics;

/// Result of a read path: data, or a message explaining why there is none
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum SourceOutcome<T> {
    Available(T),
    Unavailable { message: String },
}

impl<T> SourceOutcome<T> {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Available(data) => Some(data),
            Self::Unavailable { .. } => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            Self::Available(data) => Some(data),
            Self::Unavailable { .. } => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Available(_) => None,
            Self::Unavailable { message } => Some(message),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> SourceOutcome<U> {
        match self {
            Self::Available(data) => SourceOutcome::Available(f(data)),
            Self::Unavailable { message } => SourceOutcome::Unavailable { message },
        }
    }
}

/// Display message for a failed source
pub fn unavailable_message(source: &str, error: &AppError) -> String {
    format!(
        "{} {}",
        t!("sources.unavailable", source = source),
        error.user_message()
    )
}

/// Turn an adapter result into an outcome, logging and counting it
pub(crate) fn settle<T>(source: &str, result: Result<T>) -> SourceOutcome<T> {
    match result {
        Ok(data) => {
            metrics::record_source_outcome(source, true);
            SourceOutcome::Available(data)
        }
        Err(e) => {
            tracing::warn!(source = source, error = %e, "Source unavailable");
            metrics::record_source_outcome(source, false);
            SourceOutcome::unavailable(unavailable_message(source, &e))
        }
    }
}

/// Resolve a user-supplied country name or code
pub fn resolve_country<'a>(ctx: &'a AppContext, name: &str) -> Result<&'a Country> {
    ctx.countries().resolve(name).ok_or_else(|| {
        AppError::validation(
            Some("country"),
            t!("sources.unknown_country", name = name).to_string(),
        )
    })
}

/// Join a configured base URL and a path without doubling slashes
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
