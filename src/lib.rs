//! govnews - Country data pipeline
//!
//! Fetches statistics, news, conflict events, climate summaries, factbook
//! facts, humanitarian updates, infrastructure counts, population pyramids
//! and generative-AI overviews for a country, caching what succeeds and
//! presenting partial results when sources fail.
//!
//! # Architecture
//!
//! - [`config`] - Configuration from environment and TOML files
//! - [`context`] - Application context owning every shared service
//! - [`cache`] - Namespaced cache store over a session storage area
//! - [`error`] - Error taxonomy, factory and error manager with reporters
//! - [`http`] - API fetch interceptor with retry, timeout and rate limiting
//! - [`async_data`] - Async data loader with TTL cache and cancellation
//! - [`countries`] - Country naming reconciliation between sources
//! - [`sources`] - Per-source fetchers
//! - [`dashboard`] - Concurrent loading of every panel of a country
//! - [`monitor`] - API call log and service status
//! - [`metrics`] - Prometheus metrics
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use govnews::config::Config;
//! use govnews::context::AppContext;
//! use govnews::dashboard::CountryDashboard;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let ctx = AppContext::new(Config::from_env()?)?;
//!     let country = govnews::sources::resolve_country(&ctx, "Türkiye")?;
//!     let dashboard = CountryDashboard::load(&ctx, country).await;
//!     println!("{:?}", dashboard.unavailable_panels());
//!     Ok(())
//! }
//! ```

// Initialize rust-i18n at crate root level
rust_i18n::i18n!("locales", fallback = "tr");

pub mod async_data;
pub mod cache;
pub mod config;
pub mod context;
pub mod countries;
pub mod dashboard;
pub mod error;
pub mod http;
pub mod i18n;
pub mod metrics;
pub mod monitor;
pub mod sources;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::async_data::{AsyncData, AsyncDataOptions, AsyncDataState, TtlCache};
    pub use crate::cache::{CacheStore, SessionStorage, StorageArea};
    pub use crate::config::Config;
    pub use crate::context::AppContext;
    pub use crate::countries::{Country, CountryMappings};
    pub use crate::dashboard::CountryDashboard;
    pub use crate::error::{AppError, ErrorCode, ErrorManager, GovnewsErrorTrait, Result};
    pub use crate::http::{ApiClient, FetchOptions};
    pub use crate::sources::SourceOutcome;
}

// Direct re-exports for convenience
pub use context::AppContext;
pub use error::{AppError, Result};
