//! Async data resource: loading/error/data state around a fetch function
//!
//! [`AsyncData`] drives a zero-argument async fetch function, retries it
//! with exponential backoff and keeps the result in a shared [`TtlCache`].
//!
//! Each `execute()` supersedes the previous one: the older task is aborted
//! (which also cancels its pending retry sleeps and every await nested in the
//! fetch future), and a generation counter checked under the state lock keeps
//! a late result from being committed.
//!
//! # Example
//!
//! ```rust,ignore
//! let data = AsyncData::new(
//!     move || worldbank::fetch_indicators(ctx.clone(), "TUR"),
//!     AsyncDataOptions::default().cache_key("worldbank-TUR"),
//!     ctx.ttl_cache(),
//! );
//! let state = data.execute().await;
//! ```

mod ttl;

pub use ttl::{CachedValue, TtlCache};

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::AbortHandle;
use tokio::time::Instant;

use crate::error::AppError;
use crate::utils::retry::{with_retry, RetryConfig};

/// Boxed fetch function
pub type FetchFn<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, AppError>> + Send + Sync>;

/// Success callback
pub type SuccessCallback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Failure callback, invoked once retries are exhausted
pub type ErrorCallback = Arc<dyn Fn(&AppError) + Send + Sync>;

/// Observable state of an [`AsyncData`]
#[derive(Debug, Clone, PartialEq)]
pub struct AsyncDataState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
    pub last_fetched: Option<DateTime<Utc>>,
}

impl<T> Default for AsyncDataState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
            last_fetched: None,
        }
    }
}

/// Options of an [`AsyncData`]
pub struct AsyncDataOptions<T> {
    /// Run on `mount()`
    pub immediate: bool,
    /// Changing these re-executes an immediate resource
    pub dependencies: Vec<String>,
    pub on_success: Option<SuccessCallback<T>>,
    pub on_error: Option<ErrorCallback>,
    /// Key in the shared TTL cache; no caching without one
    pub cache_key: Option<String>,
    pub cache_ttl: Duration,
    pub retries: u32,
    /// Base delay; retry `n` waits `retry_delay * 2^(n-1)`
    pub retry_delay: Duration,
}

impl<T> Default for AsyncDataOptions<T> {
    fn default() -> Self {
        Self {
            immediate: true,
            dependencies: Vec::new(),
            on_success: None,
            on_error: None,
            cache_key: None,
            cache_ttl: Duration::from_secs(5 * 60),
            retries: 3,
            retry_delay: Duration::from_millis(1_000),
        }
    }
}

impl<T> Clone for AsyncDataOptions<T> {
    fn clone(&self) -> Self {
        Self {
            immediate: self.immediate,
            dependencies: self.dependencies.clone(),
            on_success: self.on_success.clone(),
            on_error: self.on_error.clone(),
            cache_key: self.cache_key.clone(),
            cache_ttl: self.cache_ttl,
            retries: self.retries,
            retry_delay: self.retry_delay,
        }
    }
}

impl<T> AsyncDataOptions<T> {
    #[must_use]
    pub fn immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }

    #[must_use]
    pub fn cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    #[must_use]
    pub fn retries(mut self, retries: u32, retry_delay: Duration) -> Self {
        self.retries = retries;
        self.retry_delay = retry_delay;
        self
    }

    #[must_use]
    pub fn dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    #[must_use]
    pub fn on_success(mut self, callback: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(callback));
        self
    }

    #[must_use]
    pub fn on_error(mut self, callback: impl Fn(&AppError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }
}

struct Inner<T> {
    fetch: FetchFn<T>,
    options: AsyncDataOptions<T>,
    dependencies: Mutex<Vec<String>>,
    cache: Arc<TtlCache>,
    state: Mutex<AsyncDataState<T>>,
    /// When the current data was produced, on tokio's clock; locked after `state`
    fetched_at: Mutex<Option<Instant>>,
    generation: AtomicU64,
    task: Mutex<Option<AbortHandle>>,
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(|p| p.into_inner())
}

/// A fetch function plus its loading/error/data state
///
/// Dropping the resource aborts any in-flight fetch.
pub struct AsyncData<T: Clone + Send + Sync + 'static> {
    inner: Arc<Inner<T>>,
}

impl<T: Clone + Send + Sync + 'static> AsyncData<T> {
    pub fn new<F, Fut>(fetch: F, options: AsyncDataOptions<T>, cache: Arc<TtlCache>) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, AppError>> + Send + 'static,
    {
        let fetch: FetchFn<T> = Arc::new(move || fetch().boxed());
        Self {
            inner: Arc::new(Inner {
                fetch,
                dependencies: Mutex::new(options.dependencies.clone()),
                options,
                cache,
                state: Mutex::new(AsyncDataState::default()),
                fetched_at: Mutex::new(None),
                generation: AtomicU64::new(0),
                task: Mutex::new(None),
            }),
        }
    }

    /// Snapshot of the current state
    pub fn state(&self) -> AsyncDataState<T> {
        lock(&self.inner.state).clone()
    }

    /// Execute when configured as immediate, otherwise return the idle state
    pub async fn mount(&self) -> AsyncDataState<T> {
        if self.inner.options.immediate {
            self.execute().await
        } else {
            self.state()
        }
    }

    /// Load data, from the TTL cache when fresh, otherwise through the fetch
    /// function with retries
    ///
    /// Resolves once this call settles or is superseded by a newer one.
    pub async fn execute(&self) -> AsyncDataState<T> {
        if let Some(key) = &self.inner.options.cache_key {
            if let Some(hit) = self.inner.cache.get_entry::<T>(key) {
                tracing::debug!(cache_key = %key, "Async data served from TTL cache");
                let mut task = lock(&self.inner.task);
                if let Some(previous) = task.take() {
                    previous.abort();
                }
                let mut state = lock(&self.inner.state);
                self.inner.generation.fetch_add(1, Ordering::SeqCst);
                *state = AsyncDataState {
                    data: Some(hit.value),
                    loading: false,
                    error: None,
                    last_fetched: Some(hit.inserted_at),
                };
                *lock(&self.inner.fetched_at) = Some(hit.inserted);
                return state.clone();
            }
        }

        let handle = {
            let mut task = lock(&self.inner.task);
            let generation = {
                let mut state = lock(&self.inner.state);
                state.loading = true;
                state.error = None;
                self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1
            };

            if let Some(previous) = task.take() {
                previous.abort();
            }

            let handle = tokio::spawn(Self::run(Arc::clone(&self.inner), generation));
            *task = Some(handle.abort_handle());
            handle
        };

        if let Err(e) = handle.await {
            if e.is_cancelled() {
                tracing::debug!("Async data fetch superseded");
            } else {
                tracing::error!(error = %e, "Async data fetch task failed");
            }
        }

        self.state()
    }

    /// Invalidate the cache entry and execute again
    pub async fn refresh(&self) -> AsyncDataState<T> {
        if let Some(key) = &self.inner.options.cache_key {
            self.inner.cache.remove(key);
        }
        self.execute().await
    }

    /// Abort in-flight work, evict the cache entry and reset state
    pub fn clear(&self) {
        let mut task = lock(&self.inner.task);
        if let Some(previous) = task.take() {
            previous.abort();
        }

        let mut state = lock(&self.inner.state);
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(key) = &self.inner.options.cache_key {
            self.inner.cache.remove(key);
        }
        *state = AsyncDataState::default();
        *lock(&self.inner.fetched_at) = None;
    }

    /// True when never fetched or older than the cache TTL
    ///
    /// Measured on tokio's clock, like the TTL cache itself.
    pub fn is_stale(&self) -> bool {
        match *lock(&self.inner.fetched_at) {
            Some(fetched) => fetched.elapsed() >= self.inner.options.cache_ttl,
            None => true,
        }
    }

    /// Replace the dependency list; an immediate resource re-executes when it
    /// changed. Returns whether it changed.
    pub async fn set_dependencies(&self, dependencies: Vec<String>) -> bool {
        let changed = {
            let mut current = lock(&self.inner.dependencies);
            if *current == dependencies {
                false
            } else {
                *current = dependencies;
                true
            }
        };

        if changed && self.inner.options.immediate {
            self.execute().await;
        }
        changed
    }

    async fn run(inner: Arc<Inner<T>>, generation: u64) {
        let retry = RetryConfig {
            max_retries: inner.options.retries,
            base_delay_ms: inner.options.retry_delay.as_millis() as u64,
            max_delay_ms: u64::MAX,
            backoff_multiplier: 2.0,
            jitter_ratio: 0.0,
        };

        let fetch = Arc::clone(&inner.fetch);
        let result = with_retry(&retry, || fetch()).await;

        let mut state = lock(&inner.state);
        if inner.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(generation = generation, "Discarding superseded async data result");
            return;
        }

        match result {
            Ok(data) => {
                if let Some(key) = &inner.options.cache_key {
                    inner
                        .cache
                        .insert(key.clone(), data.clone(), inner.options.cache_ttl);
                }
                *state = AsyncDataState {
                    data: Some(data.clone()),
                    loading: false,
                    error: None,
                    last_fetched: Some(Utc::now()),
                };
                *lock(&inner.fetched_at) = Some(Instant::now());
                drop(state);

                if let Some(on_success) = &inner.options.on_success {
                    on_success(&data);
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Async data fetch failed after retries");
                state.loading = false;
                state.error = Some(e.user_message());
                drop(state);

                if let Some(on_error) = &inner.options.on_error {
                    on_error(&e);
                }
            }
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Drop for AsyncData<T> {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.inner.task).take() {
            task.abort();
        }
    }
}
