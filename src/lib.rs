//! # Trueno-Metrics: Usage Metrics with a Keyed Result Cache
//!
//! **Version**: 0.1.0
//!
//! Trueno-Metrics computes aggregate usage metrics (active tenants, per-user
//! tallies, user/workspace pairs) from an append-only event log and persists
//! every computed value under a deterministic, hierarchical key so repeated
//! queries skip recomputation.
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Muda elimination**: compute-if-absent; a stored value is never recomputed
//! - **Poka-Yoke safety**: keys are validated and ordered by the metric schema
//! - **Jidoka**: corrupt stored values stop the line instead of reading as a miss
//! - **Genchi Genbutsu**: one storage path per key, inspectable on disk
//!
//! ## Architecture
//!
//! ```text
//! MetricsDb::value(params, events)
//!     │
//!     ├─> store.fetch(kind, params) ──── Hit ──> cached value
//!     │
//!     └─ Miss ─> key lock ─> engine::evaluate ─> store.store ─> computed value
//! ```
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::NaiveDate;
//! use trueno_metrics::event::Event;
//! use trueno_metrics::metric::ACTIVE_TENANT_COUNT;
//! use trueno_metrics::store::{MemoryResultStore, Presence};
//! use trueno_metrics::value::ResultValue;
//! use trueno_metrics::MetricsDb;
//!
//! let day = |d| NaiveDate::from_ymd_opt(2010, 10, d).unwrap();
//! let events = vec![
//!     Event::tenant_created("ws1", "user1").date(day(1)).build(),
//!     Event::tenant_created("ws2", "user2").date(day(2)).build(),
//!     Event::tenant_destroyed("ws2").date(day(5)).build(),
//! ];
//!
//! let db = MetricsDb::builder().store(MemoryResultStore::new()).build()?;
//! let key = db.registry().make_key(ACTIVE_TENANT_COUNT, &["20101001", "20101005"])?;
//!
//! let first = db.value(&key, &events)?;
//! assert_eq!(first.value(), &ResultValue::Scalar(2));
//! assert_eq!(first.presence(), Presence::Computed);
//!
//! // Second query is served from the store
//! assert_eq!(db.value(&key, &[])?.presence(), Presence::Hit);
//! # Ok::<(), trueno_metrics::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod engine;
pub mod error;
pub mod event;
pub mod metric;
pub mod store;
pub mod value;

pub use error::{Error, Result};

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use engine::{EventScan, RawTuple, ScriptExecutor};
use event::Event;
use metric::{MetricKind, MetricRegistry, ParameterMapping};
use store::{CacheEntry, FileResultStore, Presence, ResultStore};
use value::ResultValue;

/// Default base directory of the file-backed result store.
pub const DEFAULT_BASE_DIR: &str = "target";

/// Plain settings for a file-backed [`MetricsDb`].
///
/// Deserializable so embedding binaries can load it from their own config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Root of the result store
    pub base_dir: PathBuf,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
        }
    }
}

/// Metrics database: registry, engine and result store behind one handle.
///
/// Thread-safe. Concurrent `value()` calls for the same key compute at most
/// once per `MetricsDb`; distinct keys proceed in parallel. Separate
/// instances sharing a base directory do not coordinate.
pub struct MetricsDb<S: ResultStore = FileResultStore> {
    registry: MetricRegistry,
    store: S,
    key_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl MetricsDb {
    /// Create a new database builder
    #[must_use]
    pub fn builder() -> MetricsDbBuilder {
        MetricsDbBuilder::default()
    }

    /// Open a file-backed database from plain settings.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if `config.base_dir` exists and is not a directory
    pub fn from_config(config: &MetricsConfig) -> Result<Self> {
        Self::builder().base_dir(&config.base_dir).build()
    }
}

impl<S: ResultStore> MetricsDb<S> {
    /// Get the metric registry
    #[must_use]
    pub const fn registry(&self) -> &MetricRegistry {
        &self.registry
    }

    /// Get the result store
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Get the value for `params`, computing and storing it on a miss.
    ///
    /// The returned entry is `Presence::Hit` when served from the store and
    /// `Presence::Computed` when freshly evaluated over `events`.
    ///
    /// # Errors
    ///
    /// - `Error::UnknownMetric` if `params` names an unregistered metric
    /// - `Error::CorruptValue` if the stored value does not parse
    /// - `Error::Io` if the store cannot be read or written
    pub fn value(&self, params: &ParameterMapping, events: &[Event]) -> Result<CacheEntry> {
        self.value_with(&EventScan::new(events), params)
    }

    /// [`value`](Self::value) with a caller-supplied executor.
    ///
    /// # Errors
    ///
    /// Same as [`value`](Self::value), plus any executor error.
    pub fn value_with<E>(&self, executor: &E, params: &ParameterMapping) -> Result<CacheEntry>
    where
        E: ScriptExecutor + ?Sized,
    {
        let kind = self.registry.lookup(params.metric())?;
        let cached = self.store.fetch(kind, params)?;
        if cached.presence() == Presence::Hit {
            return Ok(cached);
        }

        self.with_key_lock(kind, params, || {
            // Another caller may have stored it while we waited
            let cached = self.store.fetch(kind, params)?;
            if cached.presence() == Presence::Hit {
                return Ok(cached);
            }
            self.compute_and_store(executor, kind, params)
        })
    }

    /// Recompute the value for `params` and overwrite the stored one.
    ///
    /// # Errors
    ///
    /// Same as [`value`](Self::value).
    pub fn refresh(&self, params: &ParameterMapping, events: &[Event]) -> Result<CacheEntry> {
        let kind = self.registry.lookup(params.metric())?;
        let scan = EventScan::new(events);
        self.with_key_lock(kind, params, || self.compute_and_store(&scan, kind, params))
    }

    /// Read the stored value without computing; a miss yields the default.
    ///
    /// # Errors
    ///
    /// `Error::UnknownMetric`, `Error::CorruptValue` or `Error::Io`
    pub fn load(&self, params: &ParameterMapping) -> Result<ResultValue> {
        let kind = self.registry.lookup(params.metric())?;
        self.store.load(kind, params)
    }

    /// Check whether a value is stored for `params`.
    ///
    /// # Errors
    ///
    /// `Error::UnknownMetric` if `params` names an unregistered metric
    pub fn exists(&self, params: &ParameterMapping) -> Result<bool> {
        let kind = self.registry.lookup(params.metric())?;
        self.store.exists(kind, params)
    }

    /// Store a result tuple produced by an external job.
    ///
    /// The tuple holds the key values in schema order followed by the result.
    ///
    /// # Errors
    ///
    /// `Error::UnknownMetric`, any error of [`MetricKind::split_tuple`], or
    /// `Error::Io` if the value cannot be written
    pub fn store_tuple(&self, identifier: &str, tuple: RawTuple) -> Result<CacheEntry> {
        let kind = self.registry.lookup(identifier)?;
        let entry = CacheEntry::from_tuple(kind, tuple)?;
        self.store.store(&entry)?;
        Ok(entry)
    }

    /// Compute-if-absent for many keys at once.
    ///
    /// Results come back in request order. Runs on the rayon pool when the
    /// `rayon` feature is enabled.
    pub fn compute_batch(
        &self,
        requests: &[ParameterMapping],
        events: &[Event],
    ) -> Vec<Result<CacheEntry>> {
        tracing::debug!(requests = requests.len(), events = events.len(), "batch compute");

        #[cfg(feature = "rayon")]
        let results = {
            use rayon::prelude::*;
            requests
                .par_iter()
                .map(|params| self.value(params, events))
                .collect()
        };

        #[cfg(not(feature = "rayon"))]
        let results = requests
            .iter()
            .map(|params| self.value(params, events))
            .collect();

        results
    }

    fn compute_and_store<E>(
        &self,
        executor: &E,
        kind: &MetricKind,
        params: &ParameterMapping,
    ) -> Result<CacheEntry>
    where
        E: ScriptExecutor + ?Sized,
    {
        let value = engine::evaluate_with(executor, kind, params)?;
        let entry = CacheEntry::new(kind, params.clone(), value)?;
        self.store.store(&entry)?;
        Ok(entry)
    }

    fn with_key_lock<T>(
        &self,
        kind: &MetricKind,
        params: &ParameterMapping,
        f: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        let slot = store::key_segments(kind, params)?.join("/");
        let lock = Arc::clone(self.key_locks.entry(slot.clone()).or_default().value());

        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };

        drop(lock);
        // Only the map holds it now: no one is waiting on this key
        self.key_locks
            .remove_if(&slot, |_, held| Arc::strong_count(held) == 1);
        result
    }
}

/// Database builder
pub struct MetricsDbBuilder<S: ResultStore = FileResultStore> {
    registry: MetricRegistry,
    store: S,
}

impl Default for MetricsDbBuilder {
    fn default() -> Self {
        Self {
            registry: MetricRegistry::builtin(),
            store: FileResultStore::new(DEFAULT_BASE_DIR),
        }
    }
}

impl MetricsDbBuilder {
    /// Set the root directory of the file-backed result store
    #[must_use]
    pub fn base_dir(self, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            store: FileResultStore::new(base_dir),
            ..self
        }
    }
}

impl<S: ResultStore> MetricsDbBuilder<S> {
    /// Replace the built-in metric registry
    #[must_use]
    pub fn registry(self, registry: MetricRegistry) -> Self {
        Self { registry, ..self }
    }

    /// Use another result store backend
    #[must_use]
    pub fn store<T: ResultStore>(self, store: T) -> MetricsDbBuilder<T> {
        MetricsDbBuilder {
            registry: self.registry,
            store,
        }
    }

    /// Build the database
    ///
    /// # Errors
    ///
    /// Returns error if the store backend is unusable (e.g. the base path is
    /// a regular file)
    pub fn build(self) -> Result<MetricsDb<S>> {
        self.store.verify()?;
        tracing::debug!(metrics = self.registry.len(), "metrics database ready");
        Ok(MetricsDb {
            registry: self.registry,
            store: self.store,
            key_locks: DashMap::new(),
        })
    }
}
