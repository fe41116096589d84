//! Keyed Result Store
//!
//! Maps an ordered parameter key to a hierarchical location and persists
//! one serialized [`ResultValue`] there.
//!
//! ## Layout
//!
//! ```text
//! <base>/<metric-id>/<YYYY>/<MM>/<DD>/<TO_DATE>/value
//!                    └─ leading date ─┘└ flat ─┘
//! ```
//!
//! The first date-typed key field is exploded into year/month/day
//! directories; every later field (`TO_DATE`, `LIMIT`, ...) becomes one flat
//! segment, in schema order. Derivation is a pure fold over the schema.
//!
//! ## Miss semantics
//!
//! An absent value is not an error: `load()` returns the kind's default
//! (0 / empty). A present but unparseable value is always
//! `Error::CorruptValue`, never a miss.
//!
//! ## Concurrency
//!
//! Stores for distinct keys touch disjoint paths. Same-key stores are
//! last-write-wins; callers needing at-most-once computation coordinate
//! above the store (see `MetricsDb`).
//!
//! # Example
//!
//! ```rust
//! use trueno_metrics::metric::{MetricRegistry, ACTIVE_TENANT_COUNT};
//! use trueno_metrics::store::{CacheEntry, MemoryResultStore, ResultStore};
//! use trueno_metrics::value::ResultValue;
//!
//! let registry = MetricRegistry::builtin();
//! let kind = registry.lookup(ACTIVE_TENANT_COUNT)?;
//! let params = kind.make_key(&["20101001", "20101005"])?;
//!
//! let store = MemoryResultStore::new();
//! assert_eq!(store.load(kind, &params)?, ResultValue::Scalar(0)); // miss -> default
//!
//! store.store(&CacheEntry::new(kind, params.clone(), ResultValue::Scalar(2))?)?;
//! assert_eq!(store.load(kind, &params)?, ResultValue::Scalar(2));
//! # Ok::<(), trueno_metrics::Error>(())
//! ```

mod fs;
mod memory;

pub use fs::FileResultStore;
pub use memory::MemoryResultStore;

use std::path::{Path, PathBuf};

use crate::engine::RawTuple;
use crate::metric::{parse_date, MetricKind, ParameterMapping, ParameterType};
use crate::value::ResultValue;
use crate::{Error, Result};

/// Fixed leaf file name holding the serialized value.
pub const LEAF_FILE: &str = "value";

/// Where a cache entry's value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Presence {
    /// Read from the store.
    Hit,
    /// Not in the store; the value is the kind's default.
    Miss,
    /// Freshly computed, not read from the store.
    Computed,
}

/// One metric value under one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    kind: MetricKind,
    params: ParameterMapping,
    value: ResultValue,
    presence: Presence,
}

impl CacheEntry {
    /// Wrap a computed value.
    ///
    /// # Errors
    /// - `Error::ParameterArityMismatch` if `params` belongs to another kind
    /// - `Error::ParameterTypeError` if `value` does not have the kind's shape
    pub fn new(kind: &MetricKind, params: ParameterMapping, value: ResultValue) -> Result<Self> {
        kind.ensure_key(&params)?;
        if value.shape() != kind.shape() {
            return Err(Error::ParameterTypeError {
                parameter: "RESULT".to_string(),
                value: value.shape().as_str().to_string(),
                reason: format!("expected {}", kind.shape().as_str()),
            });
        }
        Ok(Self::with_presence(kind, params, value, Presence::Computed))
    }

    /// Build an entry from an executor tuple `(key fields..., result)`.
    ///
    /// # Errors
    /// Any error of [`MetricKind::split_tuple`].
    pub fn from_tuple(kind: &MetricKind, tuple: RawTuple) -> Result<Self> {
        let (params, value) = kind.split_tuple(tuple)?;
        Ok(Self::with_presence(kind, params, value, Presence::Computed))
    }

    pub(crate) fn with_presence(
        kind: &MetricKind,
        params: ParameterMapping,
        value: ResultValue,
        presence: Presence,
    ) -> Self {
        Self {
            kind: kind.clone(),
            params,
            value,
            presence,
        }
    }

    /// Get the metric kind.
    #[must_use]
    pub const fn kind(&self) -> &MetricKind {
        &self.kind
    }

    /// Get the key.
    #[must_use]
    pub const fn params(&self) -> &ParameterMapping {
        &self.params
    }

    /// Get the value.
    #[must_use]
    pub const fn value(&self) -> &ResultValue {
        &self.value
    }

    /// Take the value.
    #[must_use]
    pub fn into_value(self) -> ResultValue {
        self.value
    }

    /// Get where the value came from.
    #[must_use]
    pub const fn presence(&self) -> Presence {
        self.presence
    }

    /// Storage location of this entry under `base`.
    ///
    /// # Errors
    /// Never fails for entries built through this type's constructors.
    pub fn path(&self, base: &Path) -> Result<PathBuf> {
        path(base, &self.kind, &self.params)
    }
}

/// Relative storage segments for a key, leaf file included.
///
/// Every value is coerced again here, so only dates and counts ever reach
/// a path segment.
///
/// # Errors
/// - `Error::ParameterArityMismatch` if `params` was built for another kind
/// - `Error::ParameterTypeError` if a value is not a valid date or count
pub fn key_segments(kind: &MetricKind, params: &ParameterMapping) -> Result<Vec<String>> {
    kind.ensure_key(params)?;

    let (mut segments, _) = kind.parameters().iter().try_fold(
        (vec![kind.identifier().to_string()], false),
        |(mut segments, exploded), parameter| {
            let raw = params.get(*parameter).ok_or_else(|| Error::ParameterArityMismatch {
                metric: kind.identifier().to_string(),
                expected: parameter.name().to_string(),
                actual: params.to_string(),
            })?;
            let value = parameter.coerce(raw)?;
            let explode = !exploded && parameter.param_type() == ParameterType::Date;
            if explode {
                let date = parse_date(&value).map_err(|reason| parameter.type_error(raw, reason))?;
                segments.extend(["%Y", "%m", "%d"].map(|f| date.format(f).to_string()));
            } else {
                segments.push(value);
            }
            Ok::<_, Error>((segments, exploded || explode))
        },
    )?;

    segments.push(LEAF_FILE.to_string());
    Ok(segments)
}

/// Storage path of a key under `base`.
///
/// Pure: equal inputs always give equal paths.
///
/// # Errors
/// Returns `Error::ParameterArityMismatch` if `params` was built for another kind.
pub fn path(base: &Path, kind: &MetricKind, params: &ParameterMapping) -> Result<PathBuf> {
    let segments = key_segments(kind, params)?;
    let path = segments.iter().fold(base.to_path_buf(), |acc, s| acc.join(s));
    tracing::trace!(metric = kind.identifier(), path = %path.display(), "derived storage path");
    Ok(path)
}

/// Backend persisting metric values by key.
///
/// `Send + Sync` so one store can serve concurrent evaluations.
pub trait ResultStore: Send + Sync {
    /// Persist an entry, overwriting any previous value for its key.
    ///
    /// # Errors
    /// Returns `Error::Io` if the value cannot be written.
    fn store(&self, entry: &CacheEntry) -> Result<()>;

    /// Read the entry for a key; a missing value is a `Presence::Miss`
    /// entry holding the kind's default.
    ///
    /// # Errors
    /// - `Error::CorruptValue` if the stored text does not parse as the kind's shape
    /// - `Error::Io` if the backend cannot be read
    /// - `Error::ParameterArityMismatch` if `params` belongs to another kind
    fn fetch(&self, kind: &MetricKind, params: &ParameterMapping) -> Result<CacheEntry>;

    /// Check whether a value is stored for a key. No side effects.
    ///
    /// # Errors
    /// Returns `Error::ParameterArityMismatch` if `params` belongs to another kind.
    fn exists(&self, kind: &MetricKind, params: &ParameterMapping) -> Result<bool>;

    /// Check the backend is usable before first use.
    ///
    /// # Errors
    /// Returns `Error::Io` if the backend cannot hold values.
    fn verify(&self) -> Result<()> {
        Ok(())
    }

    /// Read the value for a key, defaulting on a miss.
    ///
    /// A miss and a stored zero are indistinguishable here; use
    /// [`fetch`](Self::fetch) to see the presence flag.
    ///
    /// # Errors
    /// Same as [`fetch`](Self::fetch).
    fn load(&self, kind: &MetricKind, params: &ParameterMapping) -> Result<ResultValue> {
        self.fetch(kind, params).map(CacheEntry::into_value)
    }
}

pub(crate) fn decode_stored(
    kind: &MetricKind,
    params: ParameterMapping,
    text: &str,
    location: &str,
) -> Result<CacheEntry> {
    match ResultValue::decode(kind.shape(), text) {
        Ok(value) => Ok(CacheEntry::with_presence(kind, params, value, Presence::Hit)),
        Err(e) => {
            tracing::warn!(metric = kind.identifier(), location, error = %e, "corrupt stored value");
            Err(Error::CorruptValue {
                path: location.to_string(),
                reason: e.to_string(),
            })
        }
    }
}
