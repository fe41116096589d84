//! In-memory result store using `DashMap`.
//!
//! Same key layout and text encoding as [`FileResultStore`](super::FileResultStore),
//! without touching disk. Data is lost on process restart.

use dashmap::DashMap;

use super::{decode_stored, key_segments, CacheEntry, Presence, ResultStore};
use crate::metric::{MetricKind, ParameterMapping};
use crate::Result;

/// In-memory result store keyed by the relative storage path.
///
/// Thread-safe and lock-free for readers; uses `DashMap` internally.
pub struct MemoryResultStore {
    values: DashMap<String, String>,
}

impl MemoryResultStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: DashMap::new(),
        }
    }

    /// Create with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: DashMap::with_capacity(capacity),
        }
    }

    /// Get the number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Clear all values.
    pub fn clear(&self) {
        self.values.clear();
    }

    fn slot(kind: &MetricKind, params: &ParameterMapping) -> Result<String> {
        Ok(key_segments(kind, params)?.join("/"))
    }
}

impl Default for MemoryResultStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultStore for MemoryResultStore {
    fn store(&self, entry: &CacheEntry) -> Result<()> {
        let slot = Self::slot(entry.kind(), entry.params())?;
        self.values.insert(slot, entry.value().encode());
        Ok(())
    }

    fn fetch(&self, kind: &MetricKind, params: &ParameterMapping) -> Result<CacheEntry> {
        let slot = Self::slot(kind, params)?;
        match self.values.get(&slot) {
            Some(text) => decode_stored(kind, params.clone(), text.value(), &slot),
            None => Ok(CacheEntry::with_presence(
                kind,
                params.clone(),
                kind.default_value(),
                Presence::Miss,
            )),
        }
    }

    fn exists(&self, kind: &MetricKind, params: &ParameterMapping) -> Result<bool> {
        Ok(self.values.contains_key(&Self::slot(kind, params)?))
    }
}
