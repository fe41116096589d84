//! File-backed result store.
//!
//! Writes go to a unique temp file next to the target and are renamed over
//! it, so readers see either the old value or the new one, never a partial
//! write. The temp file is removed on every failure path, and the parent
//! directory is synced after the rename on Unix.

use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::Builder;

use super::{decode_stored, CacheEntry, Presence, ResultStore, LEAF_FILE};
use crate::metric::{MetricKind, ParameterMapping};
use crate::Result;

/// Result store rooted at a base directory.
///
/// # Example
///
/// ```rust,no_run
/// use trueno_metrics::metric::{MetricRegistry, ACTIVE_TENANT_COUNT};
/// use trueno_metrics::store::{CacheEntry, FileResultStore, ResultStore};
/// use trueno_metrics::value::ResultValue;
///
/// # fn main() -> trueno_metrics::Result<()> {
/// let registry = MetricRegistry::builtin();
/// let kind = registry.lookup(ACTIVE_TENANT_COUNT)?;
/// let params = kind.make_key(&["20100203", "20100204"])?;
///
/// let store = FileResultStore::new("target");
/// store.store(&CacheEntry::new(kind, params.clone(), ResultValue::Scalar(1))?)?;
/// // target/active_tenant_count/2010/02/03/20100204/value
/// assert!(store.exists(kind, &params)?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FileResultStore {
    base_dir: PathBuf,
}

impl FileResultStore {
    /// Create a store rooted at `base_dir`. Nothing is created until the
    /// first write.
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Get the base directory.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Storage path for a key.
    ///
    /// # Errors
    /// Returns `Error::ParameterArityMismatch` if `params` belongs to another kind.
    pub fn path(&self, kind: &MetricKind, params: &ParameterMapping) -> Result<PathBuf> {
        super::path(&self.base_dir, kind, params)
    }
}

impl ResultStore for FileResultStore {
    fn store(&self, entry: &CacheEntry) -> Result<()> {
        let path = entry.path(&self.base_dir)?;
        write_atomic(&path, entry.value().encode().as_bytes())?;
        tracing::info!(
            metric = entry.kind().identifier(),
            params = %entry.params(),
            path = %path.display(),
            "stored metric value"
        );
        Ok(())
    }

    fn fetch(&self, kind: &MetricKind, params: &ParameterMapping) -> Result<CacheEntry> {
        let path = self.path(kind, params)?;
        match fs::read_to_string(&path) {
            Ok(text) => decode_stored(kind, params.clone(), &text, &path.display().to_string()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(metric = kind.identifier(), %params, "cache miss");
                Ok(CacheEntry::with_presence(
                    kind,
                    params.clone(),
                    kind.default_value(),
                    Presence::Miss,
                ))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn exists(&self, kind: &MetricKind, params: &ParameterMapping) -> Result<bool> {
        Ok(self.path(kind, params)?.is_file())
    }

    fn verify(&self) -> Result<()> {
        if self.base_dir.exists() && !self.base_dir.is_dir() {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!("result store base {} is not a directory", self.base_dir.display()),
            )
            .into());
        }
        Ok(())
    }
}

fn write_atomic(target: &Path, contents: &[u8]) -> io::Result<()> {
    let parent = target.parent().ok_or_else(|| {
        io::Error::new(
            ErrorKind::InvalidInput,
            format!("no parent directory for {}", target.display()),
        )
    })?;
    fs::create_dir_all(parent)?;

    // Dropped (and deleted) on any early return
    let mut temp = Builder::new()
        .prefix(&format!(".{LEAF_FILE}."))
        .suffix(".tmp")
        .tempfile_in(parent)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(target).map_err(|e| e.error)?;

    #[cfg(unix)]
    fs::File::open(parent)?.sync_all()?;
    Ok(())
}
